use crate::types::AgentDescriptor;

/// System instruction sent with every prompt of a run
pub const REVIEWER_SYSTEM_PROMPT: &str = r#"You are a rigorous, critical reviewer of production software systems. You are skeptical by default, you do not praise work that has not earned it, and you never assume a feature works without evidence.

When you find a problem:
- State it concretely and name the component involved
- Explain the failure mode a real user or operator would hit
- Rate its severity; prefix anything that blocks a production release with CRITICAL

Be specific and concise. Do not pad your answer with generic advice."#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    FocusAnalysis,
    ProductionReadiness,
    CriticalIssues,
}

/// Prompt template for one turn of an agent's sequence
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub kind: PromptKind,
    pub user_prompt_template: String,
}

/// Collection of prompts shared by every agent
#[derive(Debug, Clone)]
pub struct AgentPrompts {
    target_description: String,
    templates: Vec<PromptTemplate>,
}

impl AgentPrompts {
    pub fn new(target_description: impl Into<String>) -> Self {
        Self {
            target_description: target_description.into(),
            templates: vec![
                Self::focus_analysis(),
                Self::production_readiness(),
                Self::critical_issues(),
            ],
        }
    }

    /// The fixed, ordered prompt sequence every agent runs
    pub fn sequence(&self) -> &[PromptTemplate] {
        &self.templates
    }

    pub fn system_prompt(&self) -> &str {
        REVIEWER_SYSTEM_PROMPT
    }

    /// General analysis driven by the agent's focus
    pub fn focus_analysis() -> PromptTemplate {
        PromptTemplate {
            kind: PromptKind::FocusAnalysis,
            user_prompt_template: r#"You are validation agent #{agent_id}, assigned to: {task}.

## System under review
{target}

## Your focus
{focus}

Analyze the system strictly from the point of view of your focus area:
1. What must be true for this area to work correctly in production
2. Where the implementation is most likely to be wrong or incomplete
3. Which edge cases and failure modes deserve explicit checks
4. What evidence you would demand before signing off

Give a structured analysis with concrete findings."#
                .to_string(),
        }
    }

    /// Production-readiness assessment for the agent's area
    pub fn production_readiness() -> PromptTemplate {
        PromptTemplate {
            kind: PromptKind::ProductionReadiness,
            user_prompt_template: r#"As validation agent #{agent_id} ({task}), assess the production readiness of {target}.

Restrict yourself to: {focus}

Answer each point with READY, NOT READY or UNKNOWN and a one-line justification:
1. Correctness under normal load
2. Behaviour under failure (network errors, bad input, partial outages)
3. Observability: can an operator tell when this area is broken
4. Security exposure introduced by this area

Finish with an overall verdict."#
                .to_string(),
        }
    }

    /// Top three critical issues for the agent's area
    pub fn critical_issues() -> PromptTemplate {
        PromptTemplate {
            kind: PromptKind::CriticalIssues,
            user_prompt_template: r#"As validation agent #{agent_id} ({task}), list the top 3 most critical issues you expect in {target}, limited to: {focus}

For each issue give:
- A one-line title (prefix it with CRITICAL if it must be fixed before release)
- The concrete failure it causes
- The smallest change that would fix it

If you cannot name three real issues, say so rather than inventing them."#
                .to_string(),
        }
    }

    /// Render a template for a specific agent
    pub fn build_prompt(&self, template: &PromptTemplate, descriptor: &AgentDescriptor) -> String {
        template
            .user_prompt_template
            .replace("{agent_id}", &descriptor.id.to_string())
            .replace("{task}", &descriptor.task)
            .replace("{focus}", &descriptor.focus)
            .replace("{target}", &self.target_description)
    }
}
