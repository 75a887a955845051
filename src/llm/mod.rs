pub mod interfaces;
pub mod prompts;
pub mod providers;

pub use interfaces::{Message, MessageRole, ReviewRequest, ReviewResponse, ReviewService};
pub use prompts::{AgentPrompts, PromptKind, PromptTemplate, REVIEWER_SYSTEM_PROMPT};
pub use providers::{call_with_deadline, HttpReviewClient};
