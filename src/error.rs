use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Failure taxonomy for a validation run.
///
/// `Transport` and `Protocol` are captured per turn, `Persistence` per agent, and only
/// `Config` is allowed to stop the process before the join point.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("agent {agent_id} failed unexpectedly: {message}")]
    AgentPanicked { agent_id: u32, message: String },
}

impl ValidationError {
    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::Transport(_) => "transport",
            ValidationError::Protocol(_) => "protocol",
            ValidationError::Persistence(_) => "persistence",
            ValidationError::Config(_) => "config",
            ValidationError::AgentPanicked { .. } => "agent",
        }
    }
}

impl From<reqwest::Error> for ValidationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ValidationError::Protocol(err.to_string())
        } else {
            ValidationError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::Protocol(err.to_string())
    }
}

impl From<std::io::Error> for ValidationError {
    fn from(err: std::io::Error) -> Self {
        ValidationError::Persistence(err.to_string())
    }
}

impl From<serde_yaml::Error> for ValidationError {
    fn from(err: serde_yaml::Error) -> Self {
        ValidationError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_kind() {
        let err = ValidationError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "transport error: connection refused");
        assert_eq!(err.kind(), "transport");

        let err = ValidationError::AgentPanicked {
            agent_id: 4,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "agent 4 failed unexpectedly: boom");
    }

    #[test]
    fn test_conversions() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(ValidationError::from(io), ValidationError::Persistence(_)));

        let json = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(ValidationError::from(json), ValidationError::Protocol(_)));
    }
}
