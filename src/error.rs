//! Application error types.

use thiserror::Error;

use crate::models::NodeId;

/// Application-level errors for the knowledge graph console.
#[derive(Error, Debug)]
pub enum AppError {
    // Transport errors
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    // Domain errors
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Self-loop edges are not allowed (node {0})")]
    SelfLoop(NodeId),

    #[error("Suggestion not found for target node {0}")]
    UnknownSuggestion(NodeId),

    #[error("Suggestion for target node {0} was already applied or dismissed")]
    SuggestionAlreadyHandled(NodeId),

    #[error("No node selected")]
    NoSelection,

    #[error("Validation error: {0}")]
    Validation(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Whether this error came from the network/HTTP layer rather than
    /// from a domain rule.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::Http(_) | AppError::Api { .. } | AppError::Decode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        let api = AppError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert!(api.is_transport());
        assert!(!AppError::SelfLoop(3).is_transport());
        assert!(!AppError::NoSelection.is_transport());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            AppError::SelfLoop(7).to_string(),
            "Self-loop edges are not allowed (node 7)"
        );
        let api = AppError::Api {
            status: 404,
            message: "Node not found".to_string(),
        };
        assert_eq!(api.to_string(), "API error (404): Node not found");
    }
}
