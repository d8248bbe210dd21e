//! Error types for the graph build pipeline

use std::any::Any;

use thiserror::Error;

/// Base error type for pipeline operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Entity not found: type={entity_type} id={id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// A deliberate build failure whose message is shown to subscribers.
    #[error("{message}")]
    Processing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Remote schema service error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal system error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Helper to create a processing failure, optionally keeping its cause
    pub fn processing<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CoreError::Processing {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Helper to create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Wraps the payload of a caught panic.
    pub fn panicked(payload: &(dyn Any + Send)) -> Self {
        CoreError::Internal(format!("panicked: {}", panic_message(payload)))
    }

    /// The subscriber-facing message of a processing failure.
    pub fn processing_message(&self) -> Option<&str> {
        match self {
            CoreError::Processing { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Text of a panic payload raised with `panic!`, or a placeholder.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Failure of a single call to the remote schema service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Remote service responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Remote transport error: {0}")]
    Transport(String),
    #[error("Failed to decode remote response: {0}")]
    Decode(String),
}

/// Specific error type for graph and user persistence.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Store connection error: {0}")]
    ConnectionError(String),
    #[error("Store query error: {0}")]
    QueryError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_error_displays_its_message() {
        let error = CoreError::processing("Unable to connect", None::<RemoteError>);
        assert_eq!(format!("{}", error), "Unable to connect");
        assert_eq!(error.processing_message(), Some("Unable to connect"));
    }

    #[test]
    fn test_processing_error_keeps_source() {
        let error = CoreError::processing(
            "Unable to fetch applications",
            Some(RemoteError::Status { status: 500, body: "boom".into() }),
        );
        let source = std::error::Error::source(&error).expect("source is kept");
        assert_eq!(source.to_string(), "Remote service responded with status 500: boom");
    }

    #[test]
    fn test_other_errors_have_no_processing_message() {
        let error = CoreError::from(RepositoryError::ConnectionError("down".into()));
        assert_eq!(error.processing_message(), None);
        assert_eq!(format!("{}", error), "Repository error: Store connection error: down");
    }

    #[test]
    fn test_panic_payload_becomes_internal_error() {
        let payload = std::panic::catch_unwind(|| panic!("remote client blew up")).unwrap_err();
        let error = CoreError::panicked(payload.as_ref());
        assert!(matches!(error, CoreError::Internal(_)));
        assert_eq!(format!("{}", error), "Internal system error: panicked: remote client blew up");

        let formatted = std::panic::catch_unwind(|| panic!("page {} failed", 3)).unwrap_err();
        assert_eq!(panic_message(formatted.as_ref()), "page 3 failed");
        let opaque: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(opaque.as_ref()), "unknown panic");
    }

    #[test]
    fn test_not_found_error() {
        let error = CoreError::not_found("Graph", 42);
        match error {
            CoreError::NotFound { entity_type, id } => {
                assert_eq!(entity_type, "Graph");
                assert_eq!(id, "42");
            }
            _ => panic!("Expected NotFound"),
        }
    }
}
