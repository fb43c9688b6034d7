use std::fmt;

/// Failure raised by a model event listener or observer.
///
/// `PropagationStopped` is the cancel signal: the operation that fired the
/// event returns `Ok(false)` without touching the database.
#[derive(Debug, Clone, PartialEq)]
pub enum EventError {
    Validation {
        message: String,
        hint: Option<String>,
    },
    Observer {
        message: String,
    },
    PropagationStopped {
        reason: String,
    },
}

impl EventError {
    pub fn validation(message: &str) -> Self {
        Self::Validation {
            message: message.to_string(),
            hint: None,
        }
    }

    pub fn validation_with_hint(message: &str, hint: &str) -> Self {
        Self::Validation {
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    pub fn observer(message: &str) -> Self {
        Self::Observer {
            message: message.to_string(),
        }
    }

    /// Cancel the running save or delete.
    pub fn cancel(reason: &str) -> Self {
        Self::PropagationStopped {
            reason: reason.to_string(),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::PropagationStopped { .. })
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventError::Validation { message, hint } => {
                write!(f, "Validation error: {}", message)?;
                if let Some(hint) = hint {
                    write!(f, " (hint: {})", hint)?;
                }
                Ok(())
            }
            EventError::Observer { message } => write!(f, "Observer error: {}", message),
            EventError::PropagationStopped { reason } => {
                write!(f, "Event propagation stopped: {}", reason)
            }
        }
    }
}

impl std::error::Error for EventError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_with_hint_display() {
        let error = EventError::validation_with_hint("credits must be positive", "use 0 or more");
        assert_eq!(
            error.to_string(),
            "Validation error: credits must be positive (hint: use 0 or more)"
        );
        assert!(!error.is_cancellation());
    }

    #[test]
    fn test_cancel_is_propagation_stopped() {
        let error = EventError::cancel("frozen account");
        assert!(error.is_cancellation());
        assert_eq!(error.to_string(), "Event propagation stopped: frozen account");
    }
}
