use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{AutomobileId, RequestStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("invalid argument: {message}")]
    InvalidArgument {
        message: String,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
        date: NaiveDate,
    },

    #[error("invalid state: current {current}, expected {expected}")]
    InvalidState {
        current: String,
        expected: String,
    },

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("insufficient credit: available {available}, requested {requested}")]
    InsufficientCredit {
        available: Money,
        requested: Money,
    },

    #[error("insufficient amount: required {required}, provided {provided}")]
    InsufficientAmount {
        required: Money,
        provided: Money,
    },

    #[error("{entity} already exists for request {request_id}")]
    AlreadyExists {
        entity: &'static str,
        request_id: String,
    },

    #[error("unauthorized: {username} {message}")]
    Unauthorized {
        username: String,
        message: String,
    },

    #[error("automobile not available: {automobile_id}")]
    Unavailable {
        automobile_id: AutomobileId,
    },

    #[error("storage failure: {message}")]
    Storage {
        message: String,
    },
}

/// client-facing error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    InvalidState,
    InsufficientCredit,
    InsufficientAmount,
    AlreadyExists,
    Unauthorized,
    Unavailable,
    Internal,
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::NotFound { .. } => ErrorKind::NotFound,
            WorkflowError::InvalidArgument { .. } | WorkflowError::InvalidDate { .. } => {
                ErrorKind::InvalidArgument
            }
            WorkflowError::InvalidState { .. } | WorkflowError::InvalidTransition { .. } => {
                ErrorKind::InvalidState
            }
            WorkflowError::InsufficientCredit { .. } => ErrorKind::InsufficientCredit,
            WorkflowError::InsufficientAmount { .. } => ErrorKind::InsufficientAmount,
            WorkflowError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            WorkflowError::Unauthorized { .. } => ErrorKind::Unauthorized,
            WorkflowError::Unavailable { .. } => ErrorKind::Unavailable,
            WorkflowError::Storage { .. } => ErrorKind::Internal,
        }
    }

    /// message safe to show to the client
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::InsufficientCredit { .. } => {
                "insufficient credit limit, contact the bank to raise your limit".to_string()
            }
            WorkflowError::InsufficientAmount { required, .. } => format!(
                "amount insufficient for liquidation, required: {}",
                required.to_cents()
            ),
            WorkflowError::Storage { .. } => {
                "an internal error occurred, try again later".to_string()
            }
            other => other.to_string(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        WorkflowError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        WorkflowError::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn unauthorized(username: &str, message: impl Into<String>) -> Self {
        WorkflowError::Unauthorized {
            username: username.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_reports_as_invalid_state() {
        let err = WorkflowError::InvalidTransition {
            from: RequestStatus::Pending,
            to: RequestStatus::Completed,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.user_message(), "invalid transition: pending -> completed");
    }

    #[test]
    fn test_storage_message_is_generic() {
        let err = WorkflowError::Storage {
            message: "connection reset by peer on 10.0.0.3:5432".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.user_message().contains("10.0.0.3"));
    }

    #[test]
    fn test_insufficient_amount_message_shows_required() {
        let err = WorkflowError::InsufficientAmount {
            required: Money::from_str_exact("1234.5678").unwrap(),
            provided: Money::from_major(10),
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientAmount);
        assert!(err.user_message().contains("1234.57"));
    }
}
