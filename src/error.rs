use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("credentials file does not contain a Slack token")]
    MissingToken,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid date format: {0}")]
    InvalidDate(String),

    #[error("invalid time window: since {since} is after till {till}")]
    InvalidWindow { since: String, till: String },

    #[error("calling {method} failed: {reason}, params: {params}")]
    RemoteCallFailed {
        method: String,
        params: String,
        reason: String,
    },

    #[error("pagination limit reached for conversation {conversation} after {calls} calls")]
    PaginationLimitExceeded { conversation: String, calls: usize },

    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("conversation {0} cannot be classified")]
    UnclassifiableConversation(String),

    #[error("failed to read file at {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write file at {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("JSON serialization error: {0}")]
    JsonSerialize(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("mail delivery error: {0}")]
    Mail(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_missing_token_display() {
        let err = AppError::MissingToken;
        assert_eq!(
            err.to_string(),
            "credentials file does not contain a Slack token"
        );
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: AppError = io_err.into();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn test_invalid_date_display() {
        let err = AppError::InvalidDate("not-a-date".to_string());
        assert_eq!(err.to_string(), "invalid date format: not-a-date");
    }

    #[test]
    fn test_invalid_window_display() {
        let err = AppError::InvalidWindow {
            since: "200.000000".to_string(),
            till: "100.000000".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid time window: since 200.000000 is after till 100.000000"
        );
    }

    #[test]
    fn test_remote_call_failed_display() {
        let err = AppError::RemoteCallFailed {
            method: "conversations.history".to_string(),
            params: "{\"channel\": \"C1\"}".to_string(),
            reason: "channel_not_found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("calling conversations.history failed: channel_not_found"));
        assert!(msg.contains("C1"));
    }

    #[test]
    fn test_pagination_limit_display() {
        let err = AppError::PaginationLimitExceeded {
            conversation: "C1".to_string(),
            calls: 101,
        };
        assert_eq!(
            err.to_string(),
            "pagination limit reached for conversation C1 after 101 calls"
        );
    }

    #[test]
    fn test_user_not_found_display() {
        let err = AppError::UserNotFound("U404".to_string());
        assert_eq!(err.to_string(), "user U404 not found");
    }

    #[test]
    fn test_unclassifiable_display() {
        let err = AppError::UnclassifiableConversation("X1".to_string());
        assert_eq!(err.to_string(), "conversation X1 cannot be classified");
    }

    #[test]
    fn test_read_file_source() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let err = AppError::ReadFile {
            path: "/path/to/token".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("/path/to/token"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_write_file_source() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        let err = AppError::WriteFile {
            path: "/path/to/output.eml".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("failed to write file"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_mail_display() {
        let err = AppError::Mail("sendmail exited with status 1".to_string());
        assert_eq!(
            err.to_string(),
            "mail delivery error: sendmail exited with status 1"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppError>();
    }
}
