use thiserror::Error;

#[derive(Debug, Error)]
pub enum LsqError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl From<std::io::Error> for LsqError {
    fn from(err: std::io::Error) -> Self {
        LsqError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for LsqError {
    fn from(err: serde_json::Error) -> Self {
        LsqError::Storage(err.to_string())
    }
}

impl From<uuid::Error> for LsqError {
    fn from(err: uuid::Error) -> Self {
        LsqError::Validation(err.to_string())
    }
}

impl From<reqwest::Error> for LsqError {
    fn from(err: reqwest::Error) -> Self {
        LsqError::Scrape(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = LsqError::NotFound("job xyz".to_string());
        assert_eq!(err.to_string(), "Not found: job xyz");
    }

    #[test]
    fn test_validation_display() {
        let err = LsqError::Validation("keywords cannot be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: keywords cannot be empty"
        );
    }

    #[test]
    fn test_scrape_display() {
        let err = LsqError::Scrape("zhihu login wall".to_string());
        assert_eq!(err.to_string(), "Scrape error: zhihu login wall");
    }

    #[test]
    fn test_backend_unavailable_display() {
        let err = LsqError::BackendUnavailable("no chromedriver".to_string());
        assert_eq!(err.to_string(), "Backend unavailable: no chromedriver");
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = LsqError::InvalidTransition("completed -> running".to_string());
        assert_eq!(err.to_string(), "Invalid transition: completed -> running");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let lsq_err: LsqError = io_err.into();
        match lsq_err {
            LsqError::Storage(msg) => assert!(msg.contains("file missing")),
            other => panic!("Expected Storage, got: {:?}", other),
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let lsq_err: LsqError = json_err.into();
        match lsq_err {
            LsqError::Storage(_) => {}
            other => panic!("Expected Storage, got: {:?}", other),
        }
    }

    #[test]
    fn test_from_uuid_error() {
        let uuid_err = "not-a-uuid".parse::<uuid::Uuid>().unwrap_err();
        let lsq_err: LsqError = uuid_err.into();
        match lsq_err {
            LsqError::Validation(_) => {}
            other => panic!("Expected Validation, got: {:?}", other),
        }
    }
}
