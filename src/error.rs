// Error handling and response types for the Eye daemon
// This module defines the error taxonomy shared by the write worker and
// the HTTP boundary

use std::fmt::{Display, Formatter};

use actix_web::HttpResponse;

// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum EyeError {
    #[error("malformed input: {0}")]
    MalformedInput(String), // Unparseable payloads, unknown sentinels
    #[error("unknown requested action: {0}")]
    UnknownRequest(String), // Action outside the supported set
    #[error("Rollback: {statement} affected {affected} rows")]
    InvariantViolation { statement: String, affected: u64 },
    #[error("server error: {0}")]
    ServerError(String),
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl EyeError {
    // HTTP status code the error maps to on the wire
    pub fn code(&self) -> u16 {
        match self {
            EyeError::MalformedInput(_) | EyeError::UnknownRequest(_) => 400,
            EyeError::InvariantViolation { .. }
            | EyeError::ServerError(_)
            | EyeError::Database(_)
            | EyeError::Serialization(_) => 500,
        }
    }
}

// Wrapper for boundary errors that surface outside the result envelope
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl actix_web::error::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        if let Some(e) = self.inner.downcast_ref::<EyeError>() {
            match e.code() {
                400 => HttpResponse::BadRequest().body(e.to_string()),
                _ => HttpResponse::InternalServerError().body(e.to_string()),
            }
        } else {
            HttpResponse::InternalServerError().body(self.inner.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_error_display() {
        let err = EyeError::MalformedInput("bad sentinel 'forever'".to_string());
        assert_eq!(format!("{}", err), "malformed input: bad sentinel 'forever'");

        let err = EyeError::UnknownRequest("list".to_string());
        assert_eq!(format!("{}", err), "unknown requested action: list");

        let err = EyeError::ServerError("connection reset".to_string());
        assert_eq!(format!("{}", err), "server error: connection reset");
    }

    #[test]
    fn test_invariant_violation_names_statement() {
        let err = EyeError::InvariantViolation {
            statement: "update statement".to_string(),
            affected: 2,
        };
        assert_eq!(format!("{}", err), "Rollback: update statement affected 2 rows");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(EyeError::MalformedInput(String::new()).code(), 400);
        assert_eq!(EyeError::UnknownRequest(String::new()).code(), 400);
        assert_eq!(
            EyeError::InvariantViolation {
                statement: "data insert".to_string(),
                affected: 0,
            }
            .code(),
            500
        );
        assert_eq!(EyeError::ServerError(String::new()).code(), 500);
    }

    #[test]
    fn test_app_error_from_anyhow() {
        let anyhow_err = anyhow::anyhow!("test error");
        let app_err = AppError::from(anyhow_err);
        assert_eq!(format!("{}", app_err), "test error");
    }
}
