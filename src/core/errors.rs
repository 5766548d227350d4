use spin_sdk::http::Response;
use thiserror::Error;

use crate::core::validation::FormErrors;

/// Handlers return the error as a value; the router turns it into a response.
pub type HandlerResult = Result<Response, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid form: {0}")]
    Validation(FormErrors),
    #[error("Upstream Error: {0}")]
    Upstream(String),
    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => 400,
            ApiError::Unauthorized => 401,
            ApiError::Forbidden => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::Upstream(_) => 502,
            ApiError::InternalError(_) => 500,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Upstream(msg)
            | ApiError::InternalError(msg) => serde_json::json!({"error": msg}),
            ApiError::Unauthorized => serde_json::json!({"error": "Unauthorized"}),
            ApiError::Forbidden => serde_json::json!({"error": "Forbidden"}),
            ApiError::Validation(errors) => serde_json::json!({"errors": errors}),
        }
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        Response::builder()
            .status(err.status())
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&err.body()).unwrap_or_default())
            .build()
    }
}

impl From<FormErrors> for ApiError {
    fn from(errors: FormErrors) -> Self {
        ApiError::Validation(errors)
    }
}

// Internal failures surface as 500s
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}
