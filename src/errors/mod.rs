/// Unified error handling module
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error has occurred. Please try again.";
pub const DRAW_AREA_MESSAGE: &str = "Please draw an area of interest.";
pub const UNKNOWN_PRODUCT_MESSAGE: &str =
    "The selected product is not available. Please select a different product.";

/// Failures talking to the Earth Engine helper service
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to query service failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("query service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed query service response: {0}")]
    Malformed(String),
}

/// Every way a query request can fail.
///
/// `UserInput` and `UnknownProduct` carry text that is safe to show to the
/// user. `ExternalService` is logged in full and only ever surfaces as
/// [`UNEXPECTED_ERROR_MESSAGE`].
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    UserInput(String),
    #[error("unknown product {product:?} for platform {platform:?}")]
    UnknownProduct { platform: String, product: String },
    #[error(transparent)]
    ExternalService(#[from] ClientError),
}

impl QueryError {
    pub fn user_input(message: impl Into<String>) -> Self {
        QueryError::UserInput(message.into())
    }

    /// Message shown to the user; never contains upstream detail
    pub fn user_message(&self) -> String {
        match self {
            QueryError::UserInput(msg) => msg.clone(),
            QueryError::UnknownProduct { .. } => UNKNOWN_PRODUCT_MESSAGE.to_string(),
            QueryError::ExternalService(_) => UNEXPECTED_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn is_user_error(&self) -> bool {
        !matches!(self, QueryError::ExternalService(_))
    }

    /// Log at a level matching the error tier
    pub fn log(&self) {
        if self.is_user_error() {
            info!("Rejected query: {}", self);
        } else {
            error!("An unexpected error occurred: {:?}", self);
        }
    }
}

/// JSON body shared by every JSON endpoint
#[derive(Debug, Serialize)]
pub struct JsonOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        self.log();

        let body = JsonOutcome {
            success: false,
            url: None,
            error: Some(self.user_message()),
        };

        // Always HTTP 200 with success=false, the page reads the flag
        (StatusCode::OK, Json(body)).into_response()
    }
}

/// Type alias for query results
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_input_message_is_verbatim() {
        let err = QueryError::user_input(DRAW_AREA_MESSAGE);
        assert_eq!(err.user_message(), DRAW_AREA_MESSAGE);
        assert!(err.is_user_error());
    }

    #[test]
    fn test_external_error_is_scrubbed() {
        let err = QueryError::from(ClientError::Malformed("secret stack trace".into()));
        assert_eq!(err.user_message(), UNEXPECTED_ERROR_MESSAGE);
        assert!(!err.user_message().contains("secret"));
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_unknown_product_has_own_message() {
        let err = QueryError::UnknownProduct {
            platform: "MODIS".into(),
            product: "NOPE".into(),
        };
        assert_eq!(err.user_message(), UNKNOWN_PRODUCT_MESSAGE);
        assert!(err.to_string().contains("NOPE"));
    }
}
