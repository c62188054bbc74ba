//! Uniform `{message, code, detail}` error payloads

use async_graphql::{Response, ServerError, Value};
use serde::Serialize;

use crate::{ApiError, INTERNAL_ERROR_MESSAGE};

/// Error shape seen by clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&ApiError> for ErrorPayload {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Auth(message)
            | ApiError::Input(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message) => Self {
                message: message.clone(),
                code: err.code(),
                detail: None,
            },
            ApiError::Internal { message, detail } => Self {
                message: message.clone(),
                code: err.code(),
                detail: detail.clone(),
            },
        }
    }
}

/// Render one GraphQL error
///
/// Anything not raised as an [`ApiError`] (parse and validation failures,
/// missing context data, panics caught by the executor) becomes a generic
/// internal error whose original message survives only in `detail`.
pub fn format_error(err: &ServerError) -> ErrorPayload {
    let payload = match err.source::<ApiError>() {
        Some(api_error) => ErrorPayload::from(api_error),
        None => ErrorPayload {
            message: INTERNAL_ERROR_MESSAGE.to_string(),
            code: 500,
            detail: Some(err.message.clone()),
        },
    };

    if payload.code == 500 {
        tracing::error!(detail = payload.detail.as_deref().unwrap_or_default(), "internal error");
    }

    payload
}

/// GraphQL response body with formatted errors
#[derive(Debug, Clone, Serialize)]
pub struct GraphQLReply {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorPayload>,
}

impl From<Response> for GraphQLReply {
    fn from(response: Response) -> Self {
        Self {
            errors: response.errors.iter().map(format_error).collect(),
            data: response.data,
        }
    }
}
