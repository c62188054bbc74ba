//! # users-graphql
//!
//! GraphQL user-management API.
//!
//! ## Features
//!
//! - **Users** - `createUser`, `login`, `user(id)` and paginated `users`
//! - **Addresses** - one-to-many user addresses, cascade-deleted with the owner
//! - **Auth Guard** - HS256 bearer tokens gating every protected operation
//! - **Password Policy** - length and letter/digit checks, argon2 hashing
//! - **Error Formatter** - uniform `{message, code, detail}` error payloads
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use users_graphql::{auth::AuthGuard, repository::InMemoryUserRepository, server, service::UserService};
//!
//! # async fn example(guard: AuthGuard) {
//! let service = UserService::new(Arc::new(InMemoryUserRepository::new()), guard);
//! let app = server::router(server::AppState::new(service));
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod dataloaders;
pub mod database;
pub mod entity;
pub mod format;
pub mod pagination;
pub mod password;
pub mod repository;
pub mod schema;
pub mod seed;
pub mod server;
pub mod service;
pub mod telemetry;
pub mod token;
pub mod types;

pub use auth::AuthGuard;
pub use format::{format_error, ErrorPayload, GraphQLReply};
pub use pagination::{PageInfo, PageWindow, UserList};
pub use repository::{InMemoryUserRepository, UserRepository};
pub use schema::{build_schema, AppSchema};
pub use service::UserService;
pub use types::{Address, AuthPayload, Date, User};

use async_graphql::ErrorExtensions;
use thiserror::Error;

/// Message shown to clients for any error that is not a known kind
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred. Please try again.";

/// API errors
///
/// Every failure a resolver can report. The wire code of each kind is fixed,
/// see [`ApiError::code`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Input(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    Internal {
        message: String,
        detail: Option<String>,
    },
}

impl ApiError {
    /// Internal error with the fixed client message; `detail` keeps the cause
    pub fn internal(detail: impl ToString) -> Self {
        Self::Internal {
            message: INTERNAL_ERROR_MESSAGE.to_string(),
            detail: Some(detail.to_string()),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::Auth(_) => 401,
            Self::Input(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal { .. } => 500,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Internal { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new_with_source(self.clone()).extend_with(|_, e| {
            e.set("code", i32::from(self.code()));
            if let Some(detail) = self.detail() {
                e.set("detail", detail);
            }
        })
    }
}

impl From<repository::StoreError> for ApiError {
    fn from(err: repository::StoreError) -> Self {
        Self::internal(err)
    }
}

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::Auth("x".into()).code(), 401);
        assert_eq!(ApiError::Input("x".into()).code(), 400);
        assert_eq!(ApiError::NotFound("x".into()).code(), 404);
        assert_eq!(ApiError::Conflict("x".into()).code(), 409);
        assert_eq!(ApiError::internal("db down").code(), 500);
    }

    #[test]
    fn test_internal_error_hides_cause() {
        let err = ApiError::internal("connection refused");
        assert_eq!(err.to_string(), INTERNAL_ERROR_MESSAGE);
        assert_eq!(err.detail(), Some("connection refused"));
    }
}
