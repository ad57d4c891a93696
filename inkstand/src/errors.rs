use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

use crate::auth::identity::IdentityError;
use crate::profiles::ProfileError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Caller is authenticated but not allowed to touch the resource
    #[error("Access to {resource} denied")]
    Forbidden { resource: String },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} for {id} not found")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Identity service error
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Profile store error
    #[error(transparent)]
    ProfileStore(#[from] ProfileError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Identity(identity_err) => match identity_err {
                IdentityError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                IdentityError::EmailTaken => StatusCode::CONFLICT,
                IdentityError::Rejected { .. } => StatusCode::BAD_REQUEST,
                IdentityError::Transport(_) | IdentityError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            },
            Error::ProfileStore(_) => StatusCode::BAD_GATEWAY,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::Forbidden { resource } => format!("Access to {resource} denied"),
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} for {id} not found"),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Identity(identity_err) => match identity_err {
                IdentityError::InvalidCredentials => "Invalid email or password".to_string(),
                IdentityError::EmailTaken => "An account with this email address already exists".to_string(),
                IdentityError::Rejected { message } => message.clone(),
                IdentityError::Transport(_) | IdentityError::Upstream { .. } => "Identity service unavailable".to_string(),
            },
            Error::ProfileStore(_) => "Profile service unavailable".to_string(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Identity(IdentityError::Transport(_) | IdentityError::Upstream { .. }) | Error::ProfileStore(_) => {
                tracing::warn!("Upstream service error: {:#}", self);
            }
            Error::Unauthenticated { .. } | Error::Forbidden { .. } | Error::Identity(_) => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
