//! Rejections raised at the join boundary

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Reasons a connection may not join a session
///
/// All of them are decided before the hub hears about the connection, so a
/// rejected join never touches session state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("Hub not found")]
    UnknownSession,

    #[error("Hub and name parameters required")]
    MissingName,

    #[error("Name already in use")]
    NameInUse,

    #[error("Hub is full")]
    SessionFull,
}

impl JoinError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            JoinError::UnknownSession => StatusCode::NOT_FOUND,
            JoinError::MissingName | JoinError::NameInUse => StatusCode::BAD_REQUEST,
            JoinError::SessionFull => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for JoinError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
