//! The error taxonomy surfaced to connections (spec.md §7). Rejections
//! never mutate state and never trigger a broadcast; they go only to the
//! originating connection.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use play9_core::Rejection as EngineRejection;
use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiError {
    #[error("malformed request or field out of range")]
    InvalidInput,
    #[error("table or player name fails validation")]
    InvalidName,
    #[error("player id has another live connection")]
    AlreadyConnected,
    #[error("intent requires an actor but this is a spectator connection")]
    NotAPlayer,
    #[error("intent is not legal in the current phase")]
    WrongPhase,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("illegal target for this intent")]
    IllegalTarget,
    #[error("table is full")]
    TableFull,
    #[error("game has already started")]
    GameAlreadyStarted,
    #[error("table or player not found")]
    NotFound,
    #[error("internal error")]
    Internal,
}

impl From<EngineRejection> for ApiError {
    fn from(r: EngineRejection) -> Self {
        match r {
            EngineRejection::InvalidInput => ApiError::InvalidInput,
            EngineRejection::WrongPhase => ApiError::WrongPhase,
            EngineRejection::NotYourTurn => ApiError::NotYourTurn,
            EngineRejection::IllegalTarget => ApiError::IllegalTarget,
        }
    }
}

impl From<play9_core::JoinError> for ApiError {
    fn from(e: play9_core::JoinError) -> Self {
        match e {
            play9_core::JoinError::TableFull => ApiError::TableFull,
            play9_core::JoinError::GameAlreadyStarted => ApiError::GameAlreadyStarted,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: ApiError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidInput | ApiError::InvalidName => StatusCode::BAD_REQUEST,
            ApiError::AlreadyConnected => StatusCode::CONFLICT,
            ApiError::NotAPlayer => StatusCode::FORBIDDEN,
            ApiError::WrongPhase | ApiError::NotYourTurn | ApiError::IllegalTarget => {
                StatusCode::CONFLICT
            }
            ApiError::TableFull => StatusCode::CONFLICT,
            ApiError::GameAlreadyStarted => StatusCode::CONFLICT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { detail: self })).into_response()
    }
}
