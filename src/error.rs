//! Domain error kinds (spec §7) and the HTTP boundary wrapper around them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Closed set of alignment-core error kinds, each with its own disposition:
/// `InvalidRequest` is caller-facing, `AudioUnreadable` degrades to
/// heuristic timing, `ProviderUnavailable` triggers simulator fallback,
/// `DecoderInvariant` is fatal.
#[derive(Debug, Error)]
pub enum VoxAlignError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("audio unreadable: {0}")]
    AudioUnreadable(String),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("decoder invariant violated: {0}")]
    DecoderInvariant(String),
}

pub type VoxAlignResult<T> = Result<T, VoxAlignError>;

impl VoxAlignError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            VoxAlignError::InvalidRequest(_) | VoxAlignError::AudioUnreadable(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            VoxAlignError::ProviderUnavailable(_) | VoxAlignError::DecoderInvariant(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct HttpErrorBody {
    error: String,
}

/// Axum-facing wrapper, mirroring the teacher's `ModelRunnerError` shape.
#[derive(Debug)]
pub struct VoxAlignHttpError {
    status: StatusCode,
    body: HttpErrorBody,
}

impl From<VoxAlignError> for VoxAlignHttpError {
    fn from(err: VoxAlignError) -> Self {
        VoxAlignHttpError {
            status: err.status_code(),
            body: HttpErrorBody {
                error: err.to_string(),
            },
        }
    }
}

impl From<anyhow::Error> for VoxAlignHttpError {
    fn from(err: anyhow::Error) -> Self {
        VoxAlignHttpError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: HttpErrorBody {
                error: err.to_string(),
            },
        }
    }
}

impl IntoResponse for VoxAlignHttpError {
    fn into_response(self) -> Response {
        let mut res = Json(self.body).into_response();
        *res.status_mut() = self.status;
        res
    }
}

pub type HttpResult<T> = Result<T, VoxAlignHttpError>;
