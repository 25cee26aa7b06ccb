use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;

use crate::ingest::IngestError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// JSON `{ "error": ... }` response with a matching status.
#[derive(Debug)]
pub struct ApiError {
    pub status: Status,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::new(Status::InternalServerError, format!("{err:#}"))
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        let status = match err {
            IngestError::Validation(_) => Status::BadRequest,
            IngestError::Storage(_) | IngestError::Classification(_) => {
                Status::InternalServerError
            }
        };
        Self::new(status, err.to_string())
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .respond_to(request)
    }
}

#[catch(default)]
pub fn json_catcher(status: Status, _request: &Request<'_>) -> ApiError {
    ApiError::new(status, status.reason_lossy())
}
