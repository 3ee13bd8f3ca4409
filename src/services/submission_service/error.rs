use axum::{response::{IntoResponse, Response}, http::StatusCode};
use log::error;
use thiserror::Error;

use crate::data_layer_error::DataLayerError;

pub type Result<T> = std::result::Result<T, SubmissionServiceError>;

#[derive(Debug, Error)]
pub enum SubmissionServiceError {
    #[error("An internal server error occured")]
    DataLayerError(DataLayerError),
    #[error("Combat instance {0} not found")]
    InstanceNotFound(i64),
    #[error("User is not a participant of combat instance {0}")]
    NotParticipant(i64),
    #[error("Combat instance {0} has already completed")]
    InstanceCompleted(i64),
    #[error("Cannot submit quests for a future date")]
    DateInFuture,
    #[error("Date has already been settled for this combat instance")]
    DateAlreadySettled,
}

impl From<DataLayerError> for SubmissionServiceError {
    fn from(e: DataLayerError) -> Self {
        SubmissionServiceError::DataLayerError(e)
    }
}

impl IntoResponse for SubmissionServiceError {
    fn into_response(self) -> Response {
        match self {
            SubmissionServiceError::DataLayerError(e) => {
                error!("{:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occured").into_response()
            }
            SubmissionServiceError::InstanceNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
            SubmissionServiceError::NotParticipant(_) => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
            _ => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
        }
    }
}
