use axum::{response::{IntoResponse, Response}, http::StatusCode};
use log::error;
use thiserror::Error;

use crate::data_layer_error::DataLayerError;

pub type Result<T> = std::result::Result<T, TournamentServiceError>;

#[derive(Debug, Error)]
pub enum TournamentServiceError {
    #[error("An internal server error occured")]
    DataLayerError(DataLayerError),
    #[error("Combat instance {0} not found")]
    InstanceNotFound(i64),
    #[error("User is not a participant of combat instance {0}")]
    NotParticipant(i64),
}

impl From<DataLayerError> for TournamentServiceError {
    fn from(e: DataLayerError) -> Self {
        TournamentServiceError::DataLayerError(e)
    }
}

impl IntoResponse for TournamentServiceError {
    fn into_response(self) -> Response {
        match self {
            TournamentServiceError::DataLayerError(e) => {
                error!("{:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occured").into_response()
            }
            TournamentServiceError::InstanceNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
            TournamentServiceError::NotParticipant(_) => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
        }
    }
}
