use axum::{response::{IntoResponse, Response}, http::StatusCode};
use log::error;
use thiserror::Error;

use crate::data_layer_error::DataLayerError;

pub type Result<T> = std::result::Result<T, SettlementServiceError>;

#[derive(Debug, Error)]
pub enum SettlementServiceError {
    #[error("An internal server error occured")]
    DataLayerError(DataLayerError),
    #[error("A settlement run is already in progress in this process")]
    AlreadyRunning,
    #[error("Settlement lock is held by another runner")]
    LockHeld,
    #[error("Combat instance {0} not found")]
    InstanceNotFound(i64),
    #[error("User is not a participant of combat instance {0}")]
    NotParticipant(i64),
}

impl From<DataLayerError> for SettlementServiceError {
    fn from(e: DataLayerError) -> Self {
        SettlementServiceError::DataLayerError(e)
    }
}

impl IntoResponse for SettlementServiceError {
    fn into_response(self) -> Response {
        match self {
            SettlementServiceError::DataLayerError(e) => {
                error!("{:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occured").into_response()
            }
            SettlementServiceError::AlreadyRunning | SettlementServiceError::LockHeld => {
                (StatusCode::CONFLICT, self.to_string()).into_response()
            }
            SettlementServiceError::InstanceNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
            SettlementServiceError::NotParticipant(_) => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
        }
    }
}
