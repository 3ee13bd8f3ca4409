use axum::{response::{IntoResponse, Response}, http::StatusCode};
use log::error;
use thiserror::Error;

use crate::data_layer_error::DataLayerError;

pub type Result<T> = std::result::Result<T, BossServiceError>;

#[derive(Debug, Error)]
pub enum BossServiceError {
    #[error("An internal server error occured")]
    DataLayerError(DataLayerError),
    #[error("No boss templates are configured")]
    NoBossTemplates,
    #[error("Invalid month `{0}`, expected YYYY-MM")]
    InvalidMonth(String),
}

impl From<DataLayerError> for BossServiceError {
    fn from(e: DataLayerError) -> Self {
        BossServiceError::DataLayerError(e)
    }
}

impl IntoResponse for BossServiceError {
    fn into_response(self) -> Response {
        match self {
            BossServiceError::InvalidMonth(_) => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            e => {
                error!("{:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occured").into_response()
            }
        }
    }
}
