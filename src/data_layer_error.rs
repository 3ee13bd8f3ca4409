use std::error::Error;

///
/// Result type for `DataLayer`s. All `DataLayer` implementations
/// should return this type.
///
pub type Result<T> = std::result::Result<T, DataLayerError>;

///
/// Error type for `DataLayer`s. Boxed so that sqlx, serde_json and
/// in-memory implementations can all report through the same channel.
///
pub type DataLayerError = Box<dyn Error + Send + Sync>;
