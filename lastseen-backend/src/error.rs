/// Application error type
#[derive(Debug)]
pub enum AppError {
  StorageError(lastseen_db::DbError),
  ValidationError(crate::validation::ValidationError),
}

impl AppError {
  /// Text safe to show a player. Storage details stay in the log.
  pub fn user_message(&self) -> String {
    match self {
      AppError::StorageError(db_err) => {
        // Log the detailed error server-side
        tracing::error!(?db_err, "Storage error occurred");
        "An internal error occurred. Please try again later.".to_string()
      }
      AppError::ValidationError(err) => {
        tracing::warn!(validation_error = %err, "Validation failed");
        err.to_string()
      }
    }
  }
}

impl std::fmt::Display for AppError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      AppError::StorageError(err) => write!(f, "{err}"),
      AppError::ValidationError(err) => write!(f, "{err}"),
    }
  }
}

impl std::error::Error for AppError {}

impl From<lastseen_db::DbError> for AppError {
  fn from(err: lastseen_db::DbError) -> Self {
    AppError::StorageError(err)
  }
}

impl From<crate::validation::ValidationError> for AppError {
  fn from(err: crate::validation::ValidationError) -> Self {
    AppError::ValidationError(err)
  }
}
