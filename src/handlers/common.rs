use crate::errors::ServiceError;
use validator::Validate;

/// Validate request input, mapping field failures onto the service taxonomy.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))
}
