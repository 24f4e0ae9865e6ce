use reqwest::StatusCode;

use crate::UploadError;

/// Classifies a storage endpoint response.
///
/// The storage endpoint signals acceptance with `201 Created` and nothing
/// else; any other status (200 included) is an error carrying the provider's
/// full diagnostic body.
pub fn check_storage_response(status: StatusCode, body: String) -> Result<(), UploadError> {
    if status == StatusCode::CREATED {
        Ok(())
    } else {
        Err(UploadError::Storage {
            status: status.as_u16(),
            body,
        })
    }
}
