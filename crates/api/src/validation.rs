use reqwest::StatusCode;

use crate::ApiError;

/// Failure statuses the control plane is documented to return.
const KNOWN_ERROR_STATUSES: [StatusCode; 7] = [
    StatusCode::BAD_REQUEST,
    StatusCode::UNAUTHORIZED,
    StatusCode::FORBIDDEN,
    StatusCode::NOT_FOUND,
    StatusCode::UNPROCESSABLE_ENTITY,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
];

/// Classifies a control-plane response, returning the body on success.
///
/// 200/201/204 are success; the documented error statuses map to
/// [`ApiError::Status`]; anything else is [`ApiError::Unknown`]. The body is
/// always carried into the error so callers can surface the API's
/// diagnostic message. Rate-limited responses (429) are not retried here;
/// retry policy belongs to the caller.
pub fn classify(status: StatusCode, body: String) -> Result<String, ApiError> {
    match status {
        StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(body),
        s if KNOWN_ERROR_STATUSES.contains(&s) => Err(ApiError::Status {
            status: s.as_u16(),
            body,
        }),
        s => Err(ApiError::Unknown {
            status: s.as_u16(),
            body,
        }),
    }
}
