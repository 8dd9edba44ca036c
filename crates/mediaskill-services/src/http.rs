use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ServiceError, ServiceResult};

/// Body text kept in error values.
const MAX_ERROR_BODY: usize = 512;

/// Map a non-2xx response onto a `ServiceError`. `resource` names what was
/// requested and is used in not-found and conflict messages.
pub(crate) async fn ensure_success(resource: &str, response: Response) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    Err(match status {
        StatusCode::NOT_FOUND => ServiceError::NotFound(resource.to_string()),
        StatusCode::CONFLICT => ServiceError::Conflict(resource.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ServiceError::Auth(format!("{} - {}", status, body))
        }
        _ => ServiceError::Http {
            status: status.as_u16(),
            body,
        },
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> ServiceResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(e.to_string()))
}
