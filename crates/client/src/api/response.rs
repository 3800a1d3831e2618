//! Response decoding for the parish REST backend.
//!
//! The backend answers with JSON, either bare or wrapped as
//! `{"success": true, "data": ...}`. A misconfigured deployment can instead
//! serve the site's HTML shell for API paths; that case is detected before
//! any JSON parsing and reported as a configuration problem.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// Upper bound on how much of a non-JSON error body is echoed back.
const MAX_ERROR_TEXT: usize = 200;

/// Whether a raw body is an HTML document rather than JSON.
#[must_use]
pub fn looks_like_html(body: &str) -> bool {
    let head: String = body
        .trim_start_matches('\u{feff}')
        .trim_start()
        .chars()
        .take(9)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// Build the diagnostic for an HTML body.
fn html_error(status: StatusCode, endpoint: &str, api_url_configured: bool) -> ClientError {
    let message = if api_url_configured {
        format!(
            "Received an HTML page instead of JSON from {endpoint}. The API URL configuration \
             looks invalid or the request was routed to a web page; check PARISH_API_URL and \
             the proxy routing for API paths."
        )
    } else {
        format!(
            "Received an HTML page instead of JSON from {endpoint}. The API URL is missing from \
             the configuration; set PARISH_API_URL to the backend's absolute URL."
        )
    };
    ClientError::HtmlResponse {
        status: status.as_u16(),
        status_text: status_text(status),
        message,
    }
}

fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

/// Strip the `{"data": ...}` envelope if present.
fn unwrap_envelope(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    }
}

/// Drop keys the backend mirrors under a second name.
///
/// Documents may carry both `_id` and its virtual `id` copy, and session
/// bodies both `accessToken` and the legacy `token`. Types accept either name,
/// so only one of each pair may reach the deserializer.
fn drop_mirrored_keys(value: &mut serde_json::Value) {
    if let serde_json::Value::Object(map) = value
        && map.contains_key("accessToken")
    {
        map.remove("token");
    }
    drop_virtual_ids(value);
}

fn drop_virtual_ids(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if map.contains_key("_id") {
                map.remove("id");
            }
            map.values_mut().for_each(drop_virtual_ids);
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(drop_virtual_ids),
        _ => {}
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.chars().take(MAX_ERROR_TEXT).collect());
    };

    let field = |key: &str| {
        value
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };

    field("message").or_else(|| field("error")).or_else(|| {
        value
            .get("errors")
            .and_then(serde_json::Value::as_array)
            .and_then(|errors| errors.first())
            .and_then(|first| first.get("msg").or_else(|| first.get("message")))
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
    })
}

/// Decode a response body already read as text.
///
/// # Errors
///
/// - `HtmlResponse` when the body is an HTML document, whatever the status
/// - `Api` for any other non-success status
/// - `Decode` when the JSON does not match `T`
pub fn decode_body<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    endpoint: &str,
    api_url_configured: bool,
) -> Result<T, ClientError> {
    if looks_like_html(body) {
        tracing::error!(
            status = %status,
            endpoint = %endpoint,
            "Backend returned HTML instead of JSON"
        );
        return Err(html_error(status, endpoint, api_url_configured));
    }

    if !status.is_success() {
        let message = error_message(body)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
        return Err(ClientError::Api {
            status: status.as_u16(),
            status_text: status_text(status),
            message,
        });
    }

    let trimmed = body.trim();
    let value: serde_json::Value = if trimmed.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(trimmed).map_err(|source| ClientError::Decode {
            endpoint: endpoint.to_owned(),
            source,
        })?
    };

    let mut value = unwrap_envelope(value);
    drop_mirrored_keys(&mut value);
    serde_json::from_value(value).map_err(|source| ClientError::Decode {
        endpoint: endpoint.to_owned(),
        source,
    })
}
