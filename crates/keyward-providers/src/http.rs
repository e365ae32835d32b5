//! Shared HTTP plumbing for adapters.

use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use keyward_core::config::HttpConfig;

use crate::error::{AdapterError, AdapterResult};

/// Build the client every adapter shares.
pub fn build_client(config: &HttpConfig) -> AdapterResult<Client> {
    Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(AdapterError::from)
}

/// Join a configured base URL and an endpoint path without doubling slashes.
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// `Authorization: Bearer <key>`, marked sensitive so it never shows up in
/// reqwest's own debug output.
pub fn bearer(request: RequestBuilder, key: &SecretString) -> AdapterResult<RequestBuilder> {
    let value = format!("Bearer {}", key.expose_secret());
    secret_header(request, reqwest::header::AUTHORIZATION.as_str(), &value)
}

pub fn secret_header(
    request: RequestBuilder,
    name: &str,
    value: &str,
) -> AdapterResult<RequestBuilder> {
    let mut value = reqwest::header::HeaderValue::from_str(value)
        .map_err(|_| AdapterError::transport("key contains characters not allowed in a header"))?;
    value.set_sensitive(true);
    Ok(request.header(name, value))
}

/// Send and require a 2xx, describing failures by `what` (e.g. `"GET /models"`).
pub async fn send_ok(request: RequestBuilder, what: &str) -> AdapterResult<Response> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AdapterError::http_status(
            status.as_u16(),
            format!("{what} responded with {status}"),
        ));
    }
    Ok(response)
}

/// Parse a response body as JSON, mapping garbage to `UnexpectedResponseShape`.
pub async fn json_body(response: Response, what: &str) -> AdapterResult<Value> {
    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| AdapterError::UnexpectedResponseShape(format!("{what}: body is not JSON ({e})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(endpoint("https://api.x.ai/v1/", "/models"), "https://api.x.ai/v1/models");
        assert_eq!(endpoint("http://127.0.0.1:1234", "v1/models"), "http://127.0.0.1:1234/v1/models");
    }

    #[tokio::test]
    async fn client_builds_from_defaults() {
        assert!(build_client(&HttpConfig::default()).is_ok());
    }

    #[test]
    fn header_rejects_newlines() {
        let client = Client::new();
        let req = client.get("http://localhost/");
        let err = bearer(req, &SecretString::from("bad\nkey")).unwrap_err();
        assert!(!err.to_string().contains("bad"));
    }
}
