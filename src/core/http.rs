// SPDX-License-Identifier: MIT

//! reqwest-backed transport

use crate::core::error::{RequestError, Result};
use crate::core::transport::{wire_string, RequestOptions, Transport, TransportResponse};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Map, Value};
use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport whose timeout comes from `DATAPOINT_HTTP_TIMEOUT_SECS`
    pub fn new() -> Result<Self> {
        let secs = env::var("DATAPOINT_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::with_timeout(Duration::from_secs(secs))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn build_url(options: &RequestOptions) -> std::result::Result<url::Url, RequestError> {
        let mut url = url::Url::parse(&options.url)
            .map_err(|e| RequestError::new(format!("Invalid url '{}': {}", options.url, e)))?;
        if !options.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &options.query {
                pairs.append_pair(key, &wire_string(value));
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch(
        &self,
        options: &RequestOptions,
    ) -> std::result::Result<TransportResponse, RequestError> {
        let url = Self::build_url(options)?;
        let method = Method::from_bytes(options.method.to_uppercase().as_bytes())
            .map_err(|_| RequestError::new(format!("Invalid method '{}'", options.method)))?;

        log::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), wire_string(value));
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }
        if let Some(ms) = options.timeout_ms {
            request = request.timeout(Duration::from_millis(ms));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| RequestError::new(e.to_string()))?;

        let status = resp.status();
        let mut headers = Map::new();
        for (name, value) in resp.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.to_string(), Value::String(v.to_string()));
            }
        }

        let text = resp
            .text()
            .await
            .map_err(|e| RequestError::new(e.to_string()).with_status(status.as_u16()))?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        if !status.is_success() {
            return Err(RequestError::new(format!(
                "{} responded with {}",
                options.url, status
            ))
            .with_status(status.as_u16())
            .with_body(body));
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_url_appends_query() {
        let mut options = RequestOptions::new("https://swapi.dev/api/people");
        options.query.insert("search".to_string(), json!("r2"));
        options.query.insert("page".to_string(), json!(2));

        let url = HttpTransport::build_url(&options).unwrap();
        assert_eq!(url.as_str(), "https://swapi.dev/api/people?search=r2&page=2");
    }

    #[test]
    fn test_build_url_rejects_garbage() {
        let options = RequestOptions::new("not a url");
        let err = HttpTransport::build_url(&options).unwrap_err();
        assert!(err.message.contains("Invalid url"));
    }

    #[tokio::test]
    async fn test_invalid_method_is_request_error() {
        let transport = HttpTransport::with_timeout(Duration::from_secs(1)).unwrap();
        let mut options = RequestOptions::new("http://localhost");
        options.method = "NOT A METHOD".to_string();
        let err = transport.dispatch(&options).await.unwrap_err();
        assert!(err.status.is_none());
    }
}
