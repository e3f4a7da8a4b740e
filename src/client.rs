/// HTTP client for the dashboard backend
///
/// Thin wrapper over `reqwest` that turns every failure into an
/// [`ApiError`] a view can show as-is. There is no retry and no timeout;
/// a failed call is retried by the user issuing the same fetch again.

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::record::Record;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::future::Future;

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl BackendClient {
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: ApiConfig) -> Self {
        BackendClient { http, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        let url = self.config.endpoint(path);
        debug!("GET {}", url);
        let request = self.http.get(&url).query(query);
        Self::execute(request, &url).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        debug!("POST {}", url);
        let request = self.http.post(&url).json(body);
        Self::execute(request, &url).await
    }

    /// Fetch rows. `field` names the array inside the response object; `None`
    /// expects the body itself to be the array.
    pub async fn get_records(
        &self,
        path: &str,
        query: &[(&str, &str)],
        field: Option<&str>,
    ) -> Result<Vec<Record>, ApiError> {
        let body: JsonValue = self.get_json(path, query).await?;
        records_from(body, field)
    }

    async fn execute<T: DeserializeOwned>(request: reqwest::RequestBuilder, url: &str) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            let err = ApiError::from_status(status.as_u16(), status.canonical_reason(), &body);
            warn!("{} failed: {}", url, err);
            return Err(err);
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("{} returned unexpected body: {}", url, e);
            ApiError::Parse { detail: e.to_string() }
        })
    }
}

/// Pull the record array out of a response body
pub fn records_from(body: JsonValue, field: Option<&str>) -> Result<Vec<Record>, ApiError> {
    let rows = match field {
        Some(name) => match body {
            JsonValue::Object(mut object) => object.remove(name).unwrap_or(JsonValue::Null),
            _ => JsonValue::Null,
        },
        None => body,
    };

    match rows {
        // A missing array is an empty table, not an error
        JsonValue::Null => Ok(Vec::new()),
        JsonValue::Array(items) => items
            .into_iter()
            .map(|item| {
                Record::from_json(item).ok_or_else(|| ApiError::Parse {
                    detail: "row is not an object".to_string(),
                })
            })
            .collect(),
        _ => Err(ApiError::Parse {
            detail: format!("'{}' is not an array", field.unwrap_or("body")),
        }),
    }
}

/// Both halves of a paired fetch
#[derive(Debug)]
pub struct PairOutcome<A, B> {
    pub primary: Result<A, ApiError>,
    pub secondary: Result<B, ApiError>,
}

impl<A, B> PairOutcome<A, B> {
    pub fn both_ok(&self) -> bool {
        self.primary.is_ok() && self.secondary.is_ok()
    }
}

/// Run two requests concurrently and wait for both
pub async fn join_pair<A, B, FA, FB>(primary: FA, secondary: FB) -> PairOutcome<A, B>
where
    FA: Future<Output = Result<A, ApiError>>,
    FB: Future<Output = Result<B, ApiError>>,
{
    let (primary, secondary) = tokio::join!(primary, secondary);
    PairOutcome { primary, secondary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_from_array() {
        let rows = records_from(json!([{"a": 1}, {"a": null}]), None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].display("a"), "1");
        assert!(rows[1].value("a").is_null());
    }

    #[test]
    fn test_records_from_field() {
        let body = json!({"errors": [{"serverName": "S1"}], "queryMeta": {}});
        let rows = records_from(body, Some("errors")).unwrap();
        assert_eq!(rows[0].display("serverName"), "S1");

        let rows = records_from(json!([{"zeta": 1, "alpha": 2}]), None).unwrap();
        let columns: Vec<&str> = rows[0].columns().collect();
        assert_eq!(columns, vec!["zeta", "alpha"]);

        let rows = records_from(json!({"queryMeta": {}}), Some("errors")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_records_from_bad_shape() {
        assert!(matches!(
            records_from(json!({"errors": "nope"}), Some("errors")),
            Err(ApiError::Parse { .. })
        ));
        assert!(matches!(records_from(json!([1, 2]), None), Err(ApiError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_join_pair_keeps_both_halves() {
        let outcome = join_pair(
            async { Ok::<_, ApiError>(vec![1, 2, 3]) },
            async { Err::<u32, _>(ApiError::Transport("refused".to_string())) },
        )
        .await;
        assert!(!outcome.both_ok());
        assert_eq!(outcome.primary.unwrap().len(), 3);
        assert_eq!(outcome.secondary.unwrap_err().display_message(), "refused");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = BackendClient::new(ApiConfig::for_host_port("127.0.0.1", port));
        let err = client.get_json::<JsonValue>("/api/health", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
