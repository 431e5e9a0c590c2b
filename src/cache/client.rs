// src/cache/client.rs

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{timeout, Duration};
use tracing::error;

/// **结果缓存客户端**
///
/// 返回的 ID 列表与输入等长、同序；存储失败的位置为空字符串。
/// 实现方负责记录日志，不向调用方抛错；超过 `timeout_ms` 按全部失败处理。
pub trait CacheClient: Send + Sync {
    fn put_json<'a>(&'a self, values: &'a [Value], timeout_ms: u64) -> BoxFuture<'a, Vec<String>>;
}

#[derive(Serialize)]
struct PutRequest<'a> {
    puts: Vec<PutObject<'a>>,
}

#[derive(Serialize)]
struct PutObject<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a Value,
}

#[derive(Deserialize)]
struct PutResponse {
    responses: Vec<Value>,
}

/// 基于 HTTP 的缓存客户端，POST 到 `<base>/cache`
#[derive(Clone)]
pub struct HttpCacheClient {
    client: Client,
    put_url: String,
}

impl HttpCacheClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            put_url: format!("{}/cache", base_url.trim_end_matches('/')),
        }
    }

    pub fn put_url(&self) -> &str {
        &self.put_url
    }

    async fn put(&self, values: &[Value]) -> Vec<String> {
        let mut uuids = vec![String::new(); values.len()];
        if values.is_empty() {
            return uuids;
        }

        let body = PutRequest {
            puts: values.iter().map(|value| PutObject { kind: "json", value }).collect(),
        };

        let resp = match self
            .client
            .post(&self.put_url)
            .header("Content-Type", "application/json;charset=utf-8")
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                error!(url = %self.put_url, error = %e, "Error sending the request to the cache");
                return uuids;
            }
        };

        let status = resp.status();
        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(url = %self.put_url, error = %e, "Error reading the cache response");
                return uuids;
            }
        };
        if status != reqwest::StatusCode::OK {
            error!(
                url = %self.put_url,
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&bytes),
                "Cache call returned a non-200 status"
            );
            return uuids;
        }

        let parsed: PutResponse = match serde_json::from_slice(&bytes) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = %e, body = %String::from_utf8_lossy(&bytes), "Cache response body was malformed");
                return uuids;
            }
        };

        for (slot, response) in uuids.iter_mut().zip(parsed.responses.iter()) {
            match response.get("uuid").and_then(Value::as_str) {
                Some(uuid) => *slot = uuid.to_string(),
                None => error!(response = %response, "Cache response had a malformed element, skipping"),
            }
        }
        uuids
    }
}

impl CacheClient for HttpCacheClient {
    fn put_json<'a>(&'a self, values: &'a [Value], timeout_ms: u64) -> BoxFuture<'a, Vec<String>> {
        Box::pin(async move {
            match timeout(Duration::from_millis(timeout_ms), self.put(values)).await {
                Ok(uuids) => uuids,
                Err(_) => {
                    error!(url = %self.put_url, timeout_ms, "Cache call timed out");
                    vec![String::new(); values.len()]
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn stores_values_and_returns_ids_in_order() {
        let seen = Arc::new(Mutex::new(Value::Null));
        let recorder = seen.clone();
        let app = Router::new().route(
            "/cache",
            post(move |Json(body): Json<Value>| {
                let recorder = recorder.clone();
                async move {
                    *recorder.lock().unwrap() = body;
                    Json(json!({"responses": [{"uuid": "a"}, {"uuid": "b"}]}))
                }
            }),
        );
        let client = HttpCacheClient::new(Client::new(), &serve(app).await);

        let ids = client.put_json(&[json!({"price": 1.5}), json!("markup")], 1000).await;
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(
            *seen.lock().unwrap(),
            json!({"puts": [{"type": "json", "value": {"price": 1.5}}, {"type": "json", "value": "markup"}]})
        );
    }

    #[tokio::test]
    async fn malformed_elements_leave_empty_ids() {
        let app = Router::new().route(
            "/cache",
            post(|| async { Json(json!({"responses": [{"uuid": 7}, {"uuid": "b"}]})) }),
        );
        let client = HttpCacheClient::new(Client::new(), &serve(app).await);
        let ids = client.put_json(&[json!(1), json!(2), json!(3)], 1000).await;
        assert_eq!(ids, vec!["", "b", ""]);
    }

    #[tokio::test]
    async fn non_200_fails_closed() {
        let app = Router::new().route("/cache", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "down") }));
        let client = HttpCacheClient::new(Client::new(), &serve(app).await);
        assert_eq!(client.put_json(&[json!(1), json!(2)], 1000).await, vec!["", ""]);
    }

    #[tokio::test]
    async fn slow_cache_times_out_with_empty_ids() {
        let app = Router::new().route(
            "/cache",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Json(json!({"responses": [{"uuid": "late"}]}))
            }),
        );
        let client = HttpCacheClient::new(Client::new(), &serve(app).await);

        let start = std::time::Instant::now();
        let ids = client.put_json(&[json!(1)], 100).await;
        assert_eq!(ids, vec![""]);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn non_json_body_fails_closed() {
        let app = Router::new().route("/cache", post(|| async { "not json" }));
        let client = HttpCacheClient::new(Client::new(), &serve(app).await);
        assert_eq!(client.put_json(&[json!(1)], 1000).await, vec![""]);
    }

    #[tokio::test]
    async fn unreachable_cache_fails_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = HttpCacheClient::new(Client::new(), &format!("http://{}/", addr));
        assert_eq!(client.put_url(), format!("http://{}/cache", addr));
        assert_eq!(client.put_json(&[json!(1)], 1000).await, vec![""]);
    }
}
