use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::serve;
use axum::{Json, Router};
use rand::Rng;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};
use tracing::info;
use uuid::Uuid;

use crate::bidding::yieldlab::response::YieldlabBid;

/// 模拟 Yieldprobe 竞价响应
/// 逗号分隔的每个数字广告位返回一条竞价，价格单位为分。
async fn handle_yieldprobe(
    Path(slots): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<YieldlabBid>>, StatusCode> {
    if query.get("content").map(String::as_str) != Some("json") {
        return Err(StatusCode::BAD_REQUEST);
    }

    // 模拟处理延迟（5 ~ 30 毫秒）
    let delay_ms = rand::thread_rng().gen_range(5..30);
    sleep(Duration::from_millis(delay_ms)).await;

    let bids = mock_bids(&slots);
    info!("Mock Yieldprobe answered slots={} bids={}", slots, bids.len());
    Ok(Json(bids))
}

fn mock_bids(slots: &str) -> Vec<YieldlabBid> {
    let mut rng = rand::thread_rng();
    slots
        .split(',')
        .filter_map(|slot| slot.parse::<u64>().ok())
        .map(|id| {
            let adsize = match rng.gen_range(0..3) {
                0 => "300x250",
                1 => "728x90",
                _ => "640x480",
            };
            YieldlabBid {
                id,
                price: rng.gen_range(50..500),
                advertiser: "mock_advertiser".to_string(),
                adsize: adsize.to_string(),
                pid: rng.gen_range(1..10_000),
                did: rng.gen_range(1..10_000),
                pvid: Uuid::new_v4().to_string(),
                dsa: None,
            }
        })
        .collect()
}

/// 模拟缓存服务：每个 put 返回一个新的 uuid
async fn handle_cache_put(Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    let puts = body
        .get("puts")
        .and_then(Value::as_array)
        .ok_or(StatusCode::BAD_REQUEST)?;
    let responses: Vec<Value> = puts
        .iter()
        .map(|_| json!({ "uuid": Uuid::new_v4().to_string() }))
        .collect();
    Ok(Json(json!({ "responses": responses })))
}

/// Yieldprobe（`GET /yp/{slots}`）与缓存（`POST /cache`）的模拟路由
pub fn router() -> Router {
    Router::new()
        .route("/yp/{slots}", get(handle_yieldprobe))
        .route("/cache", post(handle_cache_put))
}

/// 启动模拟上游服务
/// 服务监听指定端口（例如 9001）
pub async fn start_mock_server(port: u16) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Mock Yieldprobe running at http://{}", addr);
    serve(listener, router()).await
}
