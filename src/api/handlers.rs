use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::bidding::engine::process_bid_request;
use crate::logging::auction_log::AuctionLog;
use crate::openrtb::request::BidRequest;
use crate::openrtb::response::{Bid, BidResponse};
use crate::AppState;

/// **处理 OpenRTB 竞价请求**
///
/// 调用方断开时 axum 会丢弃该 future，进行中的外呼随之中止。
pub async fn handle_openrtb_request(
    State(state): State<Arc<AppState>>,
    Json(bid_request): Json<BidRequest>,
) -> (StatusCode, Json<BidResponse>) {
    let timeout_ms = bid_request.effective_timeout_ms(state.config.timeout_ms);

    let mut outcome = process_bid_request(
        state.adapter.as_ref(),
        &state.vendor_client,
        &bid_request,
        timeout_ms,
        std::future::pending(),
    )
    .await;

    // ✅ 配置了缓存时，把每个竞价存一份并回填 cache_id
    if let Some(cache) = &state.cache {
        if !outcome.bids.is_empty() {
            let values: Vec<Value> = outcome
                .bids
                .iter()
                .filter_map(|typed| serde_json::to_value(&typed.bid).ok())
                .collect();
            if values.len() == outcome.bids.len() {
                // 缓存与外呼共用同一个时间预算
                let remaining_ms = timeout_ms.saturating_sub(outcome.elapsed_ms as u64);
                let ids = cache.put_json(&values, remaining_ms).await;
                for (typed, id) in outcome.bids.iter_mut().zip(ids) {
                    attach_cache_id(&mut typed.bid, id);
                }
            } else {
                warn!(request_id = %bid_request.id, "some bids could not be serialized for the cache");
            }
        }
    }

    state
        .runtime_logger
        .log_auction(&AuctionLog::from_outcome(&bid_request.id, bid_request.imp.len(), &outcome))
        .await;

    let response = outcome.to_bid_response(&bid_request.id);
    if response.seatbid.is_empty() {
        // ❌ 没有竞价，返回 204 - 无广告可填充
        (StatusCode::NO_CONTENT, Json(response))
    } else {
        (StatusCode::OK, Json(response))
    }
}

/// 空 ID 表示存储失败，不回填
fn attach_cache_id(bid: &mut Bid, id: String) {
    if id.is_empty() {
        return;
    }
    let bid_id = bid.id.clone();
    match bid.ext_object_mut() {
        Some(map) => {
            map.insert("cache_id".to_string(), Value::String(id));
        }
        None => warn!(bid_id = %bid_id, "bid ext is not an object, cache id dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_id_merges_into_existing_ext() {
        let mut bid = Bid { ext: Some(json!({"dsa": {"paid": "p"}})), ..Default::default() };
        attach_cache_id(&mut bid, "uuid-1".into());
        assert_eq!(bid.ext, Some(json!({"dsa": {"paid": "p"}, "cache_id": "uuid-1"})));
    }

    #[test]
    fn empty_cache_id_is_skipped() {
        let mut bid = Bid::default();
        attach_cache_id(&mut bid, String::new());
        assert!(bid.ext.is_none());
    }
}
