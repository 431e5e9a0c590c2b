use std::future::Future;
use std::time::Instant;

use futures::future::{join_all, FutureExt};
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use crate::bidding::adapter::{Bidder, TypedBid};
use crate::bidding::errors::AdapterError;
use crate::bidding::vendor_client::VendorClient;
use crate::openrtb::request::BidRequest;
use crate::openrtb::response::{Bid, BidResponse, SeatBid};

/// 一次询价的结果：竞价与错误可以同时存在
#[derive(Debug, Clone)]
pub struct AuctionOutcome {
    pub bidder: &'static str,
    pub currency: Option<String>,
    pub bids: Vec<TypedBid>,
    pub errors: Vec<AdapterError>,
    pub elapsed_ms: u128,
}

impl AuctionOutcome {
    /// 转成宿主的 BidResponse；没有竞价时返回 `nbr = 3` 的空响应
    pub fn to_bid_response(&self, request_id: &str) -> BidResponse {
        let currency = self.currency.as_deref().unwrap_or("EUR");
        if self.bids.is_empty() {
            return BidResponse::no_fill(request_id, currency);
        }
        BidResponse {
            id: request_id.to_string(),
            seatbid: vec![SeatBid {
                bid: self.bids.iter().map(tagged_bid).collect(),
                seat: Some(self.bidder.to_string()),
            }],
            cur: Some(currency.to_string()),
            nbr: None,
        }
    }
}

/// 把媒体类型写入 `ext.prebid.type`，保留 ext 中已有字段
fn tagged_bid(typed: &TypedBid) -> Bid {
    let mut bid = typed.bid.clone();
    let bid_id = bid.id.clone();
    let media_type = json!(typed.bid_type);
    match bid.ext_object_mut() {
        Some(ext) => match ext.entry("prebid").or_insert_with(|| Value::Object(Map::new())) {
            Value::Object(prebid) => {
                prebid.insert("type".to_string(), media_type);
            }
            _ => warn!(bid_id = %bid_id, "bid ext.prebid is not an object, media type dropped"),
        },
        None => warn!(bid_id = %bid_id, "bid ext is not an object, media type dropped"),
    }
    bid
}

/// 对单个适配器执行一次完整询价：
/// make_requests -> 并发外呼 -> make_bids。
/// 外呼共享同一个超时与取消信号，内部不重试。
pub async fn process_bid_request<C>(
    bidder: &dyn Bidder,
    client: &VendorClient,
    request: &BidRequest,
    timeout_ms: u64,
    cancel: C,
) -> AuctionOutcome
where
    C: Future<Output = ()>,
{
    let start = Instant::now();
    let (requests, mut errors) = bidder.make_requests(request);
    let cancel = cancel.shared();

    let calls = requests.iter().map(|request_data| {
        let cancel = cancel.clone();
        async move { (request_data, client.execute(request_data, timeout_ms, cancel).await) }
    });

    let mut currency = None;
    let mut bids = Vec::new();
    for (request_data, result) in join_all(calls).await {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(request_id = %request.id, bidder = bidder.name(), error = %e, "yieldlab call failed");
                errors.push(e);
                continue;
            }
        };

        let (bidder_response, bid_errors) = bidder.make_bids(request, request_data, &response);
        for e in &bid_errors {
            error!(
                request_id = %request.id,
                bidder = bidder.name(),
                kind = ?e.kind(),
                error = %e,
                "yieldlab response rejected"
            );
        }
        errors.extend(bid_errors);
        if let Some(bidder_response) = bidder_response {
            currency = Some(bidder_response.currency);
            bids.extend(bidder_response.bids);
        }
    }

    let elapsed_ms = start.elapsed().as_millis();
    info!(
        request_id = %request.id,
        bidder = bidder.name(),
        bids = bids.len(),
        errors = errors.len(),
        elapsed_ms = elapsed_ms as u64,
        "auction finished"
    );

    AuctionOutcome {
        bidder: bidder.name(),
        currency,
        bids,
        errors,
        elapsed_ms,
    }
}
