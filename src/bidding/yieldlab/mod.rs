// src/bidding/yieldlab/mod.rs

pub mod creative;
pub mod endpoint;
pub mod gdpr;
pub mod params;
pub mod response;

use std::sync::Arc;

use reqwest::Method;
use serde_json::json;
use tracing::{debug, warn};

use crate::bidding::adapter::{Bidder, BidderResponse, RequestData, ResponseData, TypedBid};
use crate::bidding::clock::{CacheBuster, SystemClock, WeekSource};
use crate::bidding::errors::AdapterError;
use crate::openrtb::request::{BidRequest, Imp};
use crate::openrtb::response::{Bid, BidType};

use self::params::ExtImpYieldlab;
use self::response::YieldlabBid;

/// Yieldlab 结算币种固定为欧元
pub const YIELDLAB_CURRENCY: &str = "EUR";

/// **Yieldlab 适配器**
///
/// 无内部可变状态；时钟与周数以能力对象注入，可在多个任务间共享。
#[derive(Clone)]
pub struct YieldlabAdapter {
    endpoint: String,
    cache_buster: Arc<dyn CacheBuster>,
    week: Arc<dyn WeekSource>,
}

impl YieldlabAdapter {
    pub fn new(endpoint: &str) -> Self {
        Self::with_clock(endpoint, Arc::new(SystemClock), Arc::new(SystemClock))
    }

    pub fn with_clock(endpoint: &str, cache_buster: Arc<dyn CacheBuster>, week: Arc<dyn WeekSource>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            cache_buster,
            week,
        }
    }

    fn make_request(&self, request: &BidRequest) -> Result<RequestData, AdapterError> {
        let params = params::parse_request(&request.imp)?;
        if params.is_empty() {
            return Err(AdapterError::bad_input(format!("request {} has no imps", request.id)));
        }
        let merged = params::merge_params(&params);
        let uri = endpoint::make_endpoint_url(&self.endpoint, request, &merged, self.cache_buster.as_ref())?;

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(site) = &request.site {
            headers.push(("Referer".to_string(), site.page.clone()));
        }
        if let Some(device) = &request.device {
            headers.push(("User-Agent".to_string(), device.ua.clone()));
            headers.push(("X-Forwarded-For".to_string(), device.ip.clone()));
        }
        if let Some(user) = &request.user {
            headers.push(("Cookie".to_string(), format!("id={}", user.buyeruid)));
        }

        Ok(RequestData {
            method: Method::GET,
            uri,
            headers,
            body: None,
        })
    }

    /// 单条竞价的映射。`Ok(None)` 表示该 imp 的媒体类型不支持，跳过。
    fn make_bid(
        &self,
        internal_request: &BidRequest,
        requests: &[ExtImpYieldlab],
        index: usize,
        bid: &YieldlabBid,
    ) -> Result<Option<TypedBid>, AdapterError> {
        let (width, height) = response::split_size(&bid.adsize)?;

        // 价格、creative 等字段按广告位 ID 对应
        let req = params::find_bid_req(bid.id, requests).ok_or_else(|| AdapterError::InternalConsistency {
            message: format!(
                "failed to find yieldlab request for adslotID {}. This is most likely a programming issue",
                bid.id
            ),
        })?;

        // 媒体类型与 impid 按数组下标对应，依赖 Yieldprobe 按请求顺序返回
        let imp: &Imp = internal_request.imp.get(index).ok_or_else(|| AdapterError::InternalConsistency {
            message: format!(
                "yieldlab response entry {} has no imp at the same position ({} imps requested)",
                index,
                internal_request.imp.len()
            ),
        })?;

        let bid_type = if imp.video.is_some() {
            BidType::Video
        } else if imp.banner.is_some() {
            BidType::Banner
        } else {
            debug!(imp_id = %imp.id, "yieldlab does not support audio or native imps, skipping");
            return Ok(None);
        };

        let ad_source_url = creative::make_ad_source_url(internal_request, req, bid, self.cache_buster.as_ref());
        let (adm, nurl) = match bid_type {
            BidType::Banner => (Some(creative::make_banner_ad_source(&ad_source_url)), None),
            _ => (None, Some(ad_source_url)),
        };

        let ext = bid.dsa.as_ref().map(|dsa| json!({ "dsa": dsa }));

        Ok(Some(TypedBid {
            bid: Bid {
                id: bid.id.to_string(),
                impid: imp.id.clone(),
                price: response::price_to_major(bid.price),
                adm,
                nurl,
                crid: creative::make_creative_id(req, bid, self.week.as_ref()),
                dealid: bid.pid.to_string(),
                w: width,
                h: height,
                ext,
            },
            bid_type,
        }))
    }
}

impl Bidder for YieldlabAdapter {
    fn name(&self) -> &'static str {
        "yieldlab"
    }

    fn make_requests(&self, request: &BidRequest) -> (Vec<RequestData>, Vec<AdapterError>) {
        match self.make_request(request) {
            Ok(request_data) => (vec![request_data], vec![]),
            Err(e) => {
                warn!(request_id = %request.id, kind = ?e.kind(), error = %e, "yieldlab request not built");
                (vec![], vec![e])
            }
        }
    }

    fn make_bids(
        &self,
        internal_request: &BidRequest,
        _external_request: &RequestData,
        response: &ResponseData,
    ) -> (Option<BidderResponse>, Vec<AdapterError>) {
        if response.status_code != 200 {
            return (None, vec![AdapterError::UnexpectedStatus { status: response.status_code }]);
        }

        let bids = match response::decode_bids(&response.body) {
            Ok(bids) => bids,
            Err(e) => return (None, vec![e]),
        };

        // 再次解析原始参数，用于按广告位 ID 对应
        let requests = match params::parse_request(&internal_request.imp) {
            Ok(requests) => requests,
            Err(e) => return (None, vec![e]),
        };

        let mut typed_bids = Vec::with_capacity(bids.len());
        for (index, bid) in bids.iter().enumerate() {
            match self.make_bid(internal_request, &requests, index, bid) {
                Ok(Some(typed_bid)) => typed_bids.push(typed_bid),
                Ok(None) => {}
                Err(e) => return (None, vec![e]),
            }
        }

        (
            Some(BidderResponse {
                currency: YIELDLAB_CURRENCY.to_string(),
                bids: typed_bids,
            }),
            vec![],
        )
    }
}
