// src/bidding/adapter.rs

use reqwest::Method;

use crate::bidding::errors::AdapterError;
use crate::openrtb::request::BidRequest;
use crate::openrtb::response::{Bid, BidType};

/// 交给宿主执行的外呼请求描述
#[derive(Debug, Clone, PartialEq)]
pub struct RequestData {
    pub method: Method,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl RequestData {
    /// 取第一个同名 header（大小写不敏感）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 宿主执行后的结果描述
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseData {
    pub status_code: u16,
    pub body: Vec<u8>,
}

/// 带媒体类型的竞价
#[derive(Debug, Clone, PartialEq)]
pub struct TypedBid {
    pub bid: Bid,
    pub bid_type: BidType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BidderResponse {
    pub currency: String,
    pub bids: Vec<TypedBid>,
}

/// 单个需求方适配器的协议。
/// 两个方法都不 panic：能产出的结果与错误一起返回。
pub trait Bidder: Send + Sync {
    /// 适配器名称，用于日志
    fn name(&self) -> &'static str;

    fn make_requests(&self, request: &BidRequest) -> (Vec<RequestData>, Vec<AdapterError>);

    fn make_bids(
        &self,
        internal_request: &BidRequest,
        external_request: &RequestData,
        response: &ResponseData,
    ) -> (Option<BidderResponse>, Vec<AdapterError>);
}
