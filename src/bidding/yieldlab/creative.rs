// src/bidding/yieldlab/creative.rs

use std::collections::BTreeMap;

use url::form_urlencoded;

use crate::bidding::clock::{CacheBuster, WeekSource};
use crate::bidding::yieldlab::endpoint::{encode_query, YIELDLAB_ID_PREFIX};
use crate::bidding::yieldlab::gdpr;
use crate::bidding::yieldlab::params::ExtImpYieldlab;
use crate::bidding::yieldlab::response::YieldlabBid;
use crate::openrtb::request::BidRequest;

const AD_SOURCE_HOST: &str = "https://ad.yieldlab.net/d";

/// **广告源 URL**：`https://ad.yieldlab.net/d/<广告位>/<supply>/<尺寸>?<query>`
///
/// 这里不会失败：GDPR 扩展解析失败时直接省略 `gdpr` / `consent`，
/// 与外呼请求（失败即报错）的处理方式不同。
pub fn make_ad_source_url(
    request: &BidRequest,
    ext: &ExtImpYieldlab,
    bid: &YieldlabBid,
    cache_buster: &dyn CacheBuster,
) -> String {
    let mut query: BTreeMap<&'static str, String> = BTreeMap::new();
    query.insert("ts", cache_buster.token());
    query.insert("id", ext.ext_id.clone());
    query.insert("pvid", bid.pvid.clone());

    if let Some(buyer_uid) = request.buyer_uid() {
        query.insert("ids", format!("{}{}", YIELDLAB_ID_PREFIX, buyer_uid));
    }

    if let Ok(signal) = gdpr::regulatory_signal(request) {
        signal.insert_into(&mut query);
    }

    format!(
        "{}/{}/{}/{}?{}",
        AD_SOURCE_HOST,
        path_segment(&ext.adslot_id),
        path_segment(&ext.supply_id),
        path_segment(&bid.adsize),
        encode_query(&query)
    )
}

/// 路径段转义，防止上游返回的值破坏 URL 或外层 script 标签
fn path_segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Banner markup：用 script 标签包住广告源 URL
pub fn make_banner_ad_source(ad_source_url: &str) -> String {
    format!("<script src=\"{}\"></script>", ad_source_url)
}

/// creative ID = 广告位 + pid + ISO 周数，按周轮换
pub fn make_creative_id(ext: &ExtImpYieldlab, bid: &YieldlabBid, week: &dyn WeekSource) -> String {
    format!("{}{}{}", ext.adslot_id, bid.pid, week.week())
}
