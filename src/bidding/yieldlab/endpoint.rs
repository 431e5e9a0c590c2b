// src/bidding/yieldlab/endpoint.rs

use std::collections::BTreeMap;

use url::form_urlencoded;
use url::Url;

use crate::bidding::clock::CacheBuster;
use crate::bidding::errors::AdapterError;
use crate::bidding::yieldlab::gdpr::{self, DsaRequest};
use crate::bidding::yieldlab::params::ExtImpYieldlab;
use crate::openrtb::request::BidRequest;

/// Yieldlab 用户 ID 的命名空间前缀
pub const YIELDLAB_ID_PREFIX: &str = "ylid:";

/// 按 key 排序序列化 query 参数
pub(crate) fn encode_query(query: &BTreeMap<&'static str, String>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// targeting 编码为 `k1=v1&k2=v2`（按 key 排序），整体再作为 `t` 的值
pub fn make_targeting_values(params: &ExtImpYieldlab) -> String {
    let sorted: BTreeMap<&str, &str> = params
        .targeting
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(sorted)
        .finish()
}

fn insert_dsa(query: &mut BTreeMap<&'static str, String>, dsa: &DsaRequest) {
    if let Some(required) = dsa.required {
        query.insert("dsarequired", required.to_string());
    }
    if let Some(pub_render) = dsa.pub_render {
        query.insert("dsapubrender", pub_render.to_string());
    }
    if let Some(data_to_pub) = dsa.data_to_pub {
        query.insert("dsadatatopub", data_to_pub.to_string());
    }
    let transparency = gdpr::dsa_transparency_param(&dsa.transparency);
    if !transparency.is_empty() {
        query.insert("dsatransparency", transparency);
    }
}

/// **拼装 Yieldprobe 请求地址**
///
/// 路径追加合并后的广告位 ID；query 固定带 `content=json`、`pvid=true` 和防缓存 `ts`，
/// 再按请求上下文追加用户、设备、应用、GDPR 与 DSA 参数。
/// GDPR 解析失败会向上返回，`gdpr` / `consent` 只会成对出现。
pub fn make_endpoint_url(
    endpoint: &str,
    request: &BidRequest,
    params: &ExtImpYieldlab,
    cache_buster: &dyn CacheBuster,
) -> Result<String, AdapterError> {
    let mut uri = Url::parse(endpoint)
        .map_err(|e| AdapterError::bad_input(format!("failed to parse yieldlab endpoint: {}", e)))?;

    uri.path_segments_mut()
        .map_err(|_| AdapterError::bad_input(format!("failed to parse yieldlab endpoint: {} cannot be a base", endpoint)))?
        .pop_if_empty()
        .push(&params.adslot_id);

    let mut query: BTreeMap<&'static str, String> = BTreeMap::new();
    query.insert("content", "json".to_string());
    query.insert("pvid", "true".to_string());
    query.insert("ts", cache_buster.token());
    query.insert("t", make_targeting_values(params));

    if let Some(buyer_uid) = request.buyer_uid() {
        query.insert("ids", format!("{}{}", YIELDLAB_ID_PREFIX, buyer_uid));
    }

    if let Some(device) = &request.device {
        query.insert("yl_rtb_ifa", device.ifa.clone());
        query.insert("yl_rtb_devicetype", device.devicetype.unwrap_or_default().to_string());

        if let Some(connection_type) = device.connectiontype {
            query.insert("yl_rtb_connectiontype", connection_type.to_string());
        }

        if let Some(geo) = &device.geo {
            query.insert("lat", geo.lat.to_string());
            query.insert("lon", geo.lon.to_string());
        }
    }

    if let Some(app) = &request.app {
        query.insert("pubappname", app.name.clone());
        query.insert("pubbundlename", app.bundle.clone());
    }

    // 外呼请求：法规扩展解析失败直接报错
    gdpr::regulatory_signal(request)?.insert_into(&mut query);

    if let Some(dsa) = gdpr::dsa_request(request)? {
        insert_dsa(&mut query, &dsa);
    }

    uri.set_query(Some(&encode_query(&query)));
    Ok(uri.to_string())
}
