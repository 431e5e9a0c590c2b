// src/bidding/yieldlab/response.rs

use serde::{Deserialize, Serialize};

use crate::bidding::errors::AdapterError;
use crate::bidding::yieldlab::gdpr::DsaTransparency;

/// 尺寸字符串中宽高的分隔符
pub const ADSIZE_SEPARATOR: &str = "x";

/// **Yieldprobe 响应数组中的单个元素**
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct YieldlabBid {
    /// 产生该竞价的广告位 ID
    pub id: u64,
    /// 价格，单位为分（欧分）
    pub price: u64,
    #[serde(default)]
    pub advertiser: String,
    /// `"<宽>x<高>"`
    #[serde(default)]
    pub adsize: String,
    /// deal ID
    #[serde(default)]
    pub pid: u64,
    /// 内部 ID
    #[serde(default)]
    pub did: u64,
    /// 每次展示的 view ID，拼接广告源 URL 时回传
    #[serde(default)]
    pub pvid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsa: Option<DsaResponse>,
}

/// DSA 透明度信息（响应侧）
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DsaResponse {
    #[serde(default)]
    pub behalf: String,
    #[serde(default)]
    pub paid: String,
    #[serde(default)]
    pub adrender: i32,
    #[serde(default)]
    pub transparency: Vec<DsaTransparency>,
}

/// 解析 Yieldprobe 响应体，格式错误使整个响应失败
pub fn decode_bids(body: &[u8]) -> Result<Vec<YieldlabBid>, AdapterError> {
    // simd-json 需要可写缓冲区
    let mut buffer = body.to_vec();
    simd_json::serde::from_slice::<Vec<YieldlabBid>>(&mut buffer).map_err(|e| {
        AdapterError::bad_server_response(format!("failed to parse bids response from yieldlab: {}", e))
    })
}

/// 解析 `"300x250"`。
/// 不是两段的尺寸返回 (0, 0) 且不报错；两段但不是数字则报错。
pub fn split_size(size: &str) -> Result<(u64, u64), AdapterError> {
    let parts: Vec<&str> = size.split(ADSIZE_SEPARATOR).collect();
    let [width, height] = parts.as_slice() else {
        return Ok((0, 0));
    };

    let parse = |part: &str| {
        part.parse::<u64>().map_err(|e| {
            AdapterError::bad_server_response(format!("failed to parse yieldlab adsize: {}", e))
        })
    };

    Ok((parse(width)?, parse(height)?))
}

/// 分转换为元
pub fn price_to_major(minor_units: u64) -> f64 {
    minor_units as f64 / 100.0
}
