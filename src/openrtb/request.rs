// src/openrtb/request.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenRTB BidRequest 结构体（宿主拍卖格式）。
/// 各类 `ext` 扩展保留为原始 JSON，由具体的适配器按需解析。
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct BidRequest {
    pub id: String,

    /// 广告展示请求列表（line-item），顺序有意义
    #[serde(default)]
    pub imp: Vec<Imp>,

    /// 网站信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Site>,

    /// 应用信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<App>,

    /// 设备信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,

    /// 用户信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    /// 隐私法规信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regs: Option<Regs>,

    // 其它简单字段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmax: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cur: Option<Vec<String>>,
}

/// 单个广告展示（line-item）
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Imp {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidfloor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,
    /// audio / native 只识别是否存在，适配器不支持这两类
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<Value>,
    /// `{"bidder": {...}}` 形式的适配器扩展
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Banner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub format: Vec<Format>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Format {
    pub w: u64,
    pub h: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Video {
    #[serde(default)]
    pub mimes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minduration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxduration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Site {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub page: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct App {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bundle: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Device {
    #[serde(default)]
    pub ua: String,
    #[serde(default)]
    pub ip: String,
    /// 广告 ID（IDFA / GAID）
    #[serde(default)]
    pub ifa: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devicetype: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectiontype: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<Geo>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Geo {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 买方（Yieldlab）侧的用户 ID
    #[serde(default)]
    pub buyeruid: String,
    /// `{"consent": "..."}` 形式的用户扩展
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Regs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coppa: Option<i32>,
    /// `{"gdpr": 1, "dsa": {...}}` 形式的法规扩展
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

impl BidRequest {
    /// 有效的外呼超时：请求 tmax 与配置超时取较小者
    pub fn effective_timeout_ms(&self, configured: u64) -> u64 {
        match self.tmax {
            Some(tmax) if tmax > 0 => tmax.min(configured),
            _ => configured,
        }
    }

    /// 非空的 buyeruid
    pub fn buyer_uid(&self) -> Option<&str> {
        self.user
            .as_ref()
            .map(|user| user.buyeruid.as_str())
            .filter(|uid| !uid.is_empty())
    }
}
