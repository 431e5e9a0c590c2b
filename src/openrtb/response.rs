use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// OpenRTB Bid Response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BidResponse {
    pub id: String,
    pub seatbid: Vec<SeatBid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cur: Option<String>,
    /// 无竞价原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbr: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SeatBid {
    pub bid: Vec<Bid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Bid {
    pub id: String,
    pub impid: String,
    pub price: f64,
    /// Banner 的内联 markup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adm: Option<String>,
    /// Video 的 ad tag URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nurl: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub crid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dealid: String,
    #[serde(default)]
    pub w: u64,
    #[serde(default)]
    pub h: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

/// 竞价的媒体类型
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BidType {
    Banner,
    Video,
    Audio,
    Native,
}

impl Bid {
    /// ext 的可写对象视图；ext 为空时新建，不是对象时返回 `None`
    pub fn ext_object_mut(&mut self) -> Option<&mut Map<String, Value>> {
        match self.ext.get_or_insert_with(|| Value::Object(Map::new())) {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl BidResponse {
    /// 空响应，`nbr = 3` 表示 "无匹配广告（未填充）"
    pub fn no_fill(id: &str, currency: &str) -> Self {
        Self {
            id: id.to_string(),
            seatbid: vec![],
            cur: Some(currency.to_string()),
            nbr: Some(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ext_object_is_created_or_reused() {
        let mut bid = Bid::default();
        bid.ext_object_mut().unwrap().insert("a".into(), json!(1));
        bid.ext_object_mut().unwrap().insert("b".into(), json!(2));
        assert_eq!(bid.ext, Some(json!({"a": 1, "b": 2})));

        let mut bid = Bid { ext: Some(json!([1])), ..Default::default() };
        assert!(bid.ext_object_mut().is_none());
    }
}
