// src/bidding/yieldlab/params.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bidding::errors::AdapterError;
use crate::openrtb::request::Imp;

/// 多个广告位 ID 合并时的分隔符
pub const AD_SLOT_ID_SEPARATOR: &str = ",";

/// **imp.ext.bidder 中的 Yieldlab 参数**
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtImpYieldlab {
    #[serde(rename = "adslotId", default)]
    pub adslot_id: String,
    #[serde(rename = "supplyId", default)]
    pub supply_id: String,
    #[serde(rename = "extId", default)]
    pub ext_id: String,
    #[serde(default)]
    pub targeting: HashMap<String, String>,
}

/// 宿主约定的 imp.ext 外层信封
#[derive(Deserialize, Debug)]
struct ExtImpBidder {
    bidder: Value,
}

/// 逐个 imp 解析 Yieldlab 参数，任何一个格式错误都使整个请求失败
pub fn parse_request(imps: &[Imp]) -> Result<Vec<ExtImpYieldlab>, AdapterError> {
    imps.iter().map(parse_imp).collect()
}

fn parse_imp(imp: &Imp) -> Result<ExtImpYieldlab, AdapterError> {
    let ext = imp.ext.as_ref().ok_or_else(|| {
        AdapterError::bad_input(format!("imp {} is missing the bidder extension", imp.id))
    })?;

    let bidder_ext: ExtImpBidder = serde_json::from_value(ext.clone()).map_err(|e| {
        AdapterError::bad_input(format!("imp {}: invalid ext {}: {}", imp.id, ext, e))
    })?;

    serde_json::from_value(bidder_ext.bidder.clone()).map_err(|e| {
        AdapterError::bad_input(format!(
            "imp {}: invalid yieldlab params {}: {}",
            imp.id, bidder_ext.bidder, e
        ))
    })
}

/// 合并所有 imp 的参数：广告位按顺序拼接，targeting 后者覆盖前者
pub fn merge_params(params: &[ExtImpYieldlab]) -> ExtImpYieldlab {
    let mut targeting = HashMap::new();
    for p in params {
        targeting.extend(p.targeting.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    ExtImpYieldlab {
        adslot_id: params
            .iter()
            .map(|p| p.adslot_id.as_str())
            .collect::<Vec<_>>()
            .join(AD_SLOT_ID_SEPARATOR),
        targeting,
        ..Default::default()
    }
}

/// 按数字形式的广告位 ID 找到原始参数
pub fn find_bid_req(adslot_id: u64, params: &[ExtImpYieldlab]) -> Option<&ExtImpYieldlab> {
    let slot_id = adslot_id.to_string();
    params.iter().find(|p| p.adslot_id == slot_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn imp_with_ext(ext: Value) -> Imp {
        Imp {
            id: "imp".into(),
            ext: Some(ext),
            ..Default::default()
        }
    }

    #[test]
    fn parses_bidder_params() {
        let imp = imp_with_ext(json!({
            "bidder": {"adslotId": "12345", "supplyId": "123456789", "extId": "abc", "targeting": {"key1": "value1"}}
        }));
        let params = parse_request(&[imp]).unwrap();
        assert_eq!(params[0].adslot_id, "12345");
        assert_eq!(params[0].supply_id, "123456789");
        assert_eq!(params[0].ext_id, "abc");
        assert_eq!(params[0].targeting.get("key1").map(String::as_str), Some("value1"));
    }

    #[test]
    fn malformed_envelope_is_bad_input() {
        let err = parse_request(&[imp_with_ext(json!({"bidder": "nope"}))]).unwrap_err();
        assert!(matches!(err, AdapterError::BadInput { .. }));

        let err = parse_request(&[imp_with_ext(json!([1, 2]))]).unwrap_err();
        assert!(matches!(err, AdapterError::BadInput { .. }));

        let err = parse_request(&[Imp::default()]).unwrap_err();
        assert!(matches!(err, AdapterError::BadInput { .. }));
    }

    #[test]
    fn malformed_payload_is_named_in_error() {
        let err = parse_request(&[imp_with_ext(json!({"bidder": {"adslotId": 5}}))]).unwrap_err();
        assert!(err.to_string().contains("\"adslotId\":5"));
    }

    #[test]
    fn joins_slot_ids_in_order() {
        let params = vec![
            ExtImpYieldlab { adslot_id: "123".into(), ..Default::default() },
            ExtImpYieldlab { adslot_id: "456".into(), ..Default::default() },
        ];
        assert_eq!(merge_params(&params).adslot_id, "123,456");
    }

    #[test]
    fn finds_request_by_numeric_slot() {
        let params = vec![
            ExtImpYieldlab { adslot_id: "1".into(), ext_id: "a".into(), ..Default::default() },
            ExtImpYieldlab { adslot_id: "2".into(), ext_id: "b".into(), ..Default::default() },
        ];
        assert_eq!(find_bid_req(2, &params).map(|p| p.ext_id.as_str()), Some("b"));
        assert!(find_bid_req(3, &params).is_none());
    }

    proptest! {
        #[test]
        fn merged_targeting_is_union_with_last_writer_wins(
            maps in prop::collection::vec(
                prop::collection::hash_map("[a-d]{1,2}", "[a-z0-9]{0,4}", 0..5),
                1..6,
            )
        ) {
            let params: Vec<_> = maps
                .iter()
                .enumerate()
                .map(|(i, t)| ExtImpYieldlab {
                    adslot_id: i.to_string(),
                    targeting: t.clone(),
                    ..Default::default()
                })
                .collect();
            let merged = merge_params(&params);

            for (key, value) in &merged.targeting {
                let last = maps.iter().rev().find_map(|m| m.get(key));
                prop_assert_eq!(Some(value), last);
            }
            for m in &maps {
                for key in m.keys() {
                    prop_assert!(merged.targeting.contains_key(key));
                }
            }
        }

        #[test]
        fn slot_join_preserves_order(ids in prop::collection::vec("[0-9]{1,6}", 1..8)) {
            let params: Vec<_> = ids
                .iter()
                .map(|id| ExtImpYieldlab { adslot_id: id.clone(), ..Default::default() })
                .collect();
            let merged = merge_params(&params);
            let split: Vec<&str> = merged.adslot_id.split(AD_SLOT_ID_SEPARATOR).collect();
            prop_assert_eq!(split, ids.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }
}
