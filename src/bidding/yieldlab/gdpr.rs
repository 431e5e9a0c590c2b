// src/bidding/yieldlab/gdpr.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bidding::errors::AdapterError;
use crate::openrtb::request::BidRequest;

/// GDPR 适用标记，只接受 0 / 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GdprFlag {
    NotApplies = 0,
    Applies = 1,
}

impl GdprFlag {
    fn from_raw(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::NotApplies),
            1 => Some(Self::Applies),
            _ => None,
        }
    }

    pub fn as_param(self) -> &'static str {
        match self {
            Self::NotApplies => "0",
            Self::Applies => "1",
        }
    }
}

/// 一次请求的法规信号
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegulatorySignal {
    pub flag: Option<GdprFlag>,
    pub consent: String,
}

impl RegulatorySignal {
    /// 只有 flag 和 consent 同时存在才返回，否则都不下发
    pub fn both(&self) -> Option<(&'static str, &str)> {
        match self.flag {
            Some(flag) if !self.consent.is_empty() => Some((flag.as_param(), self.consent.as_str())),
            _ => None,
        }
    }

    /// 把 `gdpr` / `consent` 写入 query 参数（两者同进同出）
    pub fn insert_into(&self, query: &mut BTreeMap<&'static str, String>) {
        if let Some((gdpr, consent)) = self.both() {
            query.insert("gdpr", gdpr.to_string());
            query.insert("consent", consent.to_string());
        }
    }
}

/// regs.ext 中与 Yieldlab 相关的部分（GDPR 与 DSA）
#[derive(Deserialize, Debug, Default)]
struct ExtRegs {
    #[serde(default)]
    gdpr: Option<i64>,
    #[serde(default)]
    dsa: Option<DsaRequest>,
}

#[derive(Deserialize, Debug, Default)]
struct ExtUser {
    #[serde(default)]
    consent: Option<String>,
}

/// **DSA（数字服务法）请求参数**，来自 regs.ext.dsa
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DsaRequest {
    #[serde(rename = "dsarequired", default, skip_serializing_if = "Option::is_none")]
    pub required: Option<i32>,
    #[serde(rename = "pubrender", default, skip_serializing_if = "Option::is_none")]
    pub pub_render: Option<i32>,
    #[serde(rename = "datatopub", default, skip_serializing_if = "Option::is_none")]
    pub data_to_pub: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transparency: Vec<DsaTransparency>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DsaTransparency {
    #[serde(default)]
    pub domain: String,
    #[serde(rename = "dsaparams", default)]
    pub params: Vec<i32>,
}

fn parse_ext_regs(request: &BidRequest) -> Result<ExtRegs, AdapterError> {
    match request.regs.as_ref().and_then(|regs| regs.ext.as_ref()) {
        Some(ext) => serde_json::from_value(ext.clone()).map_err(|e| {
            AdapterError::bad_input(format!("failed to parse ExtRegs in Yieldlab GDPR check: {}", e))
        }),
        None => Ok(ExtRegs::default()),
    }
}

/// 从 regs.ext / user.ext 解析 GDPR 标记与 consent。
/// 扩展缺失得到空信号；扩展存在但格式错误返回 `BadInput`。
/// 超出 {0,1} 的 gdpr 值静默忽略。
pub fn regulatory_signal(request: &BidRequest) -> Result<RegulatorySignal, AdapterError> {
    let flag = parse_ext_regs(request)?.gdpr.and_then(GdprFlag::from_raw);

    let consent = match request.user.as_ref().and_then(|user| user.ext.as_ref()) {
        Some(ext) => {
            let ext_user: ExtUser = serde_json::from_value(ext.clone()).map_err(|e| {
                AdapterError::bad_input(format!("failed to parse ExtUser in Yieldlab GDPR check: {}", e))
            })?;
            ext_user.consent.unwrap_or_default()
        }
        None => String::new(),
    };

    Ok(RegulatorySignal { flag, consent })
}

/// 解析 regs.ext.dsa
pub fn dsa_request(request: &BidRequest) -> Result<Option<DsaRequest>, AdapterError> {
    Ok(parse_ext_regs(request)?.dsa)
}

/// DSA transparency 序列化为 `domain~1_2~~other~3`，domain 为空的条目跳过
pub fn dsa_transparency_param(transparency: &[DsaTransparency]) -> String {
    transparency
        .iter()
        .filter(|t| !t.domain.is_empty())
        .map(|t| {
            if t.params.is_empty() {
                t.domain.clone()
            } else {
                let params: Vec<String> = t.params.iter().map(i32::to_string).collect();
                format!("{}~{}", t.domain, params.join("_"))
            }
        })
        .collect::<Vec<_>>()
        .join("~~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openrtb::request::{Regs, User};
    use serde_json::{json, Value};

    fn request(regs_ext: Option<Value>, user_ext: Option<Value>) -> BidRequest {
        BidRequest {
            regs: regs_ext.map(|ext| Regs { ext: Some(ext), ..Default::default() }),
            user: user_ext.map(|ext| User { ext: Some(ext), ..Default::default() }),
            ..Default::default()
        }
    }

    #[test]
    fn absent_extensions_give_empty_signal() {
        let signal = regulatory_signal(&request(None, None)).unwrap();
        assert_eq!(signal, RegulatorySignal::default());
        assert!(signal.both().is_none());
    }

    #[test]
    fn reads_flag_and_consent() {
        let signal = regulatory_signal(&request(
            Some(json!({"gdpr": 1})),
            Some(json!({"consent": "BOlOrv1OlOr2EAAABADECg"})),
        ))
        .unwrap();
        assert_eq!(signal.flag, Some(GdprFlag::Applies));
        assert_eq!(signal.both(), Some(("1", "BOlOrv1OlOr2EAAABADECg")));
    }

    #[test]
    fn out_of_range_flag_is_dropped_silently() {
        let signal = regulatory_signal(&request(Some(json!({"gdpr": 2})), None)).unwrap();
        assert_eq!(signal.flag, None);
    }

    #[test]
    fn both_or_nothing() {
        let cases = [
            (Some(GdprFlag::Applies), "", None),
            (Some(GdprFlag::Applies), "abc", Some(("1", "abc"))),
            (Some(GdprFlag::NotApplies), "abc", Some(("0", "abc"))),
            (None, "abc", None),
        ];
        for (flag, consent, expected) in cases {
            let signal = RegulatorySignal { flag, consent: consent.to_string() };
            assert_eq!(signal.both(), expected);
        }
    }

    #[test]
    fn malformed_extensions_are_bad_input() {
        let err = regulatory_signal(&request(Some(json!({"gdpr": "yes"})), None)).unwrap_err();
        assert!(matches!(err, AdapterError::BadInput { .. }));
        assert!(err.to_string().contains("ExtRegs"));

        let err = regulatory_signal(&request(None, Some(json!("consent")))).unwrap_err();
        assert!(err.to_string().contains("ExtUser"));
    }

    #[test]
    fn null_consent_is_treated_as_empty() {
        let signal = regulatory_signal(&request(Some(json!({"gdpr": 1})), Some(json!({"consent": null})))).unwrap();
        assert_eq!(signal.flag, Some(GdprFlag::Applies));
        assert_eq!(signal.consent, "");
        assert!(signal.both().is_none());
    }

    #[test]
    fn parses_dsa_block() {
        let req = request(
            Some(json!({"dsa": {"dsarequired": 1, "pubrender": 2, "datatopub": 3,
                "transparency": [{"domain": "test.com", "dsaparams": [1, 2, 3]}]}})),
            None,
        );
        let dsa = dsa_request(&req).unwrap().unwrap();
        assert_eq!(dsa.required, Some(1));
        assert_eq!(dsa.pub_render, Some(2));
        assert_eq!(dsa.data_to_pub, Some(3));
        assert_eq!(dsa.transparency[0].params, vec![1, 2, 3]);
        assert!(dsa_request(&request(None, None)).unwrap().is_none());
    }

    #[test]
    fn transparency_param_layout() {
        let transparency = vec![
            DsaTransparency { domain: "test.com".into(), params: vec![1, 2] },
            DsaTransparency { domain: String::new(), params: vec![9] },
            DsaTransparency { domain: "example.com".into(), params: vec![] },
            DsaTransparency { domain: "x.org".into(), params: vec![3] },
        ];
        assert_eq!(dsa_transparency_param(&transparency), "test.com~1_2~~example.com~~x.org~3");
        assert_eq!(dsa_transparency_param(&[]), "");
    }
}
