use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::bidding::engine::AuctionOutcome;
use crate::bidding::errors::ErrorKind;

/// **单次询价日志**
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuctionLog {
    pub timestamp: String,       // 记录时间
    pub log_type: String,        // 固定为 "yieldlab_auction"
    pub request_id: String,      // OpenRTB `BidRequest.id`
    pub imp_count: usize,        // 请求中的 imp 数量
    pub status: String,          // "success" / "no_bid" / "failure"
    pub bid_count: usize,        // 产出的竞价数
    pub best_price: f64,         // 最高出价（元）
    pub errors: Vec<ErrorLog>,   // 错误明细
    pub elapsed_ms: u128,        // 总耗时
}

/// **错误明细**，带分类方便按类统计
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorLog {
    pub kind: String,
    pub message: String,
}

impl AuctionLog {
    /// **由询价结果生成日志**
    pub fn from_outcome(request_id: &str, imp_count: usize, outcome: &AuctionOutcome) -> Self {
        let best_price = outcome
            .bids
            .iter()
            .map(|typed| typed.bid.price)
            .fold(0.0, f64::max);
        let status = match (outcome.bids.is_empty(), outcome.errors.is_empty()) {
            (false, _) => "success",
            (true, true) => "no_bid",
            (true, false) => "failure",
        };

        Self {
            timestamp: Utc::now().to_rfc3339(),
            log_type: "yieldlab_auction".to_string(),
            request_id: request_id.to_string(),
            imp_count,
            status: status.to_string(),
            bid_count: outcome.bids.len(),
            best_price,
            errors: outcome
                .errors
                .iter()
                .map(|e| ErrorLog {
                    kind: kind_label(e.kind()).to_string(),
                    message: e.to_string(),
                })
                .collect(),
            elapsed_ms: outcome.elapsed_ms,
        }
    }

    /// 日志级别：有内部一致性错误记 ERROR，其它错误记 WARN
    pub fn level(&self) -> &'static str {
        if self.errors.iter().any(|e| e.kind == kind_label(ErrorKind::InternalConsistency)) {
            "ERROR"
        } else if !self.errors.is_empty() {
            "WARN"
        } else {
            "INFO"
        }
    }
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::BadInput => "bad_input",
        ErrorKind::Upstream => "upstream",
        ErrorKind::InternalConsistency => "internal_consistency",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::adapter::TypedBid;
    use crate::bidding::errors::AdapterError;
    use crate::openrtb::response::{Bid, BidType};

    fn outcome(prices: &[f64], errors: Vec<AdapterError>) -> AuctionOutcome {
        AuctionOutcome {
            bidder: "yieldlab",
            currency: Some("EUR".into()),
            bids: prices
                .iter()
                .map(|&price| TypedBid {
                    bid: Bid { price, ..Default::default() },
                    bid_type: BidType::Banner,
                })
                .collect(),
            errors,
            elapsed_ms: 12,
        }
    }

    #[test]
    fn summarises_successful_auction() {
        let log = AuctionLog::from_outcome("req", 2, &outcome(&[1.5, 2.01], vec![]));
        assert_eq!(log.status, "success");
        assert_eq!(log.bid_count, 2);
        assert_eq!(log.best_price, 2.01);
        assert_eq!(log.level(), "INFO");
    }

    #[test]
    fn classifies_errors() {
        let log = AuctionLog::from_outcome(
            "req",
            1,
            &outcome(&[], vec![AdapterError::InternalConsistency { message: "no slot".into() }]),
        );
        assert_eq!(log.status, "failure");
        assert_eq!(log.errors, vec![ErrorLog { kind: "internal_consistency".into(), message: "no slot".into() }]);
        assert_eq!(log.level(), "ERROR");

        let log = AuctionLog::from_outcome("req", 1, &outcome(&[], vec![AdapterError::UnexpectedStatus { status: 500 }]));
        assert_eq!(log.errors[0].kind, "upstream");
        assert_eq!(log.level(), "WARN");

        assert_eq!(AuctionLog::from_outcome("req", 1, &outcome(&[], vec![])).status, "no_bid");
    }
}
