// src/bidding/clock.rs

use chrono::{Datelike, Utc};

/// 生成 URL 防缓存参数（`ts`）
pub trait CacheBuster: Send + Sync {
    fn token(&self) -> String;
}

/// 当前 ISO 周数，用于按周轮换 creative ID
pub trait WeekSource: Send + Sync {
    fn week(&self) -> String;
}

/// 基于系统时钟的默认实现
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl CacheBuster for SystemClock {
    fn token(&self) -> String {
        Utc::now().timestamp().to_string()
    }
}

impl WeekSource for SystemClock {
    fn week(&self) -> String {
        Utc::now().iso_week().week().to_string()
    }
}

/// 固定值，测试中替换时钟用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixed(pub String);

impl Fixed {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl CacheBuster for Fixed {
    fn token(&self) -> String {
        self.0.clone()
    }
}

impl WeekSource for Fixed {
    fn week(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_yields_numbers() {
        let ts: i64 = SystemClock.token().parse().unwrap();
        assert!(ts > 1_500_000_000);
        let week: u32 = SystemClock.week().parse().unwrap();
        assert!((1..=53).contains(&week));
    }

    #[test]
    fn fixed_is_stable() {
        let fixed = Fixed::new("testing");
        assert_eq!(fixed.token(), "testing");
        assert_eq!(fixed.week(), "testing");
    }
}
