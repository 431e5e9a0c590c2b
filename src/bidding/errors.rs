// src/bidding/errors.rs

use serde::Serialize;
use thiserror::Error;

/// 适配器错误分类，用于日志和指标区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 请求侧的输入问题，只影响本适配器，拍卖照常进行
    BadInput,
    /// 上游（Yieldlab）问题，整次响应作废
    Upstream,
    /// 响应无法对应到请求，属于程序缺陷信号
    InternalConsistency,
}

/// 适配器错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// 扩展字段或配置格式错误
    #[error("{message}")]
    BadInput { message: String },

    /// 上游返回非 200 状态码
    #[error("failed to resolve bids from yieldlab response: Unexpected response code {status}")]
    UnexpectedStatus { status: u16 },

    /// 上游响应体无法解析
    #[error("{message}")]
    BadServerResponse { message: String },

    /// 网络或传输层失败
    #[error("yieldlab request failed: {message}")]
    Transport { message: String },

    #[error("yieldlab request timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("yieldlab request cancelled before a response arrived")]
    Cancelled,

    #[error("{message}")]
    InternalConsistency { message: String },
}

impl AdapterError {
    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::BadInput { message: message.into() }
    }

    pub fn bad_server_response(message: impl Into<String>) -> Self {
        Self::BadServerResponse { message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadInput { .. } => ErrorKind::BadInput,
            Self::UnexpectedStatus { .. }
            | Self::BadServerResponse { .. }
            | Self::Transport { .. }
            | Self::Timeout { .. }
            | Self::Cancelled => ErrorKind::Upstream,
            Self::InternalConsistency { .. } => ErrorKind::InternalConsistency,
        }
    }
}
