// src/bidding/vendor_client.rs

use std::future::Future;
use std::time::Instant;

use once_cell::sync::Lazy;
use reqwest::Client;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::bidding::adapter::{RequestData, ResponseData};
use crate::bidding::errors::AdapterError;

/// 进程内共享的 HTTP 连接池
pub(crate) static SHARED_CLIENT: Lazy<Client> = Lazy::new(Client::new);

/// 执行适配器产出的外呼请求，不做重试
#[derive(Clone)]
pub struct VendorClient {
    client: Client,
}

impl Default for VendorClient {
    fn default() -> Self {
        Self::new(SHARED_CLIENT.clone())
    }
}

impl VendorClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 在超时与取消信号下执行一次请求。
    /// 非 200 状态码不算错误，原样交给 `make_bids` 判断。
    pub async fn execute<C>(
        &self,
        request: &RequestData,
        timeout_ms: u64,
        cancel: C,
    ) -> Result<ResponseData, AdapterError>
    where
        C: Future<Output = ()>,
    {
        let start = Instant::now();
        let mut builder = self.client.request(request.method.clone(), &request.uri);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let call = async {
            let resp = builder
                .send()
                .await
                .map_err(|e| AdapterError::Transport { message: e.to_string() })?;
            let status_code = resp.status().as_u16();
            let body = resp
                .bytes()
                .await
                .map_err(|e| AdapterError::Transport { message: e.to_string() })?;
            Ok(ResponseData { status_code, body: body.to_vec() })
        };

        let result = tokio::select! {
            res = timeout(Duration::from_millis(timeout_ms), call) => match res {
                Ok(inner) => inner,
                Err(_) => Err(AdapterError::Timeout { millis: timeout_ms }),
            },
            _ = cancel => Err(AdapterError::Cancelled),
        };

        debug!(
            uri = %request.uri,
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "yieldlab call finished"
        );
        result
    }
}
