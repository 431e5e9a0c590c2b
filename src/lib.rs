// src/lib.rs

use std::sync::Arc;

pub mod api;
pub mod bidding;
pub mod cache;
pub mod config;
pub mod logging;
pub mod mock_yieldprobe;
pub mod openrtb;

use axum::{routing::post, Router};

use bidding::vendor_client::VendorClient;
use bidding::yieldlab::YieldlabAdapter;
use cache::client::CacheClient;
use config::ConfigManager;
use logging::runtime_logger::RuntimeLogger;

/// HTTP 服务共享状态，全部只读
#[derive(Clone)]
pub struct AppState {
    pub runtime_logger: Arc<RuntimeLogger>,
    pub config: Arc<ConfigManager>,
    pub adapter: Arc<YieldlabAdapter>,
    pub vendor_client: VendorClient,
    pub cache: Option<Arc<dyn CacheClient>>,
}

/// `POST /openrtb` 路由
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/openrtb", post(api::handlers::handle_openrtb_request))
        .with_state(state)
}
