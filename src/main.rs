// src/main.rs

use axum::serve;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use yieldlab_adapter::bidding::vendor_client::VendorClient;
use yieldlab_adapter::bidding::yieldlab::YieldlabAdapter;
use yieldlab_adapter::cache::client::{CacheClient, HttpCacheClient};
use yieldlab_adapter::config::config_manager::FileSettings;
use yieldlab_adapter::config::ConfigManager;
use yieldlab_adapter::logging::runtime_logger::RuntimeLogger;
use yieldlab_adapter::{app, mock_yieldprobe, AppState};

#[derive(Parser, Debug)]
#[command(author = "whiteCcinn", version = "1.0", about = "Yieldlab OpenRTB adapter server")]
struct CliArgs {
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
    #[arg(long, default_value = "logs")]
    log_dir: String,
    /// Yieldprobe 地址，默认 https://ad.yieldlab.net/yp/
    #[arg(long)]
    endpoint: Option<String>,
    /// 缓存服务地址，不填则不缓存竞价
    #[arg(long)]
    cache_url: Option<String>,
    /// 外呼超时（毫秒）
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// JSON 配置文件，命令行参数优先
    #[arg(long)]
    config: Option<String>,
    /// 同时启动本地模拟上游，并把 endpoint / cache 指向它
    #[arg(long, default_value_t = false)]
    mock: bool,
    #[arg(long, default_value_t = 9001)]
    mock_port: u16,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化全局 tracing 日志
    let log_file = rolling::hourly(&args.log_dir, "adapter_log.json");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);
    let subscriber = Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(non_blocking));
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to set global tracing subscriber: {}", e);
        return;
    }

    // 初始化运行日志记录器（询价汇总、启动与关闭事件）
    let runtime_logger = RuntimeLogger::new(&args.log_dir, "runtime", 1000, 100, 1000, 72);
    runtime_logger.log("INFO", "Yieldlab adapter is starting...").await;

    let file_settings = match args.config.as_deref().map(FileSettings::load).transpose() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            runtime_logger.log("ERROR", &e).await;
            runtime_logger.shutdown().await;
            return;
        }
    };

    let (endpoint, cache_url) = if args.mock {
        let mock_base = format!("http://127.0.0.1:{}", args.mock_port);
        (Some(format!("{}/yp/", mock_base)), Some(mock_base))
    } else {
        (args.endpoint, args.cache_url)
    };
    let config = Arc::new(ConfigManager::from_args(file_settings, endpoint, cache_url, args.timeout_ms));
    info!(endpoint = %config.endpoint, cache = ?config.cache_url, timeout_ms = config.timeout_ms, "configuration resolved");

    // 启动模拟上游（Yieldprobe + 缓存）
    let mock_server = if args.mock {
        let port = args.mock_port;
        Some(tokio::spawn(async move {
            if let Err(e) = mock_yieldprobe::start_mock_server(port).await {
                error!("Mock upstream stopped: {}", e);
            }
        }))
    } else {
        None
    };

    let vendor_client = VendorClient::default();
    let cache = config.cache_url.as_deref().map(|url| {
        Arc::new(HttpCacheClient::new(reqwest::Client::new(), url)) as Arc<dyn CacheClient>
    });

    let state = Arc::new(AppState {
        runtime_logger: runtime_logger.clone(),
        config: config.clone(),
        adapter: Arc::new(YieldlabAdapter::new(&config.endpoint)),
        vendor_client,
        cache,
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Unable to bind {}: {}", addr, e);
            runtime_logger.log("ERROR", &format!("Unable to bind {}: {}", addr, e)).await;
            runtime_logger.shutdown().await;
            return;
        }
    };
    runtime_logger.log("INFO", &format!("Yieldlab adapter running at http://{}", addr)).await;
    info!("Yieldlab adapter listening on {}", addr);

    let server = serve(listener, app(state)).with_graceful_shutdown(async {
        let _ = signal::ctrl_c().await;
    });
    if let Err(e) = server.await {
        error!("Server error: {}", e);
    }

    runtime_logger.log("INFO", "Shutting down gracefully...").await;
    if let Some(mock_server) = mock_server {
        mock_server.abort();
    }
    runtime_logger.log("INFO", "Yieldlab adapter shut down.").await;
    runtime_logger.shutdown().await;
}
