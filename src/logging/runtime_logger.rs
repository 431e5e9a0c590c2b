// src/logging/runtime_logger.rs

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task;
use tokio::time::{self, Duration};
use tracing_appender::rolling;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::MakeWriter;

use crate::logging::auction_log::AuctionLog;

const LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

/// 单条日志消息
pub struct LogEntry {
    pub level: String,
    pub content: String,
}

enum Message {
    Entry(LogEntry),
    /// 立即刷盘，完成后回执
    Flush(oneshot::Sender<()>),
}

/// 运行日志管理器（RuntimeLogger）
/// 将运行时日志按日志级别分流到不同的日志文件中，写盘在后台批量进行。
pub struct RuntimeLogger {
    sender: Sender<Message>,
}

impl RuntimeLogger {
    /// 创建一个新的 RuntimeLogger
    ///
    /// - `log_dir`: 日志文件存放目录
    /// - `file_prefix`: 文件前缀，例如 "runtime"（最终文件名形如 runtime_info.json 等）
    /// - `buffer_size`: mpsc 通道缓冲区大小
    /// - `batch_size`: 每个日志级别批量写入的日志条数
    /// - `flush_interval`: 定时刷新日志的时间间隔（毫秒）
    /// - `retention_hours`: 日志保留时长，超时的文件会被删除
    pub fn new(
        log_dir: &str,
        file_prefix: &str,
        buffer_size: usize,
        batch_size: usize,
        flush_interval: u64,
        retention_hours: u64,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let mut log_files = HashMap::new();
        for level in LEVELS {
            let file_name = format!("{}_{}.json", file_prefix, level.to_lowercase());
            let appender = rolling::hourly(log_dir, &file_name);
            log_files.insert(level.to_string(), Arc::new(appender));
        }
        tokio::spawn(Self::background_log_writer(log_files, receiver, batch_size, flush_interval));

        // 后台定期清理过期日志文件
        let log_dir = log_dir.to_string();
        tokio::spawn(async move {
            let cleanup_interval = Duration::from_secs(3600);
            loop {
                Self::cleanup_old_logs(&log_dir, retention_hours).await;
                tokio::time::sleep(cleanup_interval).await;
            }
        });

        Arc::new(Self { sender })
    }

    /// 记录运行日志，接受两个参数：level 和 message
    pub async fn log(&self, level: &str, message: &str) {
        let content = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "message": message
        })
        .to_string();
        self.send(LogEntry { level: level.to_string(), content }).await;
    }

    /// 记录一次询价的汇总日志，级别由结果决定
    pub async fn log_auction(&self, auction: &AuctionLog) {
        match serde_json::to_string(auction) {
            Ok(content) => {
                self.send(LogEntry { level: auction.level().to_string(), content }).await;
            }
            Err(e) => eprintln!("Failed to serialize auction log: {}", e),
        }
    }

    async fn send(&self, entry: LogEntry) {
        if let Err(e) = self.sender.send(Message::Entry(entry)).await {
            eprintln!("Failed to send runtime log message: {}", e);
        }
    }

    /// 后台日志写入任务
    async fn background_log_writer(
        log_files: HashMap<String, Arc<RollingFileAppender>>,
        mut receiver: Receiver<Message>,
        batch_size: usize,
        flush_interval: u64,
    ) {
        // 每个日志级别独立的缓冲区
        let mut buffers: HashMap<String, Vec<String>> = HashMap::new();
        let mut interval = time::interval(Duration::from_millis(flush_interval));
        loop {
            tokio::select! {
                message = receiver.recv() => match message {
                    Some(Message::Entry(entry)) => {
                        let buffer = buffers.entry(entry.level.clone()).or_default();
                        buffer.push(entry.content);
                        if buffer.len() >= batch_size {
                            Self::flush_level(&log_files, &entry.level, buffer).await;
                        }
                    }
                    Some(Message::Flush(ack)) => {
                        Self::flush_all(&log_files, &mut buffers).await;
                        let _ = ack.send(());
                    }
                    None => {
                        Self::flush_all(&log_files, &mut buffers).await;
                        break;
                    }
                },
                _ = interval.tick() => {
                    Self::flush_all(&log_files, &mut buffers).await;
                }
            }
        }
    }

    async fn flush_all(
        log_files: &HashMap<String, Arc<RollingFileAppender>>,
        buffers: &mut HashMap<String, Vec<String>>,
    ) {
        for (level, buffer) in buffers.iter_mut() {
            Self::flush_level(log_files, level, buffer).await;
        }
    }

    async fn flush_level(
        log_files: &HashMap<String, Arc<RollingFileAppender>>,
        level: &str,
        buffer: &mut Vec<String>,
    ) {
        if buffer.is_empty() {
            return;
        }
        // 未知级别落到 INFO 文件
        let appender = log_files.get(level).or_else(|| log_files.get("INFO"));
        if let Some(appender) = appender {
            Self::write_logs_to_disk(appender.clone(), buffer.join("\n") + "\n").await;
        }
        buffer.clear();
    }

    async fn write_logs_to_disk(file: Arc<RollingFileAppender>, content: String) {
        let result = task::spawn_blocking(move || {
            let mut writer = file.make_writer();
            writer.write_all(content.as_bytes())
        })
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("Failed to write runtime logs: {}", e),
            Err(e) => eprintln!("Runtime log writer task failed: {}", e),
        }
    }

    async fn cleanup_old_logs(log_dir: &str, retention_hours: u64) {
        use std::time::{Duration as StdDuration, SystemTime};
        let retention_duration = StdDuration::from_secs(retention_hours * 3600);
        let now = SystemTime::now();
        let mut dir = match tokio::fs::read_dir(log_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("Failed to read log directory {}: {}", log_dir, e);
                return;
            }
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            let path = entry.path();
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(_) => continue,
            };
            if now.duration_since(modified).unwrap_or_default() > retention_duration {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    eprintln!("Failed to delete old log file {:?}: {}", path, e);
                }
            }
        }
    }

    /// 刷盘并等待后台任务确认
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(Message::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }
}
