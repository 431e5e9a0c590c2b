// src/config/config_manager.rs

use std::fs;

use serde::{Deserialize, Serialize};

/// Yieldprobe 默认地址
pub const DEFAULT_ENDPOINT: &str = "https://ad.yieldlab.net/yp/";
/// 默认外呼超时（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 250;

/// 配置文件中的可选项，命令行参数优先
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub cache_url: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl FileSettings {
    /// 读取 JSON 配置文件
    pub fn load(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| format!("Unable to read {}: {}", path, e))?;
        serde_json::from_str(&content).map_err(|e| format!("Unable to parse {}: {}", path, e))
    }
}

/// 运行时配置。endpoint 在这里不做校验，格式错误会在每次请求时以 BadInput 报告。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigManager {
    pub endpoint: String,
    pub cache_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cache_url: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ConfigManager {
    pub fn new(endpoint: &str, cache_url: Option<String>, timeout_ms: u64) -> Self {
        ConfigManager {
            endpoint: endpoint.to_string(),
            cache_url,
            timeout_ms,
        }
    }

    /// 合并配置：默认值 < 配置文件 < 命令行
    pub fn from_args(
        file: Option<FileSettings>,
        endpoint: Option<String>,
        cache_url: Option<String>,
        timeout_ms: Option<u64>,
    ) -> Self {
        let file = file.unwrap_or_default();
        let defaults = ConfigManager::default();
        ConfigManager {
            endpoint: endpoint.or(file.endpoint).unwrap_or(defaults.endpoint),
            cache_url: cache_url.or(file.cache_url).filter(|url| !url.is_empty()),
            timeout_ms: timeout_ms.or(file.timeout_ms).unwrap_or(defaults.timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_overrides() {
        assert_eq!(ConfigManager::from_args(None, None, None, None), ConfigManager::default());
    }

    #[test]
    fn cli_overrides_file() {
        let file = FileSettings {
            endpoint: Some("http://file/yp/".into()),
            cache_url: Some("http://cache".into()),
            timeout_ms: Some(400),
        };
        let config = ConfigManager::from_args(Some(file), Some("http://cli/yp/".into()), None, Some(100));
        assert_eq!(config.endpoint, "http://cli/yp/");
        assert_eq!(config.cache_url.as_deref(), Some("http://cache"));
        assert_eq!(config.timeout_ms, 100);
    }

    #[test]
    fn empty_cache_url_disables_cache() {
        let config = ConfigManager::from_args(None, None, Some(String::new()), None);
        assert!(config.cache_url.is_none());
    }

    #[test]
    fn loads_json_settings() {
        let path = std::env::temp_dir().join(format!("yieldlab-settings-{}.json", std::process::id()));
        fs::write(&path, r#"{"endpoint": "http://127.0.0.1:9001/yp/", "timeout_ms": 300}"#).unwrap();
        let settings = FileSettings::load(path.to_str().unwrap()).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(settings.endpoint.as_deref(), Some("http://127.0.0.1:9001/yp/"));
        assert_eq!(settings.timeout_ms, Some(300));
        assert!(settings.cache_url.is_none());

        assert!(FileSettings::load("/definitely/not/here.json").is_err());
    }
}
