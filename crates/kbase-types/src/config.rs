use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{KbaseError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Maximum number of records kept in the rolling history.
    pub capacity: usize,
    /// Calls strictly slower than this are reported as slow.
    pub slow_threshold_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            slow_threshold_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexNowConfig {
    pub host: String,
    pub key: String,
    pub key_location: String,
    pub api_url: String,
    pub document_base_url: String,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
}

impl Default for IndexNowConfig {
    fn default() -> Self {
        Self {
            host: "www.cryptobtc.xin".into(),
            key: "402a4244ed30456bbd50a19f5a4f259b".into(),
            key_location: "https://www.cryptobtc.xin/402a4244ed30456bbd50a19f5a4f259b.txt".into(),
            api_url: "https://api.indexnow.org/IndexNow".into(),
            document_base_url: "https://www.cryptobtc.xin".into(),
            batch_size: 5,
            batch_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Header values forwarded on every share API request (e.g. `x-kb-id`).
    pub forwarded_headers: Vec<(String, String)>,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            timeout_ms: 10_000,
            forwarded_headers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeoConfig {
    /// ip2region source table (`start|end|country|region|province|city|isp`).
    pub region_table: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    pub store_path: String,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            store_path: "data/license.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KbaseConfig {
    pub ops: OpsConfig,
    pub timer: TimerConfig,
    pub indexnow: IndexNowConfig,
    pub share: ShareConfig,
    pub geo: GeoConfig,
    pub license: LicenseConfig,
}

impl KbaseConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            KbaseError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            KbaseError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.timer.capacity == 0 {
            return Err(KbaseError::Configuration(
                "timer.capacity must be greater than zero".into(),
            ));
        }
        if self.indexnow.batch_size == 0 {
            return Err(KbaseError::Configuration(
                "indexnow.batch_size must be greater than zero".into(),
            ));
        }
        if self.indexnow.key.trim().is_empty() {
            return Err(KbaseError::Configuration(
                "indexnow.key must not be empty".into(),
            ));
        }
        for (field, url) in [
            ("indexnow.api_url", &self.indexnow.api_url),
            ("share.base_url", &self.share.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(KbaseError::Configuration(format!(
                    "{field} must be an http(s) url, got '{url}'"
                )));
            }
        }
        if self.license.store_path.trim().is_empty() {
            return Err(KbaseError::Configuration(
                "license.store_path must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_kbase_config_from_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let temp_path = dir.path().join("kbase-config-test.toml");
        let mut config = KbaseConfig::default();
        config.ops.log_level = "debug".into();
        config.timer.capacity = 50;
        config.indexnow.batch_size = 3;
        config.share.forwarded_headers = vec![("x-kb-id".into(), "kb-1".into())];
        config.geo.region_table = Some("data/ip.merge.txt".into());

        let doc = toml::to_string(&config).expect("serialize config");
        fs::write(&temp_path, doc).expect("write temp config");

        let loaded = KbaseConfig::from_file(&temp_path).expect("load config");
        assert_eq!(loaded.timer.capacity, 50);
        assert_eq!(loaded.indexnow.batch_size, 3);
        assert_eq!(loaded.ops.log_level, "debug");
        assert_eq!(loaded.share.forwarded_headers, config.share.forwarded_headers);
        assert_eq!(loaded.geo.region_table.as_deref(), Some("data/ip.merge.txt"));
    }

    #[test]
    fn partial_file_falls_back_to_section_defaults() {
        let loaded: KbaseConfig = toml::from_str(
            r#"
            [indexnow]
            host = "docs.example.org"
            "#,
        )
        .expect("parse partial config");
        assert_eq!(loaded.indexnow.host, "docs.example.org");
        assert_eq!(loaded.indexnow.batch_size, 5);
        assert_eq!(loaded.timer.capacity, 100);
        assert_eq!(loaded.timer.slow_threshold_ms, 1000);
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = KbaseConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, KbaseError::Configuration(_)));
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = KbaseConfig::default();
        assert!(config.validate().is_ok());

        config.timer.capacity = 0;
        assert!(config.validate().is_err());
        config.timer.capacity = 100;
        config.indexnow.batch_size = 0;
        assert!(config.validate().is_err());
        config.indexnow.batch_size = 5;
        config.indexnow.key = " ".into();
        assert!(config.validate().is_err());
        config.indexnow.key = "abc".into();
        config.share.base_url = "ftp://nope".into();
        assert!(config.validate().is_err());
        config.share.base_url = "https://kb.example.org".into();
        config.license.store_path = String::new();
        assert!(config.validate().is_err());
        config.license.store_path = "license.json".into();
        assert!(config.validate().is_ok());
    }
}
