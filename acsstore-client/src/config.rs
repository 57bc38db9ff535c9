use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub gateway_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub backend_id: Option<String>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub part_upload_secs: u64,
    pub finalize_post_secs: u64,
    pub finalize_put_secs: u64,
    pub download_secs: u64,
    pub gateway_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            part_upload_secs: 300,
            finalize_post_secs: 900,
            finalize_put_secs: 300,
            download_secs: 300,
            gateway_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// 0 means use the part size suggested by the backend.
    pub part_size: u64,
    pub download_expiry_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            part_size: 0,
            download_expiry_secs: 3600,
        }
    }
}

/// Tunables consumed by the data store façade.
#[derive(Debug, Clone)]
pub struct DataStoreOptions {
    pub retry: RetryPolicy,
    pub part_upload_timeout: Duration,
    pub finalize_post_timeout: Duration,
    pub finalize_put_timeout: Duration,
    pub download_timeout: Duration,
    pub download_expiry_secs: u64,
}

impl Default for DataStoreOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            part_upload_timeout: Duration::from_secs(300),
            finalize_post_timeout: Duration::from_secs(900),
            finalize_put_timeout: Duration::from_secs(300),
            download_timeout: Duration::from_secs(300),
            download_expiry_secs: 3600,
        }
    }
}

impl ClientConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config: ClientConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.gateway_url.is_empty() {
            anyhow::bail!("gateway_url must not be empty");
        }
        if !self.gateway_url.starts_with("http://") && !self.gateway_url.starts_with("https://") {
            anyhow::bail!("gateway_url must be an http(s) URL: {}", self.gateway_url);
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        let t = &self.timeouts;
        for (name, secs) in [
            ("part_upload_secs", t.part_upload_secs),
            ("finalize_post_secs", t.finalize_post_secs),
            ("finalize_put_secs", t.finalize_put_secs),
            ("download_secs", t.download_secs),
            ("gateway_secs", t.gateway_secs),
        ] {
            if secs == 0 {
                anyhow::bail!("timeouts.{} must be greater than zero", name);
            }
        }
        if self.transfer.download_expiry_secs == 0 {
            anyhow::bail!("transfer.download_expiry_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.gateway_secs)
    }

    pub fn datastore_options(&self) -> DataStoreOptions {
        DataStoreOptions {
            retry: RetryPolicy::new(
                self.retry.max_attempts,
                Duration::from_millis(self.retry.backoff_ms),
            ),
            part_upload_timeout: Duration::from_secs(self.timeouts.part_upload_secs),
            finalize_post_timeout: Duration::from_secs(self.timeouts.finalize_post_secs),
            finalize_put_timeout: Duration::from_secs(self.timeouts.finalize_put_secs),
            download_timeout: Duration::from_secs(self.timeouts.download_secs),
            download_expiry_secs: self.transfer.download_expiry_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml_str = r#"
gateway_url = "https://gateway.local:8443"
"#;
        let config: ClientConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();
        assert_eq!(config.prefix, "");
        assert!(config.backend_id.is_none());
        assert_eq!(config.retry.max_attempts, 10);
        assert_eq!(config.timeouts.finalize_post_secs, 900);

        let opts = config.datastore_options();
        assert_eq!(opts.retry.max_attempts(), 10);
        assert_eq!(opts.retry.delay_for(1), Duration::from_millis(500));
        assert_eq!(opts.part_upload_timeout, Duration::from_secs(300));
        assert_eq!(opts.download_expiry_secs, 3600);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
gateway_url = "http://127.0.0.1:9000"
api_token = "tok"
prefix = "tenant-a"
backend_id = "oss-2"

[retry]
max_attempts = 3
backoff_ms = 100

[timeouts]
finalize_post_secs = 1200

[transfer]
part_size = 1048576
"#;
        let config: ClientConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();
        assert_eq!(config.backend_id.as_deref(), Some("oss-2"));
        assert_eq!(config.timeouts.finalize_post_secs, 1200);
        assert_eq!(config.timeouts.part_upload_secs, 300);
        assert_eq!(config.transfer.part_size, 1048576);
        assert_eq!(config.datastore_options().retry.delay_for(2), Duration::from_millis(200));
    }

    #[test]
    fn test_empty_gateway_url_rejected() {
        let config: ClientConfig = toml::from_str(r#"gateway_url = """#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let toml_str = r#"
gateway_url = "https://gw"
[retry]
max_attempts = 0
"#;
        let config: ClientConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acsstore.toml");
        std::fs::write(&path, "gateway_url = \"https://gw.example\"\nprefix = \"p\"\n").unwrap();
        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.prefix, "p");

        let missing = ClientConfig::load(&dir.path().join("nope.toml"));
        assert!(missing.is_err());
    }
}
