use std::{net::SocketAddr, path::Path};

use anyhow::{Context, bail};
use selfstudy_core::domain::PassThreshold;
use serde::Deserialize;
type Result<T> = anyhow::Result<T>;

pub const CONFIG_PATH_ENV: &str = "SELFSTUDY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "selfstudy.toml";
pub const JWT_SECRET_ENV: &str = "SECRET_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u16,
    /// 允许从浏览器跨域调用 API 的来源。
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    /// 读取 `SELFSTUDY_CONFIG` 指定的文件（默认 `selfstudy.toml`），
    /// 再用 `DATABASE_URL` 和 `SECRET_KEY` 环境变量覆盖。
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            Self::parse(&read_file(Path::new(&path))?)
                .with_context(|| format!("failed to parse config file: {path}"))?
        } else {
            Self::parse("")?
        };

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = Some(url);
        }
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            config.auth.jwt_secret = secret;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::from_str(&read_file(path)?)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        let config = Self::parse(s)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).context("failed to deserialize app config")
    }

    fn validate(&self) -> Result<()> {
        self.threshold()?;
        if self.auth.jwt_secret.trim().is_empty() {
            bail!("auth.jwt_secret is not configured and {JWT_SECRET_ENV} is not set");
        }
        Ok(())
    }

    pub fn threshold(&self) -> Result<PassThreshold> {
        PassThreshold::new(self.pass_threshold).context("pass_threshold must be within 0..=100")
    }

    pub fn database_url(&self) -> Result<&str> {
        match self.database_url.as_deref() {
            Some(url) if !url.is_empty() => Ok(url),
            _ => bail!("database_url is not configured and DATABASE_URL is not set"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// 必填，没有默认签名密钥。
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_pass_threshold() -> u16 {
    PassThreshold::DEFAULT
}

fn default_access_ttl() -> u64 {
    2 * 60 * 60
}

fn default_refresh_ttl() -> u64 {
    7 * 24 * 60 * 60
}

#[cfg(test)]
mod tests {
    use super::AppConfig;

    #[test]
    fn test_parse_config() {
        let raw = r#"
bind_addr = "127.0.0.1:9000"
database_url = "postgres://localhost/selfstudy"
pass_threshold = 80
cors_allowed_origins = ["http://localhost:3000"]

[auth]
jwt_secret = "s3cret"
access_token_ttl_secs = 60

[bootstrap_admin]
email = "admin@example.com"
password = "admin"
"#;

        let config = AppConfig::from_str(raw).expect("config should parse");
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(
            config.database_url().expect("database url"),
            "postgres://localhost/selfstudy"
        );
        assert_eq!(config.threshold().expect("threshold").value(), 80);
        assert_eq!(config.cors_allowed_origins, ["http://localhost:3000"]);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.access_token_ttl_secs, 60);
        assert_eq!(config.auth.refresh_token_ttl_secs, 604_800);

        let admin = config.bootstrap_admin.expect("bootstrap admin");
        assert_eq!(admin.email, "admin@example.com");
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let raw = r#"
[auth]
jwt_secret = "s3cret"
"#;
        let config = AppConfig::from_str(raw).expect("minimal config should parse");

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8000");
        assert_eq!(config.pass_threshold, 70);
        assert_eq!(config.auth.access_token_ttl_secs, 7_200);
        assert!(config.bootstrap_admin.is_none());
        assert!(config.cors_allowed_origins.is_empty());
        assert!(config.database_url().is_err());
    }

    #[test]
    fn test_threshold_out_of_range_is_rejected() {
        let raw = r#"
pass_threshold = 101

[auth]
jwt_secret = "s3cret"
"#;
        let err = AppConfig::from_str(raw).expect_err("should reject");
        assert!(format!("{err:#}").contains("pass_threshold"));
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let err = AppConfig::from_str("database_url = \"sqlite::memory:\"")
            .expect_err("config without a signing secret should be rejected");
        assert!(format!("{err:#}").contains("jwt_secret"));

        let blank = r#"
[auth]
jwt_secret = "  "
"#;
        assert!(AppConfig::from_str(blank).is_err());
    }
}
