use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use super::error::{Result, ServerError};
use crate::auth::JwtConfig;
use crate::auth::jwt::resolve_secret;

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// 进程内存储 (开发/测试)
    Memory,
    /// PostgREST / Supabase
    Postgrest,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Postgrest => "postgrest",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgrest" | "supabase" => Ok(StoreBackend::Postgrest),
            other => Err(ServerError::Config(format!("unknown STORE_BACKEND: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// 单次存储请求超时
    pub timeout: Duration,
    /// 启动时加载的种子数据 (仅 memory 后端)
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
    pub dir: Option<PathBuf>,
}

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | STORE_BACKEND | memory | `memory` / `postgrest` |
/// | STORE_URL | - | PostgREST 地址 (postgrest 必填) |
/// | STORE_API_KEY | - | PostgREST API key (postgrest 必填) |
/// | STORE_TIMEOUT_MS | 10000 | 存储请求超时(毫秒) |
/// | SEED_FILE | - | JSON 种子数据 |
/// | TAX_RATE | 0.10 | 账单税率 |
/// | ORDER_TRANSITION_GRANTS | - | 角色状态授权覆盖 |
/// | JWT_SECRET | 开发环境随机 | JWT 密钥 (≥32 字符) |
/// | JWT_ISSUER | order-server | |
/// | JWT_AUDIENCE | staff-clients | |
/// | JWT_EXPIRATION_MINUTES | 720 | 仅用于签发测试令牌 |
/// | LOG_LEVEL | info | 日志级别 (RUST_LOG 优先) |
/// | LOG_JSON | false | JSON 格式日志 |
/// | LOG_DIR | - | 按天滚动的日志目录 |
///
/// ```ignore
/// STORE_BACKEND=postgrest STORE_URL=https://x.supabase.co STORE_API_KEY=... cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    pub store: StoreConfig,
    pub tax_rate: Decimal,
    /// `ROLE=STATUS|STATUS;...`
    pub transition_grants: Option<String>,
    pub jwt: JwtConfig,
    pub log: LogConfig,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let parsed = |key: &str| -> Result<Option<u64>> {
            get(key)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .map_err(|_| ServerError::Config(format!("{} must be a number", key)))
                })
                .transpose()
        };

        let http_port = match parsed("HTTP_PORT")? {
            Some(port) => u16::try_from(port)
                .map_err(|_| ServerError::Config("HTTP_PORT out of range".to_string()))?,
            None => 3000,
        };

        let backend = match get("STORE_BACKEND") {
            Some(v) => v.parse()?,
            None => StoreBackend::Memory,
        };
        let store = StoreConfig {
            backend,
            url: get("STORE_URL"),
            api_key: get("STORE_API_KEY"),
            timeout: Duration::from_millis(parsed("STORE_TIMEOUT_MS")?.unwrap_or(10_000)),
            seed_file: get("SEED_FILE").map(PathBuf::from),
        };
        if backend == StoreBackend::Postgrest && (store.url.is_none() || store.api_key.is_none()) {
            return Err(ServerError::Config(
                "STORE_URL and STORE_API_KEY are required for the postgrest backend".to_string(),
            ));
        }

        let tax_rate = match get("TAX_RATE") {
            Some(v) => Decimal::from_str(v.trim())
                .map_err(|_| ServerError::Config(format!("invalid TAX_RATE: {}", v)))?,
            None => Decimal::new(10, 2),
        };
        if tax_rate.is_sign_negative() || tax_rate >= Decimal::ONE {
            return Err(ServerError::Config(format!(
                "TAX_RATE must be in [0, 1), got {}",
                tax_rate
            )));
        }

        let mut jwt = JwtConfig::new(resolve_secret(get("JWT_SECRET"))?);
        if let Some(issuer) = get("JWT_ISSUER") {
            jwt.issuer = issuer;
        }
        if let Some(audience) = get("JWT_AUDIENCE") {
            jwt.audience = audience;
        }
        if let Some(minutes) = parsed("JWT_EXPIRATION_MINUTES")? {
            jwt.expiration_minutes = minutes as i64;
        }

        Ok(Self {
            http_port,
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            store,
            tax_rate,
            transition_grants: get("ORDER_TRANSITION_GRANTS"),
            jwt,
            log: LogConfig {
                level: get("LOG_LEVEL").unwrap_or_else(|| "info".into()),
                json: get("LOG_JSON").is_some_and(|v| matches!(v.trim(), "1" | "true" | "TRUE")),
                dir: get("LOG_DIR").map(PathBuf::from),
            },
        })
    }

    /// In-memory defaults with a fixed JWT secret (tests, tooling)
    pub fn with_jwt_secret(secret: impl Into<String>) -> Self {
        Self {
            http_port: 3000,
            environment: "development".into(),
            store: StoreConfig {
                backend: StoreBackend::Memory,
                url: None,
                api_key: None,
                timeout: Duration::from_millis(10_000),
                seed_file: None,
            },
            tax_rate: Decimal::new(10, 2),
            transition_grants: None,
            jwt: JwtConfig::new(secret),
            log: LogConfig {
                level: "info".into(),
                json: false,
                dir: None,
            },
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("JWT_SECRET", SECRET)]).unwrap();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.timeout, Duration::from_secs(10));
        assert_eq!(config.tax_rate, Decimal::new(10, 2));
        assert_eq!(config.jwt.issuer, "order-server");
        assert_eq!(config.jwt.audience, "staff-clients");
        assert_eq!(config.log.level, "info");
        assert!(!config.log.json);
        assert!(!config.is_production());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("JWT_SECRET", SECRET),
            ("HTTP_PORT", "8080"),
            ("STORE_BACKEND", "postgrest"),
            ("STORE_URL", "https://db.example.com"),
            ("STORE_API_KEY", "key"),
            ("STORE_TIMEOUT_MS", "2500"),
            ("TAX_RATE", "0.07"),
            ("ORDER_TRANSITION_GRANTS", "WAITER=SERVED"),
            ("LOG_JSON", "true"),
            ("ENVIRONMENT", "production"),
        ])
        .unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.store.backend, StoreBackend::Postgrest);
        assert_eq!(config.store.timeout, Duration::from_millis(2500));
        assert_eq!(config.tax_rate, Decimal::new(7, 2));
        assert_eq!(config.transition_grants.as_deref(), Some("WAITER=SERVED"));
        assert!(config.log.json);
        assert!(config.is_production());
    }

    #[test]
    fn test_postgrest_requires_url_and_key() {
        let err = load(&[("JWT_SECRET", SECRET), ("STORE_BACKEND", "postgrest")]).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("JWT_SECRET", SECRET), ("HTTP_PORT", "70000")]).is_err());
        assert!(load(&[("JWT_SECRET", SECRET), ("TAX_RATE", "abc")]).is_err());
        assert!(load(&[("JWT_SECRET", SECRET), ("TAX_RATE", "-0.1")]).is_err());
        assert!(load(&[("JWT_SECRET", SECRET), ("STORE_BACKEND", "redis")]).is_err());
        assert!(load(&[("JWT_SECRET", "short")]).is_err());
    }
}
