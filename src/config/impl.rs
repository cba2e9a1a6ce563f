use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{AppConfig, WebAuthnConfig};

const DEV_FRONTEND_ORIGIN: &str = "http://localhost:5173";

static URL_HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://(?:[^@/]*@)?(\[[^\]]+\]|[^:/?#]+)")
        .expect("Invalid url host regex")
});

impl AppConfig {
    /// 加载配置
    ///
    /// 在 `main` 中调用一次，之后以 `web::Data<AppConfig>` 的形式传递。
    pub fn load() -> Result<Self, ConfigError> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // 内置默认值，空环境也能直接启动
            .set_default("app.system_name", "Assignment Tracker")?
            .set_default("app.environment", app_env.clone())?
            .set_default("app.log_level", "info")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3001)?
            .set_default("server.workers", 0)?
            .set_default("server.max_workers", 16)?
            .set_default("server.timeouts.client_request", 5000)?
            .set_default("server.timeouts.client_disconnect", 1000)?
            .set_default("server.timeouts.keep_alive", 75)?
            .set_default("server.limits.max_payload_size", 1_048_576)?
            .set_default("jwt.secret", "")?
            .set_default("jwt.access_token_expiry", 60 * 24)?
            .set_default("database.url", "assignments.db")?
            .set_default("database.pool_size", 10)?
            .set_default("database.timeout", 8)?
            .set_default("cache.default_ttl", 300)?
            .set_default("cache.max_capacity", 10_000)?
            .set_default("cors.allowed_origins", Vec::<String>::new())?
            .set_default("cors.max_age", 3600)?
            .set_default("argon2.memory_cost", 19_456)?
            .set_default("argon2.time_cost", 2)?
            .set_default("argon2.parallelism", 1)?
            .set_default("webauthn.rp_name", "Assignment Tracker")?
            .set_default("webauthn.rp_id", "")?
            .set_default("webauthn.origin", "")?
            .set_default("webauthn.frontend_url", "")?
            .set_default("webauthn.challenge_ttl", 300)?
            // 首先加载默认配置文件
            .add_source(File::with_name("config").required(false))
            // 然后根据环境加载特定配置文件
            .add_source(File::with_name(&format!("config.{app_env}")).required(false))
            // 最后加载环境变量覆盖
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        builder = builder
            .set_override_option("app.environment", std::env::var("APP_ENV").ok())?
            .set_override_option("app.log_level", std::env::var("RUST_LOG").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("server.workers", std::env::var("CPU_COUNT").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("webauthn.rp_id", std::env::var("WEBAUTHN_RP_ID").ok())?
            .set_override_option("webauthn.origin", std::env::var("WEBAUTHN_ORIGIN").ok())?
            .set_override_option(
                "webauthn.frontend_url",
                std::env::var("FRONTEND_URL").ok(),
            )?;

        let config = builder.build()?;
        let mut app_config: AppConfig = config.try_deserialize()?;

        // 处理工作线程数
        if app_config.server.workers == 0 {
            app_config.server.workers = num_cpus::get().min(app_config.server.max_workers);
        }

        if app_config.jwt.secret.trim().is_empty() {
            if app_config.is_production() {
                return Err(ConfigError::Message(
                    "jwt.secret must be set in production".to_string(),
                ));
            }
            app_config.jwt.secret = "development-only-secret".to_string();
        }

        let is_production = app_config.is_production();
        app_config.webauthn.resolve(is_production);

        Ok(app_config)
    }

    /// 检查是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }

    /// 检查是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app.environment == "development"
    }

    /// 获取服务器绑定地址
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
impl AppConfig {
    /// 测试用配置，不读取配置文件与环境变量
    pub(crate) fn for_tests() -> Self {
        use super::*;

        AppConfig {
            app: AppSettings {
                system_name: "Assignment Tracker".into(),
                environment: "test".into(),
                log_level: "debug".into(),
            },
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                workers: 1,
                max_workers: 1,
                timeouts: TimeoutConfig {
                    client_request: 5000,
                    client_disconnect: 1000,
                    keep_alive: 75,
                },
                limits: LimitConfig {
                    max_payload_size: 1_048_576,
                },
            },
            jwt: JwtConfig {
                secret: "test-secret".into(),
                access_token_expiry: 60,
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".into(),
                pool_size: 1,
                timeout: 5,
            },
            cache: CacheConfig {
                default_ttl: 60,
                max_capacity: 100,
            },
            cors: CorsConfig {
                allowed_origins: Vec::new(),
                max_age: 3600,
            },
            argon2: Argon2Config {
                memory_cost: 19_456,
                time_cost: 2,
                parallelism: 1,
            },
            webauthn: WebAuthnConfig {
                rp_name: "Assignment Tracker".into(),
                rp_id: "localhost".into(),
                origin: DEV_FRONTEND_ORIGIN.into(),
                frontend_url: String::new(),
                challenge_ttl: 60,
            },
        }
    }
}

impl WebAuthnConfig {
    /// 推导依赖方 ID 与来源
    ///
    /// - `rp_id`：显式配置 > `frontend_url` 的主机名 > `localhost`
    /// - `origin`：显式配置 > 生产环境下的 `frontend_url` > 本地开发前端地址
    pub fn resolve(&mut self, is_production: bool) {
        if self.rp_id.trim().is_empty() {
            self.rp_id = extract_host(&self.frontend_url).unwrap_or_else(|| "localhost".into());
        }

        if self.origin.trim().is_empty() {
            self.origin = if is_production && !self.frontend_url.trim().is_empty() {
                self.frontend_url.trim_end_matches('/').to_string()
            } else {
                DEV_FRONTEND_ORIGIN.to_string()
            };
        }
    }
}

/// 提取 URL 中的主机名（不含协议与端口）
fn extract_host(url: &str) -> Option<String> {
    URL_HOST_RE
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches(|c| c == '[' || c == ']').to_lowercase())
        .filter(|host| !host.is_empty())
}
