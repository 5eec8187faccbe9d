use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 身份提供方签发的令牌校验参数 (HS256)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub jwt_secret: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
}

/// 同步身份时自动授予管理员角色的邮箱列表
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub emails: Vec<String>,
}

impl AdminConfig {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.emails.iter().any(|e| e.eq_ignore_ascii_case(email.trim()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// 无激活活动时自动创建的默认活动
    pub default_event_name: String,
    #[serde(default)]
    pub default_event_description: Option<String>,
    /// 统计报表中报名时间序列的天数
    pub statistics_window_days: i64,
    /// 自动关闭过期报名的检查间隔（秒）
    pub registration_sweep_interval_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            default_event_name: "Wichtelaktion".to_string(),
            default_event_description: Some("Die jährliche Wichtelaktion".to_string()),
            statistics_window_days: 30,
            registration_sweep_interval_secs: 60,
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env_defaults()?,
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    fn from_env_defaults() -> Result<Self, Box<dyn std::error::Error>> {
        // 数据库 URL 在无配置文件时必须提供
        let database_url = get_env("DATABASE_URL")
            .ok_or("DATABASE_URL is not set and no config.toml was found")?;
        let defaults = EventsConfig::default();

        Ok(Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
            },
            identity: IdentityConfig {
                jwt_secret: get_env("IDENTITY_JWT_SECRET")
                    .unwrap_or_else(|| "change-me-in-production".to_string()),
                issuer: get_env("IDENTITY_ISSUER"),
                audience: get_env("IDENTITY_AUDIENCE"),
            },
            admin: AdminConfig::default(),
            events: EventsConfig {
                default_event_name: get_env("DEFAULT_EVENT_NAME")
                    .unwrap_or(defaults.default_event_name),
                default_event_description: get_env("DEFAULT_EVENT_DESCRIPTION")
                    .or(defaults.default_event_description),
                statistics_window_days: get_env_parse(
                    "STATISTICS_WINDOW_DAYS",
                    defaults.statistics_window_days,
                ),
                registration_sweep_interval_secs: get_env_parse(
                    "REGISTRATION_SWEEP_INTERVAL_SECS",
                    defaults.registration_sweep_interval_secs,
                ),
            },
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("IDENTITY_JWT_SECRET") {
            self.identity.jwt_secret = v;
        }
        if let Ok(v) = env::var("IDENTITY_ISSUER") {
            self.identity.issuer = Some(v);
        }
        if let Ok(v) = env::var("IDENTITY_AUDIENCE") {
            self.identity.audience = Some(v);
        }
        // 逗号分隔的管理员邮箱
        if let Ok(v) = env::var("ADMIN_EMAILS") {
            self.admin.emails = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("DEFAULT_EVENT_NAME") {
            self.events.default_event_name = v;
        }
        if let Ok(v) = env::var("DEFAULT_EVENT_DESCRIPTION") {
            self.events.default_event_description = Some(v);
        }
        if let Ok(v) = env::var("STATISTICS_WINDOW_DAYS")
            && let Ok(n) = v.parse()
        {
            self.events.statistics_window_days = n;
        }
        if let Ok(v) = env::var("REGISTRATION_SWEEP_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            self.events.registration_sweep_interval_secs = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config_uses_section_defaults() {
        let config = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 3000

            [database]
            url = "postgres://localhost/wichtel"
            max_connections = 5

            [identity]
            jwt_secret = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.identity.issuer.is_none());
        assert!(config.admin.emails.is_empty());
        assert_eq!(config.events.statistics_window_days, 30);
    }

    #[test]
    fn test_admin_email_match_is_case_insensitive() {
        let admin = AdminConfig {
            emails: vec!["Admin@School.de".to_string()],
        };
        assert!(admin.is_admin_email("admin@school.de"));
        assert!(admin.is_admin_email(" ADMIN@SCHOOL.DE "));
        assert!(!admin.is_admin_email("student@school.de"));
    }
}
