use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub bootstrap: BootstrapConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Prefix shared by every resource route, e.g. `/api/v1`
    pub api_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_limit: Option<i64>,
    pub default_page_size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub access_token_secret: String,
    pub access_token_expiry_secs: i64,
    pub refresh_token_secret: String,
    pub refresh_token_expiry_secs: i64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub should_init: bool,
    pub admin_email: String,
    pub init_password: String,
    pub sample_user_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from: String,
    pub digest_enabled: bool,
    /// Six-field cron expression (seconds first)
    pub digest_schedule: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("API_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_PREFIX") {
            self.server.api_prefix = normalize_prefix(&v);
        }

        // Filter overrides
        if let Ok(v) = env::var("FILTER_MAX_LIMIT") {
            self.filter.max_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("FILTER_DEFAULT_PAGE_SIZE") {
            self.filter.default_page_size = v.parse().unwrap_or(self.filter.default_page_size);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_BACKEND") {
            self.database.backend = match v.to_ascii_lowercase().as_str() {
                "memory" | "mem" => StoreBackend::Memory,
                "postgres" | "pg" => StoreBackend::Postgres,
                _ => self.database.backend,
            };
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_ACCESS_TOKEN_SECRET") {
            self.security.access_token_secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRE_SECS") {
            self.security.access_token_expiry_secs = v.parse().unwrap_or(self.security.access_token_expiry_secs);
        }
        if let Ok(v) = env::var("JWT_REFRESH_TOKEN_SECRET") {
            self.security.refresh_token_secret = v;
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRE_SECS") {
            self.security.refresh_token_expiry_secs = v.parse().unwrap_or(self.security.refresh_token_expiry_secs);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_SECURE") {
            self.security.cookie_secure = v.parse().unwrap_or(self.security.cookie_secure);
        }

        // Bootstrap overrides
        if let Ok(v) = env::var("SHOULD_INIT") {
            self.bootstrap.should_init = parse_flag(&v);
        }
        if let Ok(v) = env::var("ADMIN_EMAIL") {
            self.bootstrap.admin_email = v;
        }
        if let Ok(v) = env::var("INIT_PASSWORD") {
            self.bootstrap.init_password = v;
        }
        if let Ok(v) = env::var("SAMPLE_USER_EMAIL") {
            self.bootstrap.sample_user_email = v;
        }

        // Mail overrides
        if let Ok(v) = env::var("EMAIL_HOST") {
            self.mail.smtp_host = Some(v).filter(|h| !h.trim().is_empty());
        }
        if let Ok(v) = env::var("EMAIL_PORT") {
            self.mail.smtp_port = v.parse().unwrap_or(self.mail.smtp_port);
        }
        if let Ok(v) = env::var("EMAIL_AUTH_USER") {
            self.mail.smtp_username = v;
        }
        if let Ok(v) = env::var("EMAIL_AUTH_PASS") {
            self.mail.smtp_password = v;
        }
        if let Ok(v) = env::var("EMAIL_FROM") {
            self.mail.from = v;
        }
        if let Ok(v) = env::var("MAIL_DIGEST_ENABLED") {
            self.mail.digest_enabled = parse_flag(&v);
        }
        if let Ok(v) = env::var("MAIL_DIGEST_SCHEDULE") {
            self.mail.digest_schedule = v;
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 8000,
                api_prefix: "/api/v1".to_string(),
            },
            filter: FilterConfig {
                max_limit: Some(1000),
                default_page_size: 10,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                access_token_secret: "dev-access-secret".to_string(),
                access_token_expiry_secs: 60 * 60 * 24, // 1 day
                refresh_token_secret: "dev-refresh-secret".to_string(),
                refresh_token_expiry_secs: 60 * 60 * 24 * 7, // 1 week
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                cookie_secure: false,
            },
            bootstrap: BootstrapConfig {
                should_init: true,
                admin_email: "admin@gmail.com".to_string(),
                init_password: "123456".to_string(),
                sample_user_email: "user@gmail.com".to_string(),
            },
            mail: MailConfig {
                smtp_host: None,
                smtp_port: 587,
                smtp_username: String::new(),
                smtp_password: String::new(),
                from: "Support Team <support@example.com>".to_string(),
                digest_enabled: true,
                digest_schedule: "0 10 0 * * Sun".to_string(),
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 8000,
                api_prefix: "/api/v1".to_string(),
            },
            filter: FilterConfig {
                max_limit: Some(500),
                default_page_size: 10,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                access_token_secret: String::new(),
                access_token_expiry_secs: 60 * 60 * 4,
                refresh_token_secret: String::new(),
                refresh_token_expiry_secs: 60 * 60 * 24 * 3,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                cookie_secure: true,
            },
            bootstrap: BootstrapConfig {
                should_init: true,
                admin_email: "admin@gmail.com".to_string(),
                init_password: String::new(),
                sample_user_email: "user@gmail.com".to_string(),
            },
            mail: MailConfig {
                smtp_host: None,
                smtp_port: 587,
                smtp_username: String::new(),
                smtp_password: String::new(),
                from: "Support Team <support@example.com>".to_string(),
                digest_enabled: true,
                digest_schedule: "0 10 0 * * Sun".to_string(),
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 8000,
                api_prefix: "/api/v1".to_string(),
            },
            filter: FilterConfig {
                max_limit: Some(100),
                default_page_size: 10,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                // Secrets must come from the environment
                access_token_secret: String::new(),
                access_token_expiry_secs: 60 * 15,
                refresh_token_secret: String::new(),
                refresh_token_expiry_secs: 60 * 60 * 24,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                cookie_secure: true,
            },
            bootstrap: BootstrapConfig {
                should_init: false,
                admin_email: "admin@gmail.com".to_string(),
                init_password: String::new(),
                sample_user_email: "user@gmail.com".to_string(),
            },
            mail: MailConfig {
                smtp_host: None,
                smtp_port: 587,
                smtp_username: String::new(),
                smtp_password: String::new(),
                from: "Support Team <support@example.com>".to_string(),
                digest_enabled: true,
                digest_schedule: "0 10 0 * * Sun".to_string(),
            },
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
