use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub presence: PresenceConfig,
    pub seed: SeedConfig,
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
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub allow_registration: bool,
    pub default_role_code: String,
    pub super_admin_role_code: String,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    pub heartbeat_timeout_secs: u64,
    pub cleanup_interval_secs: u64,
    pub event_buffer: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    pub enabled: bool,
    pub admin_username: String,
    #[serde(skip_serializing)]
    pub admin_password: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("RBAC_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("SERVER_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging = v.parse().unwrap_or(self.server.enable_request_logging);
        }

        // Database overrides
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
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_ISSUER") {
            self.security.jwt_issuer = v;
        }
        if let Ok(v) = env::var("JWT_AUDIENCE") {
            self.security.jwt_audience = v;
        }
        if let Ok(v) = env::var("ACCESS_TOKEN_MINUTES") {
            self.security.access_token_minutes = v.parse().unwrap_or(self.security.access_token_minutes);
        }
        if let Ok(v) = env::var("REFRESH_TOKEN_DAYS") {
            self.security.refresh_token_days = v.parse().unwrap_or(self.security.refresh_token_days);
        }
        if let Ok(v) = env::var("SECURITY_ALLOW_REGISTRATION") {
            self.security.allow_registration = v.parse().unwrap_or(self.security.allow_registration);
        }
        if let Ok(v) = env::var("SECURITY_DEFAULT_ROLE_CODE") {
            self.security.default_role_code = v;
        }
        if let Ok(v) = env::var("SECURITY_SUPER_ADMIN_ROLE_CODE") {
            self.security.super_admin_role_code = v;
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Presence overrides
        if let Ok(v) = env::var("PRESENCE_HEARTBEAT_TIMEOUT_SECS") {
            self.presence.heartbeat_timeout_secs = v.parse().unwrap_or(self.presence.heartbeat_timeout_secs);
        }
        if let Ok(v) = env::var("PRESENCE_CLEANUP_INTERVAL_SECS") {
            self.presence.cleanup_interval_secs = v.parse().unwrap_or(self.presence.cleanup_interval_secs);
        }
        if let Ok(v) = env::var("PRESENCE_EVENT_BUFFER") {
            self.presence.event_buffer = v.parse().unwrap_or(self.presence.event_buffer);
        }

        // Seed overrides
        if let Ok(v) = env::var("SEED_ENABLED") {
            self.seed.enabled = v.parse().unwrap_or(self.seed.enabled);
        }
        if let Ok(v) = env::var("SEED_ADMIN_USERNAME") {
            self.seed.admin_username = v;
        }
        if let Ok(v) = env::var("SEED_ADMIN_PASSWORD") {
            self.seed.admin_password = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 5000,
                enable_request_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 5,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: "development-only-secret-change-me-0123456789".to_string(),
                jwt_issuer: "rbac-admin-api".to_string(),
                jwt_audience: "rbac-admin-web".to_string(),
                access_token_minutes: 60,
                refresh_token_days: 7,
                allow_registration: true,
                default_role_code: "user".to_string(),
                super_admin_role_code: "super_admin".to_string(),
                enable_cors: true,
                cors_origins: vec!["http://localhost:5173".to_string(), "http://localhost:3000".to_string()],
            },
            presence: PresenceConfig {
                heartbeat_timeout_secs: 90,
                cleanup_interval_secs: 30,
                event_buffer: 1024,
            },
            seed: SeedConfig {
                enabled: true,
                admin_username: "admin".to_string(),
                admin_password: "admin123".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 5000,
                enable_request_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_issuer: "rbac-admin-api".to_string(),
                jwt_audience: "rbac-admin-web".to_string(),
                access_token_minutes: 30,
                refresh_token_days: 7,
                allow_registration: true,
                default_role_code: "user".to_string(),
                super_admin_role_code: "super_admin".to_string(),
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            presence: PresenceConfig {
                heartbeat_timeout_secs: 90,
                cleanup_interval_secs: 30,
                event_buffer: 4096,
            },
            seed: SeedConfig {
                enabled: true,
                admin_username: "admin".to_string(),
                admin_password: String::new(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 5000,
                enable_request_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_issuer: "rbac-admin-api".to_string(),
                jwt_audience: "rbac-admin-web".to_string(),
                access_token_minutes: 15,
                refresh_token_days: 7,
                allow_registration: false,
                default_role_code: "user".to_string(),
                super_admin_role_code: "super_admin".to_string(),
                enable_cors: true,
                cors_origins: vec!["https://admin.example.com".to_string()],
            },
            presence: PresenceConfig {
                heartbeat_timeout_secs: 60,
                cleanup_interval_secs: 30,
                event_buffer: 8192,
            },
            seed: SeedConfig {
                enabled: false,
                admin_username: "admin".to_string(),
                admin_password: String::new(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
