use std::env;
use std::path::PathBuf;

/// Development fallbacks. Fine for local use, a liability in production,
/// which is why `warn_on_dev_defaults` flags them at startup.
const DEV_JWT_SECRET: &str = "dev_secret_change_me";
const DEV_DB_PASSWORD: &str = "docflow_pass";

/// Application configuration, read once from the environment at startup and
/// passed explicitly into everything that needs it. Business logic never
/// reads environment variables itself.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    /// Request body cap for document creation, enforced at parse time.
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(8080),
            },
            database: DatabaseConfig {
                host: env_or("DB_HOST", "localhost"),
                user: env_or("DB_USER", "docflow"),
                password: env_or("DB_PASSWORD", DEV_DB_PASSWORD),
                name: env_or("DB_NAME", "docflow_db"),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            },
            security: SecurityConfig {
                jwt_secret: env_or("JWT_SECRET", DEV_JWT_SECRET),
                jwt_expiry_hours: 24,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "uploads")),
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
            },
        }
    }

    /// Log a warning for every development fallback still in effect.
    /// These are flagged rather than rejected so local setups keep working.
    pub fn warn_on_dev_defaults(&self) {
        if self.security.jwt_secret == DEV_JWT_SECRET {
            tracing::warn!("JWT_SECRET not set, using the development fallback; set it before deploying");
        }
        if self.database.password == DEV_DB_PASSWORD {
            tracing::warn!("DB_PASSWORD not set, using the development fallback");
        }
    }
}

impl DatabaseConfig {
    /// Connection string for sqlx.
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}/{}",
            self.user, self.password, self.host, self.name
        )
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}
