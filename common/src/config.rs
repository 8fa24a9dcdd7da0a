//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_duration_minutes: u64,
    /// Default validity window, in minutes, of a freshly issued QR code.
    pub qr_duration_minutes: i64,
    /// Default geofence radius, in meters, when the issuer does not supply one.
    pub qr_radius_meters: f64,
    /// Extra tolerance added to every geofence radius. Zero unless configured.
    pub geofence_buffer_meters: f64,
    /// How often the background finalizer scans for due QR codes.
    pub finalize_poll_seconds: u64,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "rollcall".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "logs/api.log".into()),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "data/rollcall.db".into()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()
                .expect("PORT must be a number"),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "change-me".into()),
            jwt_duration_minutes: env::var("JWT_DURATION_MINUTES")
                .unwrap_or_else(|_| "60".into())
                .parse()
                .expect("JWT_DURATION_MINUTES must be a number"),
            qr_duration_minutes: env::var("QR_DURATION_MINUTES")
                .unwrap_or_else(|_| "1".into())
                .parse()
                .expect("QR_DURATION_MINUTES must be a number"),
            qr_radius_meters: env::var("QR_RADIUS_METERS")
                .unwrap_or_else(|_| "40".into())
                .parse()
                .expect("QR_RADIUS_METERS must be a number"),
            geofence_buffer_meters: env::var("GEOFENCE_BUFFER_METERS")
                .unwrap_or_else(|_| "0".into())
                .parse()
                .expect("GEOFENCE_BUFFER_METERS must be a number"),
            finalize_poll_seconds: env::var("FINALIZE_POLL_SECONDS")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .expect("FINALIZE_POLL_SECONDS must be a number"),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock cannot be acquired.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock.write().unwrap();
            *guard = AppConfig::from_env();
        }
    }

    /// Generic internal setter for any field in the config.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_project_name(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.project_name = value.into());
    }

    pub fn set_log_level(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_level = value.into());
    }

    pub fn set_log_file(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_file = value.into());
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_host(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.host = value.into());
    }

    pub fn set_port(value: u16) {
        AppConfig::set_field(|cfg| cfg.port = value);
    }

    pub fn set_jwt_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.jwt_secret = value.into());
    }

    pub fn set_jwt_duration_minutes(value: u64) {
        AppConfig::set_field(|cfg| cfg.jwt_duration_minutes = value);
    }

    pub fn set_qr_duration_minutes(value: i64) {
        AppConfig::set_field(|cfg| cfg.qr_duration_minutes = value);
    }

    pub fn set_qr_radius_meters(value: f64) {
        AppConfig::set_field(|cfg| cfg.qr_radius_meters = value);
    }

    pub fn set_geofence_buffer_meters(value: f64) {
        AppConfig::set_field(|cfg| cfg.geofence_buffer_meters = value);
    }

    pub fn set_finalize_poll_seconds(value: u64) {
        AppConfig::set_field(|cfg| cfg.finalize_poll_seconds = value);
    }
}

// --- Free accessor functions ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

pub fn jwt_secret() -> String {
    AppConfig::global().jwt_secret.clone()
}

pub fn jwt_duration_minutes() -> u64 {
    AppConfig::global().jwt_duration_minutes
}

pub fn qr_duration_minutes() -> i64 {
    AppConfig::global().qr_duration_minutes
}

pub fn qr_radius_meters() -> f64 {
    AppConfig::global().qr_radius_meters
}

pub fn geofence_buffer_meters() -> f64 {
    AppConfig::global().geofence_buffer_meters
}

pub fn finalize_poll_seconds() -> u64 {
    AppConfig::global().finalize_poll_seconds
}
