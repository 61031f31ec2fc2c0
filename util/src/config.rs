//! Global harness configuration.
//!
//! `GraderConfig` is a lazily initialized, globally accessible singleton
//! containing runtime configuration values loaded from environment variables.
//! It provides thread-safe access and per-field setters for overrides in
//! tests or runtime environments.

use std::env;
use std::sync::{OnceLock, RwLock};

/// Runtime configuration loaded from `.env` and environment variables.
#[derive(Debug, Clone)]
pub struct GraderConfig {
    /// Upper bound, in seconds, on waiting for a student server to listen on its port.
    pub server_start_timeout: u64,
    /// Token used for authenticated GitHub API calls; anonymous when empty.
    pub github_token: String,
    /// Binary used to invoke the student build tool.
    pub maven_binary: String,
    pub log_level: String,
}

static CONFIG_INSTANCE: OnceLock<RwLock<GraderConfig>> = OnceLock::new();

impl GraderConfig {
    /// Loads the configuration from `.env` and environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            server_start_timeout: env::var("SERVER_START_TIMEOUT")
                .unwrap_or_else(|_| "40".into())
                .parse()
                .unwrap_or(40),
            github_token: env::var("GITHUB_TOKEN").unwrap_or_default(),
            maven_binary: env::var("MAVEN_BINARY").unwrap_or_else(|_| "mvn".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "grader=info".into()),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock cannot be acquired.
    pub fn global() -> std::sync::RwLockReadGuard<'static, GraderConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(GraderConfig::from_env()))
            .read()
            .expect("Failed to acquire GraderConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock.write().unwrap();
            *guard = GraderConfig::from_env();
        }
    }

    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut GraderConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(GraderConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire GraderConfig write lock");
        setter(&mut guard);
    }

    pub fn set_server_start_timeout(value: u64) {
        GraderConfig::set_field(|cfg| cfg.server_start_timeout = value);
    }

    pub fn set_github_token(value: impl Into<String>) {
        GraderConfig::set_field(|cfg| cfg.github_token = value.into());
    }

    pub fn set_maven_binary(value: impl Into<String>) {
        GraderConfig::set_field(|cfg| cfg.maven_binary = value.into());
    }

    pub fn set_log_level(value: impl Into<String>) {
        GraderConfig::set_field(|cfg| cfg.log_level = value.into());
    }
}

pub fn server_start_timeout() -> u64 {
    GraderConfig::global().server_start_timeout
}

pub fn github_token() -> String {
    GraderConfig::global().github_token.clone()
}

pub fn maven_binary() -> String {
    GraderConfig::global().maven_binary.clone()
}

pub fn log_level() -> String {
    GraderConfig::global().log_level.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_when_env_is_unset() {
        unsafe {
            env::remove_var("SERVER_START_TIMEOUT");
            env::remove_var("MAVEN_BINARY");
        }
        let cfg = GraderConfig::from_env();
        assert_eq!(cfg.server_start_timeout, 40);
        assert_eq!(cfg.maven_binary, "mvn");
    }

    #[test]
    #[serial]
    fn setters_override_global_values() {
        GraderConfig::set_server_start_timeout(7);
        assert_eq!(server_start_timeout(), 7);
        GraderConfig::reset();
    }
}
