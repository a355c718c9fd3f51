use std::collections::HashMap;
use std::env;

use auth::TokenLifetimes;
use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::domain::subject::models::Role;
use crate::domain::subject::policy::RolePolicies;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub roles: HashMap<Role, RoleConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

/// Where subjects and sessions are kept.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local, lost on restart.
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub access_ttl_minutes: Option<i64>,
    pub refresh_ttl_days: Option<i64>,
}

/// Per-role token lifetime overrides.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RoleConfig {
    pub access_ttl_minutes: Option<i64>,
    pub refresh_ttl_days: Option<i64>,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: ROLES__ADMIN__ACCESS_TTL_MINUTES=15 overrides roles.admin.access_ttl_minutes
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;

        Ok(config)
    }

    /// Role policies with configured token lifetimes applied.
    ///
    /// A role-specific override wins over the `jwt` one, which wins over the role default.
    pub fn role_policies(&self) -> RolePolicies {
        Role::ALL
            .into_iter()
            .fold(RolePolicies::default(), |policies, role| {
                let defaults = policies.get(role).lifetimes;
                let role_config = self.roles.get(&role).cloned().unwrap_or_default();

                let access = role_config
                    .access_ttl_minutes
                    .or(self.jwt.access_ttl_minutes)
                    .map(Duration::minutes)
                    .unwrap_or(defaults.access);
                let refresh = role_config
                    .refresh_ttl_days
                    .or(self.jwt.refresh_ttl_days)
                    .map(Duration::days)
                    .unwrap_or(defaults.refresh);

                policies.with_lifetimes(role, TokenLifetimes::new(access, refresh))
            })
    }
}
