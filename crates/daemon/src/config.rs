//! Configuration loading: an optional `config.toml` under the platform config
//! directory, layered under `UWS_`-prefixed environment overrides (spec §6
//! "Configuration"). Mirrors the teacher's env-var-driven style
//! (`SEMANTICA_DB_PATH`, `SEMANTICA_RPC_PORT`) but routed through the `config`
//! crate so a deployment can also ship a file instead of exporting a dozen vars.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_password: Option<String>,

    pub queue_url: String,
    pub queue_password: Option<String>,

    pub lifetime: i64,
    pub execution_duration: i64,
    pub sync_timeout: i64,
    pub wait_timeout: i64,

    pub url_lifetime: i64,
    pub signing_service_account: Option<String>,
    pub storage_url: Option<String>,

    pub path_prefix: String,
    pub http_bind_addr: String,
    pub expire_jobs_interval_secs: u64,

    pub log_format: String,
}

pub fn load() -> Result<AppConfig> {
    let mut builder = config::Config::builder()
        .set_default("database_url", "sqlite://uws.db")?
        .set_default("queue_url", "redis://127.0.0.1:6379")?
        .set_default("lifetime", 3600)?
        .set_default("execution_duration", 3600)?
        .set_default("sync_timeout", 60)?
        .set_default("wait_timeout", 60)?
        .set_default("url_lifetime", 15 * 60)?
        .set_default("path_prefix", "")?
        .set_default("http_bind_addr", "0.0.0.0:8080")?
        .set_default("expire_jobs_interval_secs", 60)?
        .set_default("log_format", "pretty")?;

    if let Some(dirs) = ProjectDirs::from("org", "uws", "uws-engine") {
        let config_file = dirs.config_dir().join("config.toml");
        if config_file.exists() {
            builder = builder.add_source(config::File::from(config_file));
        }
    }

    let config = builder
        .add_source(config::Environment::with_prefix("UWS").separator("__"))
        .build()
        .context("loading configuration")?;

    config.try_deserialize().context("parsing configuration")
}
