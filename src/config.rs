use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL template; `{name}` and `{password}` are substituted.
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub password: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn resolved_url(&self) -> String {
        self.url.replace("{name}", &self.name).replace("{password}", &self.password)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o.trim() == "*")
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub security: Option<SecurityConfig>,
}

const DEFAULTS: &str = include_str!("../config/default.toml");

impl Default for AppConfig {
    fn default() -> Self {
        match base_builder().build().and_then(|cfg| cfg.try_deserialize()) {
            Ok(app_cfg) => app_cfg,
            Err(e) => panic!("embedded default config is invalid: {}", e),
        }
    }
}

fn base_builder() -> ::config::ConfigBuilder<::config::builder::DefaultState> {
    ::config::Config::builder().add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
}

/// Loads the configuration: embedded defaults, then `collectarium.toml`, then the file
/// named by `COLLECTARIUM_CONFIG`, then `COLLECTARIUM__*` variables, then the flat
/// `PORT` / `DB_NAME` / `DB_PASSWORD` variables.
pub fn load() -> anyhow::Result<AppConfig> {
    let _ = dotenvy::dotenv();

    let mut builder = base_builder().add_source(::config::File::with_name("collectarium").required(false));
    if let Ok(custom_path) = std::env::var("COLLECTARIUM_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    builder = builder.add_source(
        ::config::Environment::with_prefix("COLLECTARIUM")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("cors.allowed_origins")
            .try_parsing(true),
    );

    let mut app_cfg: AppConfig = builder.build()?.try_deserialize()?;
    apply_legacy_env(&mut app_cfg, |key| std::env::var(key).ok())?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

/// Builds a configuration from the embedded defaults overlaid with a TOML document.
pub fn from_toml_str(overrides: &str) -> anyhow::Result<AppConfig> {
    let app_cfg: AppConfig = base_builder()
        .add_source(::config::File::from_str(overrides, ::config::FileFormat::Toml))
        .build()?
        .try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

/// Applies the flat variables older deployments set (`PORT`, `DB_NAME`, `DB_PASSWORD`).
pub fn apply_legacy_env<F>(cfg: &mut AppConfig, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
        cfg.server.port = port
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid PORT {:?}: {}", port, e))?;
    }
    if let Some(name) = lookup("DB_NAME").filter(|v| !v.trim().is_empty()) {
        cfg.database.name = name.trim().to_string();
    }
    if let Some(password) = lookup("DB_PASSWORD") {
        cfg.database.password = password;
    }
    Ok(())
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }
    if cfg.server.max_body_bytes == 0 {
        return Err(anyhow::anyhow!("server.max_body_bytes must be > 0"));
    }
    if cfg.database.name.trim().is_empty() {
        return Err(anyhow::anyhow!("database.name must not be empty"));
    }
    if cfg.database.url.trim().is_empty() {
        return Err(anyhow::anyhow!("database.url must not be empty"));
    }
    if cfg.database.max_connections == 0 {
        return Err(anyhow::anyhow!("database.max_connections must be > 0"));
    }
    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    let path = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"));
    if let Some(path) = path {
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path.starts_with(":memory:") {
            return Ok(());
        }
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
