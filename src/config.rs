use crate::routes::routes::{HttpOptions, UPLOADS_PREFIX};
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub upload_dir: String,
    /// In-progress uploads; must share a filesystem with `upload_dir` and
    /// must not be inside it.
    pub staging_dir: String,
    /// Public prefix image URLs are built from, without a trailing slash.
    pub base_url: String,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Art catalogue REST API")]
pub struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory uploaded images are stored in (overrides UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<String>,

    /// Directory in-progress uploads are written to (overrides STAGING_DIR)
    #[arg(long)]
    pub staging_dir: Option<String>,

    /// Public base URL of uploaded images (overrides BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |name| match env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", name)),
        })?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over values from `lookup`, falling back to defaults.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<Option<String>>,
    {
        let env_host = lookup("HOST")?.unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(&lookup, "PORT", 3000u16)?;
        let env_db = lookup("DATABASE_URL")?.unwrap_or_else(|| "sqlite://./data/art.db".into());
        let env_upload = lookup("UPLOAD_DIR")?.unwrap_or_else(|| "./uploads".into());
        let env_staging = lookup("STAGING_DIR")?.unwrap_or_else(|| "./data/staging".into());
        let env_base = lookup("BASE_URL")?;
        let cors_origins = lookup("CORS_ORIGINS")?
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let max_upload_bytes = parse_var(
            &lookup,
            "MAX_UPLOAD_BYTES",
            HttpOptions::default().max_upload_bytes,
        )?;

        // --- Merge ---
        let port = args.port.unwrap_or(env_port);
        let base_url = args
            .base_url
            .or(env_base)
            .unwrap_or_else(|| format!("http://localhost:{}{}", port, UPLOADS_PREFIX));

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port,
            database_url: args.database_url.unwrap_or(env_db),
            upload_dir: args.upload_dir.unwrap_or(env_upload),
            staging_dir: args.staging_dir.unwrap_or(env_staging),
            base_url,
            cors_origins,
            max_upload_bytes,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            cors_origins: self.cors_origins.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Result<Option<String>>,
{
    match lookup(name)? {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<Option<String>> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| Ok(vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = AppConfig::resolve(Args::default(), lookup(&[])).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.database_url, "sqlite://./data/art.db");
        assert_eq!(cfg.upload_dir, "./uploads");
        assert_eq!(cfg.staging_dir, "./data/staging");
        assert_eq!(cfg.base_url, "http://localhost:3000/uploads");
        assert!(cfg.cors_origins.is_empty());
        assert_eq!(cfg.max_upload_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn environment_values_are_read() {
        let cfg = AppConfig::resolve(
            Args::default(),
            lookup(&[
                ("PORT", "8080"),
                ("BASE_URL", "https://cdn.example.com/uploads"),
                ("CORS_ORIGINS", "https://a.example, ,http://localhost:3000"),
                ("MAX_UPLOAD_BYTES", "1024"),
                ("STAGING_DIR", "/var/tmp/art"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.base_url, "https://cdn.example.com/uploads");
        assert_eq!(
            cfg.cors_origins,
            ["https://a.example", "http://localhost:3000"]
        );
        assert_eq!(cfg.http_options().max_upload_bytes, 1024);
        assert_eq!(cfg.staging_dir, "/var/tmp/art");
    }

    #[test]
    fn cli_overrides_environment() {
        let args = Args {
            port: Some(9000),
            upload_dir: Some("/srv/uploads".into()),
            ..Args::default()
        };
        let cfg = AppConfig::resolve(args, lookup(&[("PORT", "8080"), ("UPLOAD_DIR", "/tmp")]))
            .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.upload_dir, "/srv/uploads");
        assert_eq!(cfg.base_url, "http://localhost:9000/uploads");
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = AppConfig::resolve(Args::default(), lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
