use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable that overrides `auth.secret`.
pub const SECRET_ENV: &str = "VIGNETTE_SECRET_KEY";

#[derive(Parser, Debug)]
#[command(name = "vignette", about = "A small photo feed server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub token_hours: u64,
    pub secret: Option<String>,
    pub bcrypt_cost: u32,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the API with credentials. Empty disables CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "token".to_string(),
            token_hours: 24,
            secret: None,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        if let Ok(secret) = std::env::var(SECRET_ENV) {
            config.auth.secret = Some(secret);
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("vignette.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".vignette")
        })
    }

    pub fn db_path(&self) -> anyhow::Result<&PathBuf> {
        self.database
            .path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("database path is not configured"))
    }

    /// The token signing secret. Startup fails without one.
    pub fn signing_secret(&self) -> anyhow::Result<&str> {
        match self.auth.secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => anyhow::bail!(
                "no signing secret: set auth.secret in config.toml or {}",
                SECRET_ENV
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_for(dir: &std::path::Path) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(dir.to_path_buf()),
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.cookie_name, "token");
        assert_eq!(config.auth.token_hours, 24);
        assert!(config.auth.secret.is_none());
        assert!(config.database.path.is_none());
        assert!(config.cors.allowed_origins.is_empty());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_for(std::path::Path::new("/tmp/test-vignette"));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-vignette"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_for(tmp.path())).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.db_path().unwrap(), &tmp.path().join("vignette.db"));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[auth]
cookie_name = "session"
token_hours = 2

[cors]
allowed_origins = ["http://localhost:5173"]
"#,
        )
        .unwrap();

        let mut cli = cli_for(tmp.path());
        cli.config = Some(config_path);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.cookie_name, "session");
        assert_eq!(config.auth.token_hours, 2);
        assert_eq!(config.cors.allowed_origins, vec!["http://localhost:5173"]);
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[server]\nhost = \"192.168.1.1\"\nport = 9000\n",
        )
        .unwrap();

        let mut cli = cli_for(tmp.path());
        cli.host = Some("10.0.0.1".to_string());
        cli.port = Some(4000);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn signing_secret_is_required() {
        let mut config = Config::default();
        assert!(config.signing_secret().is_err());

        config.auth.secret = Some(String::new());
        assert!(config.signing_secret().is_err());

        config.auth.secret = Some("s3cret".to_string());
        assert_eq!(config.signing_secret().unwrap(), "s3cret");
    }
}
