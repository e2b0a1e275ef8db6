use confique::{yaml::FormatOptions, Config as _};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Confique(#[from] confique::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not determine config dir parent path")]
    ParentPath,

    #[error(transparent)]
    Xdg(#[from] xdg::BaseDirectoriesError),
}

#[derive(Clone, Debug, Serialize, Deserialize, confique::Config)]
pub struct Config {
    /// Database url. Defaults to: $XDG_DATA_HOME/postboard/database.sqlite3
    #[config(env = "POSTBOARD_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Database connection pool size
    #[config(default = 16)]
    pub database_pool_size: usize,

    /// Base64 encoded session signing key (at least 64 bytes)
    #[config(env = "POSTBOARD_SESSION_KEY")]
    pub session_key: Option<String>,

    /// Address the HTTP server listens on
    #[config(env = "POSTBOARD_BIND_ADDRESS", default = "127.0.0.1:3000")]
    pub bind_address: String,

    /// Only send the session cookie over HTTPS
    #[config(default = false)]
    pub secure_cookies: bool,

    /// Days of inactivity before a session expires
    #[config(default = 1)]
    pub session_inactivity_days: i64,
}

impl Config {
    pub fn load(config_path: Option<PathBuf>) -> Result<Config> {
        let config_path = get_config_path(config_path)?;
        let config = Config::builder().env().file(config_path).load()?;

        Ok(config)
    }
}

pub fn init_config(config_path: Option<PathBuf>) -> Result<()> {
    let config_path = get_config_path(config_path)?;
    if config_path.exists() {
        println!(
            "Configuration file already exists: {}",
            config_path.display()
        );
        return Ok(());
    }

    let config_path = write_config_template(Some(config_path))?;

    println!("Configuration file created: {}", config_path.display());

    Ok(())
}

pub fn get_config_template() -> String {
    confique::yaml::template::<Config>(FormatOptions::default())
}

pub fn print_config_template() {
    println!("{}", get_config_template());
}

pub fn get_config_path(config_path: Option<PathBuf>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path),
        None => {
            let xdg_dirs = xdg::BaseDirectories::with_prefix("postboard")?;
            Ok(xdg_dirs.get_config_file("config.yml"))
        }
    }
}

pub fn write_config_template(config_path: Option<PathBuf>) -> Result<PathBuf> {
    let config_path = get_config_path(config_path)?;
    let config_template = get_config_template();

    let config_path_dir = config_path.parent().ok_or(Error::ParentPath)?;

    std::fs::create_dir_all(config_path_dir)?;
    std::fs::write(&config_path, config_template)?;

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_documents_every_field() {
        let template = get_config_template();

        for field in [
            "database_url",
            "database_pool_size",
            "session_key",
            "bind_address",
            "secure_cookies",
            "session_inactivity_days",
        ] {
            assert!(template.contains(field), "missing {field}");
        }
    }

    #[test]
    fn defaults_fill_in_missing_fields() {
        let path = std::env::temp_dir().join(format!("postboard-config-{}.yml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "database_url: test.sqlite3\n").unwrap();

        let config = Config::builder().file(&path).load().unwrap();

        assert_eq!(config.database_url.as_deref(), Some("test.sqlite3"));
        assert_eq!(config.database_pool_size, 16);
        assert_eq!(config.bind_address, "127.0.0.1:3000");
        assert!(!config.secure_cookies);
        assert_eq!(config.session_inactivity_days, 1);
    }
}
