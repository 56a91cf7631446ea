//! Configuration management


use std::env::{self, VarError};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::trace;
use serde::Deserialize;

use crate::error::{Error, Result};


/// Service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {

    /// Address on which the service listens for HTTP requests
    pub listen: String,

    /// Path to the SQLite database file
    pub database_url: String,

    /// Maximum number of pooled database connections
    pub pool_size: u32,

    /// Whether sample cameras are stored when the database is empty
    pub seed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: String::from("127.0.0.1:8000"),
            database_url: String::from("speed_cameras.db"),
            pool_size: 4,
            seed: true,
        }
    }
}

impl Config {

    /// Loads configuration from a JSON file
    ///
    /// Keys missing from the file keep their default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut config: Config = serde_json::from_reader(reader)?;
        config.database_url = normalize_database_url(&config.database_url);
        config.check()?;

        Ok(config)
    }

    /// Loads configuration from environment variables
    ///
    /// * `SC_LISTEN` - listen address
    /// * `DATABASE_URL` - SQLite database path, optionally prefixed with `sqlite://`
    /// * `SC_POOL_SIZE` - maximum number of pooled connections
    /// * `SC_SEED` - set to `0` or `false` to skip storing sample cameras
    pub fn from_env() -> Result<Config> {

        let mut config = Config::default();

        if let Some(listen) = var("SC_LISTEN")? {
            config.listen = listen;
        }

        if let Some(url) = var("DATABASE_URL")? {
            config.database_url = normalize_database_url(&url);
        }

        if let Some(size) = var("SC_POOL_SIZE")? {
            config.pool_size = size.parse()
                .map_err(|_| Error::Config(format!("SC_POOL_SIZE is not a valid size: {}", size)))?;
        }

        if let Some(seed) = var("SC_SEED")? {
            config.seed = !matches!(seed.as_str(), "0" | "false");
        }

        config.check()?;

        Ok(config)
    }

    /// Rejects settings the service cannot start with
    fn check(&self) -> Result<()> {

        if self.pool_size == 0 {
            return Err(Error::Config(String::from("pool size must be at least 1")));
        }

        Ok(())
    }
}


/// Reads an environment variable, treating absence as `None`
fn var(name: &str) -> Result<Option<String>> {

    match env::var(name) {
        Ok(value) => {
            trace!("read {} from environment", name);
            Ok(Some(value))
        },
        Err(VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}


/// Strips a `sqlite://` scheme so the URL can be opened as a file path
fn normalize_database_url(url: &str) -> String {
    url.strip_prefix("sqlite://")
        .unwrap_or(url)
        .to_owned()
}
