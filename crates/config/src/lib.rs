use std::env;
use std::env::VarError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use config::{Config as ConfigLib, File as ConfigFile};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_PATHNAME_ENV: &str = "CONFIG_PATHNAME";
const CONFIG_PATHNAME_DEFAULT: &str = "config.yaml";

const FILE_PREAMBLE: &str = r"#
# Primary Basalt configuration file
#

";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: Network,
    pub auth: Auth,
    pub game: Game,
    pub log: Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
    pub port: u16,
    /// Packets of at least this many bytes are sent zlib-compressed once
    /// login completes. `-1` disables compression entirely.
    pub compression_threshold: i32,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            port: 25565,
            compression_threshold: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Auth {
    /// When disabled, clients are admitted with their self-reported
    /// username and a name-derived UUID; no encryption is negotiated.
    pub online_mode: bool,
    pub session_host: String,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            online_mode: true,
            session_host: "https://sessionserver.mojang.com".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Game {
    pub protocol_version: i32,
    pub version_name: String,
    pub motd: String,
    pub max_players: u32,
}

impl Default for Game {
    fn default() -> Self {
        Self {
            protocol_version: 762,
            version_name: "1.19.4".to_owned(),
            motd: "A Basalt server".to_owned(),
            max_players: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Log {
    pub terminal: LogTerminal,
    pub file: LogFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogTerminal {
    pub ansi: bool,
    pub level: LogLevel,
}

impl Default for LogTerminal {
    fn default() -> Self {
        Self {
            ansi: true,
            level: LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogFile {
    pub enabled: bool,
    pub level: LogLevel,
    pub path: PathBuf,
    pub file_prefix: String,
}

impl Default for LogFile {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
            path: PathBuf::from("./log"),
            file_prefix: "basalt".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("environment variable {CONFIG_PATHNAME_ENV} is not unicode")]
    Env(VarError),
}

pub enum ConfigResult {
    Presented(Config),
    Created(Config),
}

impl ConfigResult {
    pub fn unwrap(self) -> Config {
        match self {
            Self::Presented(cfg) => cfg,
            Self::Created(cfg) => cfg,
        }
    }
}

/// Loads the YAML configuration from the given path. A missing file is
/// created and populated with defaults first, so an operator always has
/// a file to edit after the first run.
pub fn build_config(config_pathname: &Path) -> Result<ConfigResult, Error> {
    let presented = config_pathname.exists();

    if !presented {
        let mut file = File::create(config_pathname)?;
        file.write_all(FILE_PREAMBLE.as_bytes())?;
        serde_yaml::to_writer(file, &Config::default())?;
    }

    let config: Config = ConfigLib::builder()
        .add_source(ConfigFile::from(config_pathname.to_path_buf()))
        .build()?
        .try_deserialize()?;

    if presented {
        Ok(ConfigResult::Presented(config))
    } else {
        Ok(ConfigResult::Created(config))
    }
}

pub fn build_config_from_env() -> Result<ConfigResult, Error> {
    match env::var(CONFIG_PATHNAME_ENV) {
        Ok(val) => build_config(&PathBuf::from(val)),
        Err(VarError::NotPresent) => build_config(Path::new(CONFIG_PATHNAME_DEFAULT)),
        Err(e) => Err(Error::Env(e)),
    }
}
