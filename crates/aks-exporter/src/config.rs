use crate::logging::{LogConfig, LogFormat, LogLevel};
use aks_cloud::AksConfig;
use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Command-line flags. Every flag can also be set through its environment
/// variable; values from the config file take precedence over both.
#[derive(Debug, Clone, Parser)]
#[command(name = "aks-state-exporter", version, about = "Export the provisioning state of AKS clusters and node pools")]
pub struct Cli {
    /// The path to the configuration file for the server.
    #[arg(long, env = "CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Set the output format of the logs.
    #[arg(long = "log.format", env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Console, ignore_case = true)]
    pub log_format: LogFormat,

    /// Set the log level.
    #[arg(long = "log.level", env = "LOG_LEVEL", value_enum, default_value_t = LogLevel::Info, ignore_case = true)]
    pub log_level: LogLevel,

    /// The address where the server should listen on.
    #[arg(long = "server.address", env = "SERVER_ADDRESS", default_value = ":8080")]
    pub server_address: String,
}

impl Cli {
    /// Configuration made of the flag values alone.
    pub fn defaults(&self) -> Config {
        Config {
            log: LogConfig {
                format: self.log_format,
                level: self.log_level,
            },
            server: ServerConfig {
                address: self.server_address.clone(),
            },
            exporter: ExporterConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
}

impl ServerConfig {
    /// Address in a form `TcpListener::bind` accepts. A bare `:port` listens
    /// on all interfaces.
    pub fn listen_address(&self) -> String {
        if self.address.starts_with(':') {
            format!("0.0.0.0{}", self.address)
        } else {
            self.address.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub aks: AksConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log: LogConfig,
    pub server: ServerConfig,
    pub exporter: ExporterConfig,
}

#[derive(Debug, Default, Deserialize)]
struct FileLogConfig {
    format: Option<LogFormat>,
    level: Option<LogLevel>,
}

#[derive(Debug, Default, Deserialize)]
struct FileServerConfig {
    address: Option<String>,
}

/// Layout of the config file. `log` and `server` only override the values
/// they set.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    log: FileLogConfig,
    #[serde(default)]
    server: FileServerConfig,
    #[serde(default)]
    exporter: ExporterConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Toml,
}

impl FileFormat {
    /// TOML for `.toml` files, YAML otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

impl Config {
    /// Read the config file, expand environment variables in it and merge it
    /// over `defaults`.
    pub fn load(path: &Path, defaults: Config) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::parse(&content, FileFormat::from_path(path), defaults)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    pub fn parse(content: &str, format: FileFormat, defaults: Config) -> anyhow::Result<Self> {
        let expanded = expand_env(content);
        let file: FileConfig = match format {
            FileFormat::Yaml => {
                if expanded.trim().is_empty() {
                    FileConfig::default()
                } else {
                    serde_yaml::from_str(&expanded)?
                }
            }
            FileFormat::Toml => toml::from_str(&expanded)?,
        };

        Ok(Self {
            log: LogConfig {
                format: file.log.format.unwrap_or(defaults.log.format),
                level: file.log.level.unwrap_or(defaults.log.level),
            },
            server: ServerConfig {
                address: file.server.address.unwrap_or(defaults.server.address),
            },
            exporter: file.exporter,
        })
    }
}

/// Replace `${VAR}` and `$VAR` with values from the process environment.
/// Unset variables expand to the empty string and `$$` is a literal `$`.
pub fn expand_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// [`expand_env`] with a custom lookup.
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => {
                    out.push_str(&lookup(&braced[..end]).unwrap_or_default());
                    rest = &braced[end + 1..];
                }
                None => {
                    // unterminated, keep as written
                    out.push_str(&rest[pos..]);
                    rest = "";
                }
            }
        } else {
            let len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            if len == 0 {
                out.push('$');
            } else {
                out.push_str(&lookup(&after[..len]).unwrap_or_default());
            }
            rest = &after[len..];
        }
    }

    out.push_str(rest);
    out
}
