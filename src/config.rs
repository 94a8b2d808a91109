use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::TransferMethod;
use crate::error::FetchError;

pub const DEFAULT_CONFIG_FILE: &str = "aumcdb-fetch.json";

/// Dataset descriptor as written on disk.
///
/// Both the flat layout (`url`, `api_key` at the top level) and the nested
/// `urls.dataset` layout are accepted; the nested one wins when both exist.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub common_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub urls: Option<UrlsSection>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UrlsSection {
    #[serde(default)]
    pub dataset: Option<DatasetEntries>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DatasetEntries {
    Many(Vec<SourceEntry>),
    Single(SourceEntry),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourceEntry {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub common_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

/// One remote source. Missing URL and credentials are prompted for later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRequest {
    pub url: Option<String>,
    pub common_url: Option<String>,
    pub username: Option<String>,
    pub api_key: Option<String>,
    pub method: TransferMethod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub sources: Vec<SourceRequest>,
}

impl Default for DatasetDescriptor {
    fn default() -> Self {
        Self {
            sources: vec![SourceRequest::default()],
        }
    }
}

/// Values from the command line that replace those of the first source.
#[derive(Debug, Clone, Default)]
pub struct SourceOverrides {
    pub url: Option<String>,
    pub common_url: Option<String>,
    pub username: Option<String>,
    pub api_key: Option<String>,
    pub method: Option<TransferMethod>,
}

impl DatasetDescriptor {
    pub fn apply_overrides(&mut self, overrides: SourceOverrides) {
        if self.sources.is_empty() {
            self.sources.push(SourceRequest::default());
        }
        let first = &mut self.sources[0];
        if overrides.url.is_some() {
            first.url = overrides.url;
        }
        if overrides.common_url.is_some() {
            first.common_url = overrides.common_url;
        }
        if overrides.username.is_some() {
            first.username = overrides.username;
        }
        if overrides.api_key.is_some() {
            first.api_key = overrides.api_key;
        }
        if let Some(method) = overrides.method {
            first.method = method;
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the descriptor from `path`, or from the default locations when no
    /// path is given. With no file anywhere an empty descriptor is returned,
    /// so every value ends up prompted.
    pub fn resolve(path: Option<&str>) -> Result<DatasetDescriptor, FetchError> {
        let config_path = match path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(FetchError::MissingConfig(path));
                }
                Some(path)
            }
            None => default_config_path(),
        };

        let Some(config_path) = config_path else {
            tracing::debug!("no descriptor file found, values will be prompted");
            return Ok(DatasetDescriptor::default());
        };

        tracing::debug!(path = %config_path.display(), "loading dataset descriptor");
        let content = fs::read_to_string(&config_path)
            .map_err(|_| FetchError::ConfigRead(config_path.clone()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<DatasetDescriptor, FetchError> {
        let config: Config = serde_json::from_str(content)
            .map_err(|err| FetchError::ConfigParse(err.to_string()))?;
        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<DatasetDescriptor, FetchError> {
        let nested = config.urls.and_then(|urls| urls.dataset);
        let entries = match nested {
            Some(DatasetEntries::Single(entry)) => vec![entry],
            Some(DatasetEntries::Many(entries)) => entries,
            None => vec![SourceEntry {
                url: config.url,
                common_url: config.common_url,
                username: config.username,
                api_key: config.api_key,
                method: config.method,
            }],
        };

        let mut sources = entries
            .into_iter()
            .map(|entry| {
                let method = match entry.method {
                    Some(value) => value.parse()?,
                    None => TransferMethod::default(),
                };
                Ok(SourceRequest {
                    url: non_empty(entry.url),
                    common_url: non_empty(entry.common_url),
                    username: non_empty(entry.username),
                    api_key: non_empty(entry.api_key),
                    method,
                })
            })
            .collect::<Result<Vec<_>, FetchError>>()?;

        if sources.is_empty() {
            sources.push(SourceRequest::default());
        }

        Ok(DatasetDescriptor { sources })
    }
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    BaseDirs::new()
        .map(|dirs| dirs.config_dir().join("aumcdb-fetch").join("config.json"))
        .filter(|path| path.exists())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
