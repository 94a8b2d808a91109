use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::FetchError;

/// File name of the transient archive written into the output directory.
pub const ARCHIVE_FILE_NAME: &str = "AUMCdb.zip";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransferMethod {
    /// Single archive pulled with curl and an `X-Dataverse-key` header.
    #[default]
    Dataverse,
    /// Recursive wget mirror authenticated with a username and password.
    Mirror,
}

impl TransferMethod {
    pub fn produces_archive(self) -> bool {
        matches!(self, TransferMethod::Dataverse)
    }
}

impl fmt::Display for TransferMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMethod::Dataverse => write!(f, "dataverse"),
            TransferMethod::Mirror => write!(f, "mirror"),
        }
    }
}

impl FromStr for TransferMethod {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dataverse" | "curl" => Ok(TransferMethod::Dataverse),
            "mirror" | "wget" => Ok(TransferMethod::Mirror),
            _ => Err(FetchError::InvalidMethod(value.to_string())),
        }
    }
}

/// Access token or password. Never printed through `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// A source entry after every prompt has been answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub url: String,
    pub common_url: Option<String>,
    pub method: TransferMethod,
    pub username: Option<String>,
    pub credential: Secret,
}

impl ResolvedSource {
    /// Primary URL first, then the common URL when present.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str()).chain(self.common_url.as_deref())
    }
}
