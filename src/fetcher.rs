use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::archive;
use crate::command::{CommandRunner, redact_command};
use crate::config::{DatasetDescriptor, SourceRequest};
use crate::domain::{ARCHIVE_FILE_NAME, ResolvedSource, Secret, TransferMethod};
use crate::error::FetchError;
use crate::prompt::InputSource;

pub const URL_PROMPT: &str = "Enter the download link: ";
pub const API_TOKEN_PROMPT: &str = "Enter your API Token: ";
pub const USERNAME_PROMPT: &str = "Enter your username: ";
pub const PASSWORD_PROMPT: &str = "Enter your password: ";

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Demo downloads do not exist for AUMCdb; setting this always fails.
    pub demo: bool,
    pub dry_run: bool,
}

/// One command to run, in the order it will run.
#[derive(Debug, Clone)]
pub struct PlannedTransfer {
    pub url: String,
    pub method: TransferMethod,
    pub archive: Option<Utf8PathBuf>,
    tokens: Vec<String>,
}

impl PlannedTransfer {
    pub fn command(&self) -> &[String] {
        &self.tokens
    }

    pub fn redacted_command(&self) -> Vec<String> {
        redact_command(&self.tokens)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub output_dir: String,
    pub fetched_at: String,
    pub dry_run: bool,
    pub transfers: Vec<TransferReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    pub url: String,
    pub method: TransferMethod,
    pub command: Vec<String>,
    pub extracted_files: Option<usize>,
}

#[derive(Clone)]
pub struct Fetcher<C: CommandRunner, I: InputSource> {
    runner: C,
    input: I,
}

impl<C: CommandRunner, I: InputSource> Fetcher<C, I> {
    pub fn new(runner: C, input: I) -> Self {
        Self { runner, input }
    }

    /// Downloads every source of `descriptor` into `output_dir`, unpacking
    /// Dataverse archives in place and removing them afterwards.
    pub fn fetch(
        &self,
        output_dir: &Utf8Path,
        descriptor: &DatasetDescriptor,
        options: &FetchOptions,
    ) -> Result<FetchReport, FetchError> {
        if options.demo {
            return Err(FetchError::UnsupportedMode(
                "Demo download is not currently available for AUMCdb.".to_string(),
            ));
        }
        if !output_dir.is_dir() {
            return Err(FetchError::OutputDirMissing(
                output_dir.as_std_path().to_path_buf(),
            ));
        }

        let plan = self.plan(output_dir, descriptor)?;
        let mut transfers = Vec::with_capacity(plan.len());
        for planned in &plan {
            let extracted_files = if options.dry_run {
                tracing::info!(command = %planned.redacted_command().join(" "), "dry run");
                None
            } else {
                self.execute(output_dir, planned)?
            };
            transfers.push(TransferReport {
                url: planned.url.clone(),
                method: planned.method,
                command: planned.redacted_command(),
                extracted_files,
            });
        }

        Ok(FetchReport {
            output_dir: output_dir.to_string(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
            dry_run: options.dry_run,
            transfers,
        })
    }

    /// Resolves every missing value and builds the commands without touching
    /// the filesystem. All prompts happen here, before the first transfer.
    pub fn plan(
        &self,
        output_dir: &Utf8Path,
        descriptor: &DatasetDescriptor,
    ) -> Result<Vec<PlannedTransfer>, FetchError> {
        let mut plan = Vec::new();
        for request in &descriptor.sources {
            let source = self.resolve_source(request)?;
            for url in source.urls() {
                plan.push(PlannedTransfer {
                    url: url.to_string(),
                    method: source.method,
                    archive: source
                        .method
                        .produces_archive()
                        .then(|| archive_path(output_dir)),
                    tokens: build_command(&source, url, output_dir),
                });
            }
        }
        Ok(plan)
    }

    fn resolve_source(&self, request: &SourceRequest) -> Result<ResolvedSource, FetchError> {
        let url = match &request.url {
            Some(url) => url.clone(),
            None => self.input.prompt(URL_PROMPT)?,
        };

        let username = match request.method {
            TransferMethod::Dataverse => request.username.clone(),
            TransferMethod::Mirror => match &request.username {
                Some(username) => Some(username.clone()),
                None => Some(self.input.prompt(USERNAME_PROMPT)?),
            },
        };

        let credential = match &request.api_key {
            Some(key) => key.clone(),
            None => {
                let text = match request.method {
                    TransferMethod::Dataverse => API_TOKEN_PROMPT,
                    TransferMethod::Mirror => PASSWORD_PROMPT,
                };
                self.input.prompt_secret(text)?
            }
        };

        Ok(ResolvedSource {
            url,
            common_url: request.common_url.clone(),
            method: request.method,
            username,
            credential: Secret::new(credential),
        })
    }

    fn execute(
        &self,
        output_dir: &Utf8Path,
        planned: &PlannedTransfer,
    ) -> Result<Option<usize>, FetchError> {
        if let Some(archive) = &planned.archive {
            if archive::remove_if_exists(archive.as_std_path())? {
                tracing::info!("Removing existing file {archive}");
            }
        }

        self.runner
            .run(planned.command())
            .map_err(|source| FetchError::Transfer {
                url: planned.url.clone(),
                source,
            })?;

        let Some(archive) = &planned.archive else {
            tracing::info!("Mirrored {} into {output_dir}", planned.url);
            return Ok(None);
        };

        archive::validate_zip(archive.as_std_path())?;
        let files = archive::extract_zip(archive.as_std_path(), output_dir.as_std_path())?;
        tracing::info!("Downloaded and extracted data to {output_dir}");

        if archive::remove_if_exists(archive.as_std_path())? {
            tracing::info!("Removing existing file {archive}");
        }
        Ok(Some(files))
    }
}

pub fn archive_path(output_dir: &Utf8Path) -> Utf8PathBuf {
    output_dir.join(ARCHIVE_FILE_NAME)
}

/// Token sequence that fetches `url` for `source` into `output_dir`.
pub fn build_command(source: &ResolvedSource, url: &str, output_dir: &Utf8Path) -> Vec<String> {
    match source.method {
        TransferMethod::Dataverse => vec![
            "curl".to_string(),
            "-L".to_string(),
            "-o".to_string(),
            archive_path(output_dir).to_string(),
            "-H".to_string(),
            format!("X-Dataverse-key:{}", source.credential.expose()),
            url.to_string(),
        ],
        TransferMethod::Mirror => {
            let mut tokens = vec![
                "wget".to_string(),
                "-r".to_string(),
                "-N".to_string(),
                "-c".to_string(),
                "-np".to_string(),
                "-nH".to_string(),
            ];
            if let Some(username) = &source.username {
                tokens.push("--user".to_string());
                tokens.push(username.clone());
            }
            tokens.push("--password".to_string());
            tokens.push(source.credential.expose().to_string());
            tokens.push("-P".to_string());
            tokens.push(output_dir.to_string());
            tokens.push(url.to_string());
            tokens
        }
    }
}
