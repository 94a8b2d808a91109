use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "signal".to_string(),
    }
}

/// Executes an already tokenized command line.
///
/// The first token is the program; the rest are passed as arguments without
/// any shell interpretation.
pub trait CommandRunner {
    fn run(&self, tokens: &[String]) -> Result<(), CommandError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, tokens: &[String]) -> Result<(), CommandError> {
        (**self).run(tokens)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, tokens: &[String]) -> Result<(), CommandError> {
        let (program, args) = tokens.split_first().ok_or(CommandError::Empty)?;
        let program_path =
            find_in_path(program).ok_or_else(|| CommandError::MissingTool(program.clone()))?;

        tracing::debug!(command = %redact_command(tokens).join(" "), "running");
        let mut child = Command::new(&program_path)
            .args(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| spawn_error(program, source))?;

        let stderr_tail = match child.stderr.take() {
            Some(stderr) => {
                forward_stderr(stderr).map_err(|source| spawn_error(program, source))?
            }
            None => String::new(),
        };
        let status = child.wait().map_err(|source| spawn_error(program, source))?;
        if status.success() {
            return Ok(());
        }
        Err(CommandError::Failed {
            program: program.clone(),
            code: status.code(),
            stderr: if stderr_tail.is_empty() {
                "no error output".to_string()
            } else {
                stderr_tail
            },
        })
    }
}

/// Bytes of child stderr kept for the error message.
const STDERR_TAIL_BYTES: usize = 4096;

fn spawn_error(program: &str, source: io::Error) -> CommandError {
    CommandError::Spawn {
        program: program.to_string(),
        source,
    }
}

// Copies the child's stderr through to ours so progress stays visible and
// returns the trimmed last STDERR_TAIL_BYTES of it.
fn forward_stderr(mut stderr: impl Read) -> io::Result<String> {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_BYTES);
    let mut buffer = [0u8; 8192];
    let mut ours = io::stderr();
    loop {
        let read = match stderr.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        let chunk = &buffer[..read];
        // Losing the terminal does not fail the transfer.
        let _ = ours.write_all(chunk);
        let overflow = (tail.len() + read).saturating_sub(STDERR_TAIL_BYTES);
        tail.drain(..overflow.min(tail.len()));
        let skip = read.saturating_sub(STDERR_TAIL_BYTES);
        tail.extend(&chunk[skip..]);
    }
    let bytes = tail.into_iter().collect::<Vec<_>>();
    Ok(String::from_utf8_lossy(&bytes).trim().to_string())
}

static DATAVERSE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?is)(X-Dataverse-key:).+$").unwrap());

/// Copy of `tokens` safe to log: the Dataverse key header value and the
/// argument following `--password` are masked.
pub fn redact_command(tokens: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut mask_next = false;
    for token in tokens {
        if mask_next {
            out.push("***".to_string());
            mask_next = false;
            continue;
        }
        if token == "--password" {
            mask_next = true;
            out.push(token.clone());
        } else if token.starts_with("--password=") {
            out.push("--password=***".to_string());
        } else {
            out.push(DATAVERSE_KEY.replace(token, "${1}***").into_owned());
        }
    }
    out
}

/// Locates `name` on `PATH`. Paths containing a separator are checked as is.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return direct.exists().then(|| direct.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn redacts_dataverse_key() {
        let redacted = redact_command(&tokens(&[
            "curl",
            "-H",
            "X-Dataverse-key:abcdefg123",
            "http://example.com/dataset",
        ]));
        assert_eq!(redacted[2], "X-Dataverse-key:***");
        assert_eq!(redacted[3], "http://example.com/dataset");
    }

    #[test]
    fn redacts_password_argument() {
        let redacted = redact_command(&tokens(&["wget", "--password", "hunter2", "--password=x"]));
        assert_eq!(redacted, tokens(&["wget", "--password", "***", "--password=***"]));
    }

    #[test]
    fn redacts_multiline_dataverse_key() {
        let redacted = redact_command(&tokens(&["curl", "-H", "x-dataverse-KEY:abc\ndef"]));
        assert_eq!(redacted[2], "x-dataverse-KEY:***");
    }

    #[test]
    fn unknown_program_is_a_missing_tool() {
        let err = SystemCommandRunner::new()
            .run(&tokens(&["aumcdb-fetch-no-such-tool", "--version"]))
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::MissingTool(ref tool) if tool == "aumcdb-fetch-no-such-tool"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_reports_code_and_stderr() {
        let err = SystemCommandRunner::new()
            .run(&tokens(&["sh", "-c", "echo boom >&2; exit 7"]))
            .unwrap_err();
        match err {
            CommandError::Failed {
                program,
                code,
                stderr,
            } => {
                assert_eq!(program, "sh");
                assert_eq!(code, Some(7));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn successful_command_returns_ok() {
        SystemCommandRunner::new()
            .run(&tokens(&["sh", "-c", "echo stdout-is-inherited"]))
            .unwrap();
    }

    #[test]
    fn stderr_tail_is_bounded() {
        let mut input = vec![b'a'; STDERR_TAIL_BYTES * 3];
        input.extend_from_slice(b"last line");
        let tail = forward_stderr(input.as_slice()).unwrap();
        assert_eq!(tail.len(), STDERR_TAIL_BYTES);
        assert!(tail.ends_with("last line"));
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = SystemCommandRunner::new().run(&[]).unwrap_err();
        assert!(matches!(err, CommandError::Empty));
    }
}
