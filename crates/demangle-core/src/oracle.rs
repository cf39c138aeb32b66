//! Batched name resolution.
//!
//! An [`Oracle`] turns an ordered batch of mangled tokens into demangled
//! names, one per token and in the same order. Whether an unknown token is
//! passed through unchanged is the oracle's business; it is not an error.

use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Environment variable naming the demangling tool.
pub const TOOL_ENV_VAR: &str = "ASM_DEMANGLE_CXXFILT";

/// Default demangling tool.
pub const DEFAULT_TOOL: &str = "c++filt";

/// Failure while talking to an oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The tool could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Writing the batch or reading the answer failed.
    #[error("I/O error talking to `{program}`: {source}")]
    Io {
        /// Program being driven.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The tool exited unsuccessfully.
    #[error("`{program}` exited with {status}: {stderr}")]
    Exit {
        /// Program that failed.
        program: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },
    /// The tool wrote something that is not UTF-8.
    #[error("`{program}` produced non-UTF-8 output")]
    Utf8 {
        /// Program that produced the output.
        program: String,
    },
}

/// Batched demangling capability.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Demangles `tokens`, returning one name per token in input order.
    ///
    /// # Errors
    ///
    /// Returns an [`OracleError`] if the backing resolver fails.
    async fn demangle_batch(&self, tokens: &[String]) -> Result<Vec<String>, OracleError>;
}

#[async_trait]
impl<T: Oracle + ?Sized> Oracle for &T {
    async fn demangle_batch(&self, tokens: &[String]) -> Result<Vec<String>, OracleError> {
        (**self).demangle_batch(tokens).await
    }
}

#[async_trait]
impl<T: Oracle + ?Sized> Oracle for Arc<T> {
    async fn demangle_batch(&self, tokens: &[String]) -> Result<Vec<String>, OracleError> {
        (**self).demangle_batch(tokens).await
    }
}

#[async_trait]
impl<T: Oracle + ?Sized> Oracle for Box<T> {
    async fn demangle_batch(&self, tokens: &[String]) -> Result<Vec<String>, OracleError> {
        (**self).demangle_batch(tokens).await
    }
}

/// In-memory oracle backed by a lookup table.
///
/// Tokens missing from the table pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct TableOracle {
    names: HashMap<String, String>,
}

impl TableOracle {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mapping.
    #[must_use]
    pub fn with(mut self, mangled: impl Into<String>, demangled: impl Into<String>) -> Self {
        self.names.insert(mangled.into(), demangled.into());
        self
    }

    /// Resolves a single token.
    #[must_use]
    pub fn demangle_one<'a>(&'a self, token: &'a str) -> &'a str {
        self.names.get(token).map_or(token, String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TableOracle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl Oracle for TableOracle {
    async fn demangle_batch(&self, tokens: &[String]) -> Result<Vec<String>, OracleError> {
        Ok(tokens
            .iter()
            .map(|t| self.demangle_one(t).to_owned())
            .collect())
    }
}

/// How to launch the external demangling tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    /// Program to run.
    pub program: String,
    /// Extra arguments passed before any input.
    pub args: Vec<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_TOOL.to_string(),
            args: Vec::new(),
        }
    }
}

impl OracleConfig {
    /// Default configuration, with the program taken from
    /// `ASM_DEMANGLE_CXXFILT` when set and non-empty.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(TOOL_ENV_VAR).ok())
    }

    fn from_env_value(value: Option<String>) -> Self {
        value
            .filter(|v| !v.trim().is_empty())
            .map_or_else(Self::default, |program| Self {
                program,
                args: Vec::new(),
            })
    }
}

/// Oracle backed by a line-oriented external tool such as `c++filt`.
///
/// Each batch spawns the tool once, writes one token per line, closes its
/// input, and reads exactly one name per output line.
#[derive(Debug, Clone, Default)]
pub struct ProcessOracle {
    config: OracleConfig,
}

impl ProcessOracle {
    /// Creates an oracle for the given tool configuration.
    #[must_use]
    pub const fn new(config: OracleConfig) -> Self {
        Self { config }
    }

    /// The tool configuration.
    #[must_use]
    pub const fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn io_error(&self, source: std::io::Error) -> OracleError {
        OracleError::Io {
            program: self.config.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl Oracle for ProcessOracle {
    async fn demangle_batch(&self, tokens: &[String]) -> Result<Vec<String>, OracleError> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let program = &self.config.program;

        let mut child = Command::new(program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OracleError::Spawn {
                program: program.clone(),
                source,
            })?;
        tracing::debug!(program = %program, tokens = tokens.len(), "spawned demangler");

        let mut stdin = child.stdin.take().ok_or_else(|| {
            self.io_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stdin was not captured",
            ))
        })?;
        let mut batch = tokens.join("\n");
        batch.push('\n');

        // Output is collected concurrently so a large batch cannot fill the
        // tool's stdout pipe while we are still writing.
        let write = async move {
            stdin.write_all(batch.as_bytes()).await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(|e| self.io_error(e))?;

        // A tool that exits early also breaks the pipe; the exit status is
        // the more useful report.
        if !output.status.success() {
            tracing::debug!(program = %program, status = %output.status, "demangler failed");
            return Err(OracleError::Exit {
                program: program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written.map_err(|e| self.io_error(e))?;

        let stdout = String::from_utf8(output.stdout).map_err(|_| OracleError::Utf8 {
            program: program.clone(),
        })?;
        let names: Vec<String> = stdout.lines().map(str::to_owned).collect();
        tracing::debug!(program = %program, names = names.len(), "demangler finished");
        Ok(names)
    }
}
