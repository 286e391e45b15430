// src/orchestrator.rs
//! Runs the maintenance pass and the posting pass as separate processes.

use crate::config::ContentMode;
use crate::error::AppError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Settings every child process inherits.
#[derive(Debug, Clone)]
pub struct ChildArgs {
    pub config: PathBuf,
    pub log_dir: PathBuf,
    pub verbose: bool,
    pub account: String,
    pub mode: ContentMode,
}

impl ChildArgs {
    /// Command line for `<exe> <subcommand> ...`.
    pub fn for_subcommand(&self, subcommand: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            subcommand.into(),
            "--account".into(),
            self.account.clone().into(),
            "--mode".into(),
            self.mode.as_str().into(),
            "--config".into(),
            self.config.clone().into(),
            "--log-dir".into(),
            self.log_dir.clone().into(),
        ];
        if self.verbose {
            args.push("--verbose".into());
        }
        args
    }
}

/// One process to run and wait for.
#[derive(Debug, Clone)]
pub struct SequenceStep {
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl SequenceStep {
    /// This binary re-invoked with `subcommand`.
    pub fn subcommand(exe: &Path, subcommand: &str, args: &ChildArgs) -> Self {
        Self {
            name: subcommand.to_string(),
            program: exe.to_path_buf(),
            args: args.for_subcommand(subcommand),
        }
    }
}

/// The `run` sequence: promote, then post.
pub fn standard_sequence(exe: &Path, args: &ChildArgs) -> Vec<SequenceStep> {
    ["promote", "post"]
        .iter()
        .map(|sub| SequenceStep::subcommand(exe, sub, args))
        .collect()
}

/// Runs the steps in order, each to completion. The first step that fails
/// to start or exits non-zero stops the sequence.
pub async fn run_sequence(steps: &[SequenceStep]) -> Result<(), AppError> {
    for step in steps {
        log::info!("=== {} ===", step.name);
        let status = Command::new(&step.program)
            .args(&step.args)
            .status()
            .await
            .map_err(|e| AppError::Subprocess {
                step: step.name.clone(),
                reason: format!("could not start {}: {}", step.program.display(), e),
            })?;

        if !status.success() {
            let reason = match status.code() {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by a signal".to_string(),
            };
            log::error!("Step '{}' {}", step.name, reason);
            return Err(AppError::Subprocess {
                step: step.name.clone(),
                reason,
            });
        }
        log::info!("Step '{}' finished", step.name);
    }
    Ok(())
}
