// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # External Asset Pipeline
//!
//! Runs a separate asset build process (by convention `gulp`) in the
//! project root and waits for it. The process must exit successfully and
//! leave its output in the configured directory; the build then merges
//! that directory into the site.

use crate::core::config::Config;
use crate::core::error::{BlogFlowError, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Number of stderr lines quoted in a failure message.
const STDERR_TAIL: usize = 10;

/// An external asset build process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalPipeline {
    /// Display name.
    pub name: String,
    /// Program followed by its arguments.
    pub command: Vec<String>,
    /// Directory the process runs in.
    pub working_dir: PathBuf,
    /// Directory the process leaves its output in.
    pub output_dir: PathBuf,
}

impl ExternalPipeline {
    /// Returns the configured pipeline, if any.
    pub fn from_config(config: &Config) -> Option<Self> {
        config.external.as_ref().map(|external| Self {
            name: external.name.clone(),
            command: external.command.clone(),
            working_dir: config.root.clone(),
            output_dir: config.resolve(&external.source),
        })
    }

    fn error<S: Into<String>>(&self, message: S, code: Option<i32>) -> BlogFlowError {
        BlogFlowError::external_pipeline_error(self.name.clone(), message, code)
    }

    /// Runs the process to completion.
    ///
    /// Returns the output directory once the process has exited with
    /// status zero and the directory exists.
    pub fn run(&self) -> Result<PathBuf> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| self.error("no command configured", None))?;

        info!("Running {} ({})", self.name, self.command.join(" "));
        let mut command = Command::new(program);
        _ = command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if !self.working_dir.as_os_str().is_empty() {
            _ = command.current_dir(&self.working_dir);
        }

        let output = command
            .output()
            .map_err(|e| self.error(format!("could not start `{}`: {}", program, e), None))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!("[{}] {}", self.name, line);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let lines: Vec<&str> =
                stderr.lines().filter(|l| !l.trim().is_empty()).collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL)..].join("\n");
            let status = match output.status.code() {
                Some(code) => format!("exited with status {}", code),
                None => "was terminated by a signal".to_string(),
            };
            let message = if tail.is_empty() {
                status
            } else {
                format!("{}:\n{}", status, tail)
            };
            return Err(self.error(message, output.status.code()));
        }

        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            warn!("[{}] {}", self.name, line);
        }

        if !self.output_dir.is_dir() {
            return Err(self.error(
                format!(
                    "finished without producing {}",
                    self.output_dir.display()
                ),
                Some(0),
            ));
        }

        info!("{} finished", self.name);
        Ok(self.output_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ExternalConfig;
    use tempfile::TempDir;

    fn pipeline(root: &TempDir, script: &str) -> ExternalPipeline {
        let config = Config {
            root: root.path().to_path_buf(),
            external: Some(ExternalConfig {
                name: "assets".to_string(),
                command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
                source: PathBuf::from("dist"),
            }),
            ..Default::default()
        };
        ExternalPipeline::from_config(&config).unwrap()
    }

    #[test]
    fn test_no_external_configured() {
        assert!(ExternalPipeline::from_config(&Config::default()).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_run_returns_output_dir() {
        let root = TempDir::new().unwrap();
        let pipeline =
            pipeline(&root, "mkdir -p dist && echo built > dist/app.js");
        let output = pipeline.run().unwrap();
        assert_eq!(output, root.path().join("dist"));
        assert!(output.join("app.js").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_reports_code_and_stderr() {
        let root = TempDir::new().unwrap();
        let pipeline = pipeline(&root, "echo 'task failed' >&2; exit 3");
        match pipeline.run().unwrap_err() {
            BlogFlowError::ExternalPipelineError { name, message, code } => {
                assert_eq!(name, "assets");
                assert_eq!(code, Some(3));
                assert!(message.contains("task failed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_output_dir_is_an_error() {
        let root = TempDir::new().unwrap();
        let pipeline = pipeline(&root, "true");
        assert!(pipeline.run().is_err());
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let root = TempDir::new().unwrap();
        let mut pipeline = pipeline(&root, "");
        pipeline.command = vec!["blogflow-no-such-program".to_string()];
        match pipeline.run().unwrap_err() {
            BlogFlowError::ExternalPipelineError { code, .. } => {
                assert_eq!(code, None)
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
