// src/transform/command.rs

//! Transform that pipes each input through an external program.

use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{Artifact, Transform, TransformFuture, TransformInput};

/// Placeholder replaced by the quoted input path inside `cmd`.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Runs `cmd` through the platform shell for every input.
///
/// - The input bytes are written to the child's stdin.
/// - The child's stdout becomes the single output artifact, under the same
///   relative path as the input (use `rename` on the task to change it).
/// - A non-zero exit status is a failure; stderr becomes the message.
///
/// ```toml
/// transform = { kind = "command", cmd = "sass --stdin --style=expanded" }
/// ```
#[derive(Debug, Clone)]
pub struct CommandTransform {
    cmd: String,
    env: Vec<(String, String)>,
}

impl CommandTransform {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Build from the opaque `transform` options of a task.
    pub fn from_options(options: &toml::Table) -> Result<Self> {
        let cmd = options
            .get("cmd")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("command transform requires a non-empty `cmd` string"))?;

        let mut transform = Self::new(cmd);

        if let Some(env) = options.get("env") {
            let table = env
                .as_table()
                .ok_or_else(|| anyhow!("command transform `env` must be a table"))?;
            for (key, value) in table {
                let value = value
                    .as_str()
                    .ok_or_else(|| anyhow!("command transform env `{key}` must be a string"))?;
                transform = transform.with_env(key.clone(), value);
            }
        }

        for key in options.keys() {
            if key != "cmd" && key != "env" {
                warn!(option = %key, "ignoring unknown command transform option");
            }
        }

        Ok(transform)
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    fn render(&self, input: &TransformInput) -> String {
        self.cmd
            .replace(INPUT_PLACEHOLDER, &shell_quote(&input.path.to_string_lossy()))
    }

    async fn run(&self, input: &TransformInput) -> Result<Vec<Artifact>> {
        let rendered = self.render(input);
        debug!(cmd = %rendered, input = ?input.path, "running command transform");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&rendered);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&rendered);
            c
        };

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning `{rendered}`"))?;

        // Feed stdin from a separate task so a child that writes a lot of
        // output before reading all input cannot deadlock us.
        let writer = child.stdin.take().map(|mut stdin| {
            let contents = input.contents.clone();
            tokio::spawn(async move {
                // A child that exits without reading stdin yields EPIPE; its
                // exit status decides success, not the write.
                let _ = stdin.write_all(&contents).await;
            })
        });

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for `{rendered}`"))?;

        if let Some(writer) = writer {
            let _ = writer.await;
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                bail!("`{rendered}` exited with code {code}");
            }
            bail!("`{rendered}` exited with code {code}: {stderr}");
        }

        Ok(vec![Artifact::new(input.rel_path.clone(), output.stdout)])
    }
}

impl Transform for CommandTransform {
    fn kind(&self) -> &str {
        "command"
    }

    fn apply<'a>(&'a self, input: &'a TransformInput) -> TransformFuture<'a> {
        Box::pin(self.run(input))
    }
}

fn shell_quote(s: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", s.replace('"', "\\\""))
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn input(contents: &str) -> TransformInput {
        TransformInput {
            path: PathBuf::from("/tmp/it's here/main.js"),
            rel_path: PathBuf::from("main.js"),
            contents: contents.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn stdout_becomes_the_artifact() {
        let t = CommandTransform::new("tr a-z A-Z");
        let out = t.apply(&input("let x = 1;")).await.unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rel_path, PathBuf::from("main.js"));
        assert_eq!(out[0].contents, b"LET X = 1;".to_vec());
    }

    #[tokio::test]
    async fn non_zero_exit_reports_stderr() {
        let t = CommandTransform::new("echo 'unexpected token' >&2; exit 3");
        let err = t.apply(&input("")).await.unwrap_err().to_string();

        assert!(err.contains("code 3"), "{err}");
        assert!(err.contains("unexpected token"), "{err}");
    }

    #[tokio::test]
    async fn input_placeholder_is_quoted() {
        let t = CommandTransform::new("printf '%s' {input}");
        let out = t.apply(&input("")).await.unwrap();

        assert_eq!(out[0].contents, b"/tmp/it's here/main.js".to_vec());
    }

    #[tokio::test]
    async fn env_is_passed_through() {
        let mut options = toml::Table::new();
        options.insert("cmd".into(), toml::Value::String("printf '%s' \"$MODE\"".into()));
        let mut env = toml::Table::new();
        env.insert("MODE".into(), toml::Value::String("production".into()));
        options.insert("env".into(), toml::Value::Table(env));

        let t = CommandTransform::from_options(&options).unwrap();
        let out = t.apply(&input("")).await.unwrap();

        assert_eq!(out[0].contents, b"production".to_vec());
    }

    #[test]
    fn missing_cmd_is_rejected() {
        assert!(CommandTransform::from_options(&toml::Table::new()).is_err());
    }
}
