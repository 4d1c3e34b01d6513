// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


// Remote client running commands through ssh

use super::shell_quote;
use crate::config::RemoteOptions;
use crate::error::{Result, StorageError};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info};

const SSH_PROGRAM: &str = "ssh";
const CONNECT_TIMEOUT_SECONDS: u32 = 10;

/// Client for one remote host
#[derive(Debug, Clone)]
pub struct RemoteClient {
    options: RemoteOptions,
}

impl RemoteClient {
    /// Client for `options` that has not talked to the host yet
    pub(crate) fn new(options: &RemoteOptions) -> Self {
        Self {
            options: options.clone(),
        }
    }

    /// Check that the host is reachable and accepts our credentials
    pub async fn connect(options: &RemoteOptions) -> Result<Self> {
        let client = Self::new(options);

        info!(
            "Connecting to {}:{}",
            options.destination(),
            options.port
        );
        client.output("true", &[]).await?;

        Ok(client)
    }

    pub fn options(&self) -> &RemoteOptions {
        &self.options
    }

    /// ssh options shared by every invocation, without the destination
    pub fn ssh_args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.options.port.to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", CONNECT_TIMEOUT_SECONDS),
        ];

        if !self.options.strict_host_key_checking {
            args.extend([
                "-o".to_string(),
                "StrictHostKeyChecking=no".to_string(),
                "-o".to_string(),
                "UserKnownHostsFile=/dev/null".to_string(),
                "-o".to_string(),
                "LogLevel=ERROR".to_string(),
            ]);
        }

        for key in &self.options.private_keys {
            args.push("-i".to_string());
            args.push(key.to_string_lossy().into_owned());
        }

        args
    }

    /// The ssh invocation as a single shell string, as rsync's `-e` expects
    pub fn ssh_command(&self) -> String {
        std::iter::once(SSH_PROGRAM.to_string())
            .chain(self.ssh_args().iter().map(|arg| shell_quote(arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run `program args...` on the remote host and return its stdout
    pub async fn output(&self, program: &str, args: &[&str]) -> Result<Vec<u8>> {
        let remote_command = std::iter::once(program)
            .chain(args.iter().copied())
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ");

        debug!("Running on {}: {}", self.options.host, remote_command);

        let mut command = Command::new(SSH_PROGRAM);
        command
            .args(self.ssh_args())
            .arg(self.options.destination())
            .arg("--")
            .arg(&remote_command);

        run(&mut command, &remote_command).await
    }

    /// Sorted names of the entries in a remote directory
    pub async fn read_dir(&self, path: &str) -> Result<Vec<String>> {
        let stdout = self.output("ls", &["-1A", path]).await?;
        let mut names: Vec<String> = String::from_utf8_lossy(&stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    pub async fn mkdir_all(&self, path: &str) -> Result<()> {
        self.output("mkdir", &["-p", path]).await?;
        Ok(())
    }
}

/// Run a local command, failing with its stderr when it exits non-zero
pub(crate) async fn run(command: &mut Command, description: &str) -> Result<Vec<u8>> {
    let Output {
        status,
        stdout,
        stderr,
    } = command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| StorageError::Remote(format!("Failed to run '{}': {}", description, e)))?;

    if !status.success() {
        return Err(StorageError::Remote(format!(
            "'{}' failed ({}): {}",
            description,
            status,
            String::from_utf8_lossy(&stderr).trim()
        )));
    }

    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn client(options: RemoteOptions) -> RemoteClient {
        RemoteClient::new(&options)
    }

    #[test]
    fn test_ssh_args() {
        let mut options = RemoteOptions::new("example.com", "root");
        options.port = 2222;
        options.private_keys = vec![PathBuf::from("/keys/id_ed25519")];

        let args = client(options).ssh_args();
        assert_eq!(&args[..2], &["-p", "2222"]);
        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
        assert!(args.ends_with(&["-i".to_string(), "/keys/id_ed25519".to_string()]));
    }

    #[test]
    fn test_strict_host_key_checking_keeps_defaults() {
        let mut options = RemoteOptions::new("example.com", "root");
        options.strict_host_key_checking = true;

        let args = client(options).ssh_args();
        assert!(!args.iter().any(|a| a.starts_with("StrictHostKeyChecking")));
    }

    #[test]
    fn test_ssh_command_quotes_key_paths() {
        let mut options = RemoteOptions::new("example.com", "root");
        options.private_keys = vec![PathBuf::from("/my keys/id")];

        let command = client(options).ssh_command();
        assert!(command.starts_with("ssh -p 22 "));
        assert!(command.ends_with("-i '/my keys/id'"));
    }

    #[tokio::test]
    async fn test_run_reports_failure() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo boom >&2; exit 3"]);

        let err = run(&mut command, "boom").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("boom"));
        assert!(matches!(err, StorageError::Remote(_)));
    }

    #[tokio::test]
    async fn test_run_returns_stdout() {
        let mut command = Command::new("sh");
        command.args(["-c", "printf hello"]);

        assert_eq!(run(&mut command, "hello").await.unwrap(), b"hello");
    }
}
