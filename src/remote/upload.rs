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


// Directory upload to a remote host with rsync over ssh

use super::client::{run, RemoteClient};
use crate::config::RemoteOptions;
use crate::error::{Result, StorageError};
use std::path::Path;
use tokio::process::Command;
use tracing::info;

const RSYNC_PROGRAM: &str = "rsync";

/// Upload the contents of `local_dir` into `remote_dir` on the remote host
///
/// The remote directory is created if needed. On success its listing and
/// file contents match the local tree.
pub async fn upload(local_dir: &Path, options: &RemoteOptions, remote_dir: &str) -> Result<()> {
    let metadata = tokio::fs::metadata(local_dir)
        .await
        .map_err(StorageError::io(local_dir))?;
    if !metadata.is_dir() {
        return Err(StorageError::io(local_dir)(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a directory",
        )));
    }

    let client = RemoteClient::connect(options).await?;
    client.mkdir_all(remote_dir).await?;

    info!(
        "Uploading {} to {}:{}",
        local_dir.display(),
        options.destination(),
        remote_dir
    );

    let mut command = rsync_command(&client, local_dir, remote_dir);
    run(&mut command, RSYNC_PROGRAM).await?;

    info!("Upload to {}:{} complete", options.host, remote_dir);
    Ok(())
}

fn rsync_command(client: &RemoteClient, local_dir: &Path, remote_dir: &str) -> Command {
    let mut command = Command::new(RSYNC_PROGRAM);
    // Remote paths travel inside the rsync protocol, not through the remote shell
    command
        .arg("--archive")
        .arg("--compress")
        .arg("--protect-args")
        .arg("--rsh")
        .arg(client.ssh_command())
        .arg(rsync_source(local_dir))
        .arg(format!(
            "{}:{}",
            client.options().destination(),
            remote_dir
        ));
    command
}

/// A trailing slash makes rsync copy the directory's contents, not the directory
fn rsync_source(local_dir: &Path) -> String {
    let source = local_dir.to_string_lossy();
    if source.ends_with('/') {
        source.into_owned()
    } else {
        format!("{}/", source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rsync_source_has_trailing_slash() {
        assert_eq!(rsync_source(Path::new("/tmp/src")), "/tmp/src/");
        assert_eq!(rsync_source(Path::new("/tmp/src/")), "/tmp/src/");
    }

    #[test]
    fn test_rsync_command_protects_remote_path() {
        let client = RemoteClient::new(&RemoteOptions::new("example.com", "root"));
        let command = rsync_command(&client, Path::new("/tmp/src"), "/tmp/my dir");

        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"--protect-args".to_string()));
        assert_eq!(
            &args[args.len() - 2..],
            &["/tmp/src/".to_string(), "root@example.com:/tmp/my dir".to_string()]
        );
    }

    #[tokio::test]
    async fn test_upload_missing_local_dir_fails_before_connecting() {
        let dir = TempDir::new().unwrap();
        let options = RemoteOptions::new("unreachable.invalid", "root");

        let err = upload(&dir.path().join("missing"), &options, "/tmp/upload")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
