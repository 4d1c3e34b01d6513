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


use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use storage_sync::config::{apply_env_overrides, load_config_with_env, AppConfig, RemoteOptions};
use storage_sync::storage::{spawn_list_recursive, spawn_match_filenames, BackendFactory};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// storage-sync - Move files between local disk, S3, GCS and remote hosts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults are used when it does not exist)
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List files under a path
    Ls {
        /// Storage URL (e.g. /data, file:///data, s3://bucket/root, gs://bucket/root)
        storage: String,
        #[arg(default_value = "")]
        path: String,
        /// Walk the whole subtree
        #[arg(short, long)]
        recursive: bool,
        /// Only show files with this base name (implies --recursive)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Print an object to stdout
    Cat { storage: String, path: String },
    /// Store a local file as an object
    Put {
        storage: String,
        path: String,
        file: PathBuf,
    },
    /// Upload a local directory
    PutDir {
        storage: String,
        local_dir: PathBuf,
        #[arg(default_value = "")]
        path: String,
    },
    /// Download a directory
    GetDir {
        storage: String,
        path: String,
        local_dir: PathBuf,
    },
    /// Delete an object or subtree
    Rm { storage: String, path: String },
    /// Check whether the storage root exists
    Exists { storage: String },
    /// Print the environment a child process needs to reach the storage
    Env { storage: String },
    /// Upload a local directory to a remote host over ssh
    Upload {
        local_dir: PathBuf,
        remote_dir: String,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(short, long)]
        user: Option<String>,
        /// Private key file, may be repeated
        #[arg(short = 'i', long = "key")]
        keys: Vec<PathBuf>,
    },
}

fn load(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        return load_config_with_env(path);
    }
    let mut config = AppConfig::default();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn remote_options(
    config: Option<RemoteOptions>,
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    keys: Vec<PathBuf>,
) -> Result<RemoteOptions> {
    let mut options = match (config, &host, &user) {
        (Some(options), _, _) => options,
        (None, Some(host), Some(user)) => RemoteOptions::new(host.clone(), user.clone()),
        _ => bail!("--host and --user are required when no remote is configured"),
    };

    if let Some(host) = host {
        options.host = host;
    }
    if let Some(user) = user {
        options.username = user;
    }
    if let Some(port) = port {
        options.port = port;
    }
    if !keys.is_empty() {
        options.private_keys = keys;
    }

    Ok(options)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load(&args.config)?;
    init_tracing(&config.logging.level)?;

    info!("Loaded configuration from: {:?}", args.config);

    match args.command {
        Commands::Ls {
            storage,
            path,
            recursive,
            name,
        } => {
            let backend = BackendFactory::for_url(&storage, &config.storage)?;
            let capacity = config.storage.list_queue_capacity;

            if !recursive && name.is_none() {
                for entry in backend.list(&path).await? {
                    println!("{}", entry);
                }
                return Ok(());
            }

            let mut receiver = match name {
                Some(name) => spawn_match_filenames(backend, path, name, capacity),
                None => spawn_list_recursive(backend, path, capacity),
            };

            let mut failures = 0;
            while let Some(result) = receiver.recv().await {
                match result.error {
                    None => println!("{}", result.path),
                    Some(err) => {
                        eprintln!("{}: {}", result.path, err);
                        failures += 1;
                    }
                }
            }
            if failures > 0 {
                bail!("{} entries could not be listed", failures);
            }
        }

        Commands::Cat { storage, path } => {
            let backend = BackendFactory::for_url(&storage, &config.storage)?;
            let data = backend.get(&path).await?;
            std::io::stdout().write_all(&data)?;
        }

        Commands::Put {
            storage,
            path,
            file,
        } => {
            let backend = BackendFactory::for_url(&storage, &config.storage)?;
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            backend.put(&path, &data).await?;
        }

        Commands::PutDir {
            storage,
            local_dir,
            path,
        } => {
            let backend = BackendFactory::for_url(&storage, &config.storage)?;
            backend.put_directory(&local_dir, &path).await?;
        }

        Commands::GetDir {
            storage,
            path,
            local_dir,
        } => {
            let backend = BackendFactory::for_url(&storage, &config.storage)?;
            backend.get_directory(&path, &local_dir).await?;
        }

        Commands::Rm { storage, path } => {
            let backend = BackendFactory::for_url(&storage, &config.storage)?;
            backend.delete(&path).await?;
        }

        Commands::Exists { storage } => {
            let backend = BackendFactory::for_url(&storage, &config.storage)?;
            let exists = backend.root_exists().await?;
            println!("{}", exists);
            if !exists {
                std::process::exit(1);
            }
        }

        Commands::Env { storage } => {
            let backend = BackendFactory::for_url(&storage, &config.storage)?;
            for entry in backend.prepare_run_env()? {
                println!("{}", entry);
            }
        }

        Commands::Upload {
            local_dir,
            remote_dir,
            host,
            port,
            user,
            keys,
        } => {
            let options = remote_options(config.remote.clone(), host, port, user, keys)?;
            storage_sync::upload(&local_dir, &options, &remote_dir).await?;
        }
    }

    Ok(())
}
