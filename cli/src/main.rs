use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use async_std::task;
use clap::{Parser, Subcommand};
use service::{
    cache_clearing::CacheClearingService,
    error::Error,
    forced_deletion::ForcedDeletionService,
    settings::{RetryPolicy, Settings},
    settings_service::SettingsService,
};

mod commands;
mod logging;

#[derive(Parser, Debug)]
#[command(name = "purgekit", version, about = "Forced deletion and maintenance toolkit")]
struct Cli {
    /// Settings file to use instead of the one in the configuration directory
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete files or directory trees, terminating lockers and resetting permissions as needed
    Delete {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Give up after this many attempts per path
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max_attempts: Option<u32>,

        /// Give up on a path after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// List the processes holding handles beneath a path
    Locks {
        path: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Take ownership of a tree and reset its permissions
    ResetAcl {
        path: PathBuf,

        /// Account or group to grant ownership and full control (defaults to the configured one)
        #[arg(long)]
        principal: Option<String>,
    },
    /// Empty cache directories, keeping the directories themselves
    ClearCache {
        /// Directories to empty (defaults to the configured cache directories)
        dirs: Vec<PathBuf>,
    },
    /// Create a directory and its parents when missing
    EnsureDir { path: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = logging::init_logging();

    match task::block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn load_settings(path: Option<PathBuf>) -> Result<Settings, Error> {
    let settings_service = match path {
        Some(path) => SettingsService::new(path),
        None => SettingsService::from_default_location()?,
    };
    settings_service.load_settings().await
}

fn retry_policy(
    settings: &Settings,
    max_attempts: Option<u32>,
    timeout_secs: Option<u64>,
) -> RetryPolicy {
    let mut deletion = settings.deletion.clone();
    if max_attempts.is_some() {
        deletion.max_attempts = max_attempts;
    }
    if timeout_secs.is_some() {
        deletion.timeout_secs = timeout_secs;
    }
    deletion.retry_policy()
}

async fn run(cli: Cli) -> Result<ExitCode, Error> {
    let settings = load_settings(cli.settings).await?;
    let cwd = std::env::current_dir()?;
    let deletion_service = Arc::new(ForcedDeletionService::new(
        Arc::new(settings.deletion.clone()),
        &settings.tools,
    ));
    let ops = deletion_service.ops().clone();
    let mut stdout = std::io::stdout();

    match cli.command {
        Command::Delete {
            paths,
            max_attempts,
            timeout_secs,
        } => {
            let targets = commands::resolve_targets(&paths, &cwd)?;
            let policy = retry_policy(&settings, max_attempts, timeout_secs);
            let failures =
                commands::delete_targets(&deletion_service, &targets, policy, &mut stdout)
                    .await?;
            Ok(exit_code(failures == 0))
        }
        Command::Locks { path, json } => {
            let target = commands::resolve_targets(&[path], &cwd)?.remove(0);
            commands::list_locks(ops.lock_resolver.as_ref(), &target, json, &mut stdout).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::ResetAcl { path, principal } => {
            let target = commands::resolve_targets(&[path], &cwd)?.remove(0);
            let principal = principal.unwrap_or_else(|| settings.deletion.acl_principal.clone());
            commands::reset_acl(
                ops.access_resetter.as_ref(),
                &target,
                &principal,
                &mut stdout,
            )
            .await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::ClearCache { dirs } => {
            let dirs = if dirs.is_empty() {
                settings.cache_dirs.clone()
            } else {
                dirs
            };
            let targets = commands::resolve_targets(&dirs, &cwd)?;
            let cache_service = CacheClearingService::new(deletion_service);
            let report = commands::clear_caches(&cache_service, &targets, &mut stdout).await?;
            Ok(exit_code(report.is_success()))
        }
        Command::EnsureDir { path } => {
            let target = commands::resolve_targets(&[path], &cwd)?.remove(0);
            commands::ensure_dir(ops.fs_ops.as_ref(), &target, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
