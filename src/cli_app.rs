//! Top-level CLI definition and dispatch.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use thiserror::Error;

use archive_rotate::core::config::{Config, Overrides, RotationConfig};
use archive_rotate::core::errors::RotateError;
use archive_rotate::core::status::ExitStatus;
use archive_rotate::logger::trace::RenderFormat;
use archive_rotate::platform::pal::{Platform, detect_platform};
use archive_rotate::rotation::engine::RotationEngine;

/// Keeps a backup volume above a free-space threshold by removing the
/// oldest-named entries of a directory.
#[derive(Debug, Parser)]
#[command(
    name = "archive-rotate",
    author,
    version,
    about = "Archive Rotate - free-space guard for backup directories",
    long_about = None
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// [required] Location where backup files/folders are stored.
    #[arg(short = 'p', long = "path", value_name = "DIR")]
    path: Option<PathBuf>,
    /// [required] Minimum required disk space in bytes.
    #[arg(
        short = 'm',
        long = "min-disk-space",
        value_name = "BYTES",
        conflicts_with = "eval_min_disk_space"
    )]
    min_disk_space: Option<u64>,
    /// Expression which evaluates to the minimum required disk space in bytes, e.g. "30 * 10 ** 9".
    #[arg(short = 'e', long = "eval-min-disk-space", value_name = "EXPR")]
    eval_min_disk_space: Option<String>,
    /// Maximum number of files/folders to remove per run [default: 1].
    #[arg(short = 'n', long = "max-files-to-remove", value_name = "N")]
    max_files_to_remove: Option<u64>,
    /// Minimum length of any removed path, as a defense against misconfiguration [default: 2].
    #[arg(short = 'd', long = "min-path-length", value_name = "N")]
    min_path_length: Option<usize>,
    /// Write directory content to the log before and after rotation.
    #[arg(short = 'l', long = "log-directory-content")]
    log_directory_content: bool,
    /// Print the run log as JSON lines.
    #[arg(long)]
    json: bool,
}

/// CLI error type with explicit exit-status mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be assembled.
    #[error("{0}")]
    Config(#[from] RotateError),
    /// No usable platform backend.
    #[error("{0}")]
    Platform(RotateError),
}

impl CliError {
    /// Process exit status contract for pre-run failures.
    pub const fn status(&self) -> ExitStatus {
        match self {
            Self::Config(RotateError::MissingParameters { .. }) => {
                ExitStatus::LackOfRequiredParameters
            }
            Self::Config(_) => ExitStatus::InvalidParameters,
            Self::Platform(_) => ExitStatus::FilesystemFailure,
        }
    }
}

/// Everything needed to start the engine.
struct Prepared {
    config: RotationConfig,
    format: RenderFormat,
    platform: Arc<dyn Platform>,
}

/// Run one rotation and print its log when warranted.
///
/// Nothing touches the target directory until configuration resolved.
pub fn run(cli: &Cli) -> ExitStatus {
    let prepared = match prepare(cli) {
        Ok(prepared) => prepared,
        Err(err) => {
            report_usage_error(&err);
            return err.status();
        }
    };

    let outcome = RotationEngine::new(prepared.config, prepared.platform).execute();
    if outcome.should_print() {
        match outcome.trace.render(prepared.format) {
            Ok(text) => {
                let mut stdout = io::stdout().lock();
                if let Err(err) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
                    eprintln!("archive-rotate: failed to write log: {err}");
                }
            }
            Err(err) => eprintln!("archive-rotate: failed to render log: {err}"),
        }
    }
    outcome.status
}

fn prepare(cli: &Cli) -> Result<Prepared, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(overrides(cli))?;
    let rotation = config.resolve()?;
    let format = if config.output.json {
        RenderFormat::JsonLines
    } else {
        RenderFormat::Human
    };
    let platform = detect_platform().map_err(CliError::Platform)?;
    Ok(Prepared {
        config: rotation,
        format,
        platform,
    })
}

fn overrides(cli: &Cli) -> Overrides {
    Overrides {
        path: cli.path.clone(),
        min_free_bytes: cli.min_disk_space,
        min_free_expr: cli.eval_min_disk_space.clone(),
        max_removals: cli.max_files_to_remove,
        min_path_length: cli.min_path_length,
        log_directory_contents: cli.log_directory_content,
        json: cli.json,
    }
}

fn report_usage_error(err: &CliError) {
    eprintln!("archive-rotate: {err}");
    if err.status() == ExitStatus::LackOfRequiredParameters {
        eprintln!();
        eprintln!("{}", Cli::command().render_help());
    }
}
