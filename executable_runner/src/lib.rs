use async_process::Command;
use std::path::{Path, PathBuf};

use error::ExecutableRunnerError;

pub mod error;
pub mod ops;

/// Captured result of a finished external tool.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }

    /// Non-empty lines of stdout followed by stderr.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
    }
}

/// An external tool looked up by one of several file names.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    /// Name used in logs and errors.
    pub name: &'static str,
    /// File names tried in order in every searched directory.
    pub file_names: &'static [&'static str],
}

/// Runs the given executable with arguments and waits for it to finish.
///
/// # arguments
/// * `program`: full path to the executable, or a name found on the system path.
/// * `args`: arguments passed as-is, in order.
///
/// # returns
/// * `Result<ToolOutput, ExecutableRunnerError>`: captured exit status and output. A nonzero exit
///   status is not an error at this level, callers decide what it means.
///
/// # errors
/// * `ExecutableRunnerError::IoError`: if the process could not be spawned.
pub async fn run_tool(program: &Path, args: &[String]) -> Result<ToolOutput, ExecutableRunnerError> {
    tracing::debug!("Running {} {:?}", program.display(), args);

    let mut command = Command::new(program);
    command.args(args);
    hide_console_window(&mut command);

    let output = command.output().await.map_err(|e| {
        ExecutableRunnerError::IoError(format!("Failed to run {}: {}", program.display(), e))
    })?;

    let tool_output = ToolOutput {
        status_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    tracing::debug!(
        "{} exited with {:?}",
        program.display(),
        tool_output.status_code
    );
    Ok(tool_output)
}

#[cfg(windows)]
fn hide_console_window(command: &mut Command) {
    use async_process::windows::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x08000000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_command: &mut Command) {}

/// Finds an external tool.
///
/// The explicitly configured path wins when it points to an existing file. Otherwise every
/// directory in `search_dirs` and then every `PATH` entry is tried with each of the tool's
/// file names.
///
/// # errors
/// * `ExecutableRunnerError::ToolUnavailable`: if no candidate exists.
pub fn locate_tool(
    tool: &ToolSpec,
    configured: Option<&Path>,
    search_dirs: &[PathBuf],
) -> Result<PathBuf, ExecutableRunnerError> {
    let path_dirs: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect())
        .unwrap_or_default();
    locate_tool_in(tool, configured, search_dirs.iter().chain(path_dirs.iter()))
}

fn locate_tool_in<'a>(
    tool: &ToolSpec,
    configured: Option<&Path>,
    dirs: impl Iterator<Item = &'a PathBuf>,
) -> Result<PathBuf, ExecutableRunnerError> {
    let mut searched = Vec::new();

    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(
            "Configured path {} for {} does not exist, searching instead",
            path.display(),
            tool.name
        );
        searched.push(path.display().to_string());
    }

    for dir in dirs {
        for file_name in tool.file_names {
            let candidate = dir.join(file_name);
            if candidate.is_file() {
                tracing::debug!("Found {} at {}", tool.name, candidate.display());
                return Ok(candidate);
            }
        }
        searched.push(dir.display().to_string());
    }

    Err(ExecutableRunnerError::ToolUnavailable {
        tool: tool.name.to_string(),
        searched: searched.join(", "),
    })
}
