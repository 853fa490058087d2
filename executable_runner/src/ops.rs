use crate::error::ExecutableRunnerError;
use crate::{ToolOutput, run_tool};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Trait for running external tools.
///
/// This trait abstracts tool execution to allow for different implementations,
/// including mocks for testing purposes.
#[async_trait::async_trait]
pub trait ToolRunnerOps: Send + Sync {
    /// Runs `program` with `args` and returns its captured output.
    ///
    /// # Arguments
    /// * `program` - Full path to the executable or a name on the system PATH
    /// * `args` - Arguments passed to the executable in order
    ///
    /// # Returns
    /// * `Ok(ToolOutput)` once the tool has exited, whatever its exit status
    /// * `Err(ExecutableRunnerError)` if the tool could not be started
    async fn run(&self, program: &Path, args: &[String])
    -> Result<ToolOutput, ExecutableRunnerError>;
}

/// Default implementation that spawns the real process.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultToolRunnerOps;

impl DefaultToolRunnerOps {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ToolRunnerOps for DefaultToolRunnerOps {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
    ) -> Result<ToolOutput, ExecutableRunnerError> {
        run_tool(program, args).await
    }
}

/// Represents a recorded call to a tool runner operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRunCall {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Mock implementation for testing tool runner operations.
///
/// Responses are returned in the order they were queued; when the queue is empty the mock
/// answers with an empty, successful output. Every call is recorded.
///
/// # Examples
///
/// ```
/// use executable_runner::ops::{MockToolRunnerOps, ToolRunnerOps};
/// use executable_runner::ToolOutput;
/// use std::path::Path;
///
/// #[async_std::main]
/// async fn main() {
///     let mock = MockToolRunnerOps::new();
///     mock.push_output(ToolOutput {
///         status_code: Some(0),
///         stdout: "done".to_string(),
///         stderr: String::new(),
///     });
///
///     let output = mock.run(Path::new("tool.exe"), &["-q".to_string()]).await.unwrap();
///     assert_eq!(output.stdout, "done");
///     assert_eq!(mock.total_calls(), 1);
///     assert_eq!(mock.run_calls()[0].args, vec!["-q"]);
/// }
/// ```
#[derive(Clone, Default)]
pub struct MockToolRunnerOps {
    responses: Arc<Mutex<VecDeque<Result<ToolOutput, ExecutableRunnerError>>>>,
    run_calls: Arc<Mutex<Vec<ToolRunCall>>>,
}

impl MockToolRunnerOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful run producing `output`.
    pub fn push_output(&self, output: ToolOutput) {
        self.responses.lock().unwrap().push_back(Ok(output));
    }

    /// Queues a run that exits with `status_code` and prints `stdout`.
    pub fn push_exit(&self, status_code: i32, stdout: impl Into<String>) {
        self.push_output(ToolOutput {
            status_code: Some(status_code),
            stdout: stdout.into(),
            stderr: String::new(),
        });
    }

    /// Queues a run that fails to start.
    pub fn push_failure(&self, error_msg: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(ExecutableRunnerError::IoError(error_msg.into())));
    }

    /// Returns all calls made to the `run` method.
    pub fn run_calls(&self) -> Vec<ToolRunCall> {
        self.run_calls.lock().unwrap().clone()
    }

    /// Returns the total number of run calls made.
    pub fn total_calls(&self) -> usize {
        self.run_calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ToolRunnerOps for MockToolRunnerOps {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
    ) -> Result<ToolOutput, ExecutableRunnerError> {
        self.run_calls.lock().unwrap().push(ToolRunCall {
            program: program.to_path_buf(),
            args: args.to_vec(),
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(ToolOutput {
                    status_code: Some(0),
                    ..Default::default()
                })
            })
    }
}
