//! Discovery and termination of processes that keep files open.
//!
//! - [`resolver`] asks the handle enumeration tool which processes hold handles beneath a path
//! - [`inspector`] fills in executable path and command line of those processes
//! - [`killer`] terminates processes by executable name or PID

pub mod error;
pub mod inspector;
pub mod killer;
pub mod parser;
pub mod resolver;

pub use error::{KillError, LockResolverError};
pub use inspector::{ProcessDetails, ProcessInspector, SysinfoProcessInspector};
pub use killer::{ProcessKiller, SysinfoProcessKiller};
pub use resolver::{HANDLE_TOOL, HandleLockResolver, ProcessLockResolver};
