use std::fmt::Display;

/// Runs a step whose failure must not end the surrounding operation.
///
/// A failure is logged at warn level together with `action` and turned into `None`.
pub fn attempt<T, E: Display>(action: impl Display, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("{} failed, continuing: {}", action, e);
            None
        }
    }
}
