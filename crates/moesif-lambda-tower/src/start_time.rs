//! Process start time used when an event carries no request timestamp.
//!
//! The value is captured once, the first time the middleware is constructed
//! or an invocation needs it, and is constant for the life of the container.

use chrono::{DateTime, Utc};
use std::sync::LazyLock;

static PROCESS_START: LazyLock<DateTime<Utc>> = LazyLock::new(Utc::now);

/// Returns the time captured when this process first initialised the middleware.
///
/// # Example
///
/// ```
/// use moesif_lambda_tower::process_start_time;
///
/// let first = process_start_time();
/// assert_eq!(first, process_start_time());
/// ```
pub fn process_start_time() -> DateTime<Utc> {
    *PROCESS_START
}

/// Forces the start time to be captured now if it has not been yet.
pub(crate) fn init() {
    LazyLock::force(&PROCESS_START);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_time_is_stable() {
        init();
        let first = process_start_time();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert_eq!(first, process_start_time());
    }

    #[test]
    fn test_start_time_not_in_future() {
        assert!(process_start_time() <= Utc::now());
    }
}
