//! Shared helpers for PTY integration tests

use sift_pty::{PtyManager, PtyStatus};
use std::time::{Duration, Instant};

/// Poll `check` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    check()
}

/// Wait until the session's buffer contains `needle`
pub fn wait_for_output(manager: &PtyManager, id: &str, needle: &str) -> bool {
    wait_until(Duration::from_secs(5), || {
        manager
            .read(id, 0, None)
            .map(|r| r.lines.iter().any(|l| l.contains(needle)))
            .unwrap_or(false)
    })
}

pub fn wait_for_status(manager: &PtyManager, id: &str, status: PtyStatus) -> bool {
    wait_until(Duration::from_secs(5), || {
        manager.get(id).map(|info| info.status) == Some(status)
    })
}
