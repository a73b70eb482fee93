//! Cooperative shutdown and periodic worker threads used by the simulation.
use log::{debug, info};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep between two shutdown checks.
const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// Shared cancellation flag handed to every long-running loop.
///
/// Cloning is cheap and every clone observes the same flag. Loops poll [`ShutdownToken::is_stopped`]
/// at iteration boundaries only, so a critical section is never abandoned half-way.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    stopped: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request every loop holding a clone of this token to exit.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Sleep for `interval` in short slices, returning early once shutdown is requested.
    ///
    /// # Returns
    /// `true` when the full interval elapsed, `false` when the token was stopped.
    pub fn sleep(&self, interval: Duration) -> bool {
        let deadline = Instant::now() + interval;
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SHUTDOWN_POLL));
        }
    }
}

/// Spawn a named thread that runs `body` every `interval` until `token` is stopped.
///
/// The body runs first, then the thread sleeps outside any lock the body may take. The token is
/// checked before every iteration and while sleeping.
pub fn spawn_periodic<F>(
    name: &str,
    interval: Duration,
    token: ShutdownToken,
    mut body: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnMut() + Send + 'static,
{
    let thread_name = name.to_string();
    thread::Builder::new().name(thread_name.clone()).spawn(move || {
        debug!("{thread_name} thread started ({interval:?} interval)");
        while !token.is_stopped() {
            body();
            if !token.sleep(interval) {
                break;
            }
        }
        info!("{thread_name} thread stopped");
    })
}
