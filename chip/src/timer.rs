use {
    num_traits::{One, Unsigned, Zero},
    parking_lot::{Condvar, Mutex},
    std::{
        sync::Arc,
        thread::{self, JoinHandle},
        time::{Duration, Instant},
    },
};

/// Converts a frequency into the interval between two runs.
///
/// # Example
/// ```rust
/// # use chip::timer::interval;
/// # use std::time::Duration;
/// assert_eq!(interval(500), Duration::from_millis(2));
/// ```
pub fn interval(hertz: u64) -> Duration {
    Duration::from_nanos(1_000_000_000 / hertz.max(1))
}

/// Represents a timer inside of the chip infrastructure, it will count down to
/// zero from whatever number is given and stay there.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Countdown<T> {
    value: T,
}

impl<T> Countdown<T>
where
    T: Unsigned + Zero + One + Copy + PartialOrd,
{
    /// Will create a new timer with the given value.
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// Will set the value from which the timer shall count down from.
    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    /// Will get the value that the counter is currently at.
    pub fn get_value(&self) -> T {
        self.value
    }

    /// Counts down by one, returns `true` if this call moved the timer onto zero.
    pub fn decrement(&mut self) -> bool {
        if self.value > T::zero() {
            self.value = self.value - T::one();
            Zero::is_zero(&self.value)
        } else {
            false
        }
    }

    pub fn is_zero(&self) -> bool {
        Zero::is_zero(&self.value)
    }
}

/// A clonable cancellation flag, once cancelled it stays cancelled. Every
/// waiter is woken up on cancellation.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the shutdown.
    pub fn cancel(&self) {
        let (lock, condvar) = &*self.inner;
        let mut cancelled = lock.lock();
        if !*cancelled {
            log::debug!("shutdown requested");
            *cancelled = true;
        }
        condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Blocks until the token is cancelled.
    pub fn wait(&self) {
        let (lock, condvar) = &*self.inner;
        let mut cancelled = lock.lock();
        while !*cancelled {
            condvar.wait(&mut cancelled);
        }
    }

    /// Blocks for at most `timeout`, returns if the token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (lock, condvar) = &*self.inner;
        let mut cancelled = lock.lock();
        while !*cancelled {
            if condvar.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }
}

/// Runs a callback repeatedly at a fixed interval until its token is cancelled.
pub trait TimedWorker {
    /// Will initialize the new worker, it stops as soon as `token` is cancelled.
    fn new(token: ShutdownToken) -> Self;

    /// Will start the worker that will run the callback function
    /// every interval.
    fn start<T>(&mut self, callback: T, interval: Duration)
    where
        T: Send + FnMut() + 'static;

    /// Cancels the token and waits for the worker to finish.
    fn stop(&mut self);

    fn is_alive(&self) -> bool;
}

/// Is the internal worker, that exists on its own thread.
#[derive(Debug)]
pub struct Worker {
    /// Contains the actual thread, that is running.
    thread: Option<JoinHandle<()>>,
    /// Used to gracefully shutdown the thread.
    token: ShutdownToken,
    /// Counts the running threads, as the thread holds a clone while running.
    alive: Arc<()>,
}

impl TimedWorker for Worker {
    fn new(token: ShutdownToken) -> Self {
        Self {
            thread: None,
            token,
            alive: Arc::new(()),
        }
    }

    /// Attention the worker assumes the callback will finish
    /// faster than the interval, otherwise it runs back to back.
    fn start<T>(&mut self, mut callback: T, interval: Duration)
    where
        T: Send + FnMut() + 'static,
    {
        let token = self.token.clone();
        let alive = self.alive.clone();
        let thread = thread::spawn(move || {
            // only used for counting the references
            let _alive = alive;
            let mut timeout = interval;
            while !token.wait_timeout(timeout) {
                let start = Instant::now();

                callback();

                // make sure the system will at most wait the interval
                timeout = interval.saturating_sub(start.elapsed());
            }
        });

        self.thread = Some(thread);
    }

    fn stop(&mut self) {
        self.token.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("A worker thread panicked before shutting down.");
            }
        }
    }

    fn is_alive(&self) -> bool {
        Arc::strong_count(&self.alive) > 1
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
