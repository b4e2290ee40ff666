//! Process supervisor
//!
//! Some conditions leave the process unable to continue safely: a disk
//! about to fill up, a broken invariant in a background task. Components
//! report them through a `SupervisorHandle`; the `Supervisor` receives the
//! first report and terminates the process.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

/// Exit code used when the process is terminated by the supervisor
pub const FATAL_EXIT_CODE: i32 = 1;

/// A condition the process cannot survive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalSignal {
    pub reason: String,
}

impl FatalSignal {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FatalSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// What the supervisor does with a fatal signal
pub trait Terminator: Send + Sync {
    fn terminate(&self, signal: &FatalSignal);
}

/// Exits the process
#[derive(Debug, Clone, Copy)]
pub struct ProcessExit {
    code: i32,
}

impl ProcessExit {
    pub fn new(code: i32) -> Self {
        Self { code }
    }
}

impl Default for ProcessExit {
    fn default() -> Self {
        Self::new(FATAL_EXIT_CODE)
    }
}

impl Terminator for ProcessExit {
    fn terminate(&self, _signal: &FatalSignal) {
        std::process::exit(self.code);
    }
}

/// Receives fatal signals
pub struct Supervisor {
    tx: mpsc::UnboundedSender<FatalSignal>,
    rx: mpsc::UnboundedReceiver<FatalSignal>,
}

impl Default for Supervisor {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle {
            tx: self.tx.clone(),
        }
    }

    /// Wait for the first fatal signal and hand it to `terminator`
    ///
    /// Returns the signal when the terminator returns (it does not for
    /// `ProcessExit`).
    pub async fn run(mut self, terminator: &dyn Terminator) -> FatalSignal {
        // the supervisor holds a sender itself, so the channel never closes
        let signal = match self.rx.recv().await {
            Some(signal) => signal,
            None => FatalSignal::new("supervisor channel closed"),
        };
        error!(reason = %signal.reason, "fatal condition, terminating");
        terminator.terminate(&signal);
        signal
    }

    #[cfg(test)]
    pub(crate) fn drain_pending(&mut self) -> Vec<FatalSignal> {
        let mut signals = Vec::new();
        while let Ok(signal) = self.rx.try_recv() {
            signals.push(signal);
        }
        signals
    }
}

/// Reports fatal conditions to the supervisor
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    tx: mpsc::UnboundedSender<FatalSignal>,
}

impl SupervisorHandle {
    pub fn crash(&self, reason: impl Into<String>) {
        let signal = FatalSignal::new(reason);
        if self.tx.send(signal).is_err() {
            error!("fatal condition reported after the supervisor stopped");
        }
    }

    /// Spawn a task whose panic is reported as a fatal condition
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_supervised<F>(&self, name: impl Into<String>, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let handle = self.clone();
        tokio::spawn(async move {
            if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                handle.crash(format!(
                    "task {} panicked: {}",
                    name,
                    panic_message(panic.as_ref())
                ));
            }
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records signals instead of exiting
    #[derive(Default)]
    struct Recorder {
        signals: Mutex<Vec<FatalSignal>>,
    }

    impl Terminator for Recorder {
        fn terminate(&self, signal: &FatalSignal) {
            self.signals.lock().push(signal.clone());
        }
    }

    #[tokio::test]
    async fn test_crash_reaches_terminator() {
        let supervisor = Supervisor::new();
        let handle = supervisor.handle();
        let recorder = Recorder::default();

        handle.crash("disk full");
        let signal = supervisor.run(&recorder).await;

        assert_eq!(signal, FatalSignal::new("disk full"));
        assert_eq!(*recorder.signals.lock(), vec![FatalSignal::new("disk full")]);
    }

    #[tokio::test]
    async fn test_first_signal_wins() {
        let supervisor = Supervisor::new();
        let handle = supervisor.handle();

        handle.crash("first");
        handle.crash("second");

        assert_eq!(supervisor.run(&Recorder::default()).await.reason, "first");
    }

    #[tokio::test]
    async fn test_task_panic_becomes_fatal_signal() {
        let supervisor = Supervisor::new();
        let handle = supervisor.handle();

        let task = handle.spawn_supervised("worker", async {
            panic!("invariant broken");
        });
        task.await.unwrap();

        let signal = supervisor.run(&Recorder::default()).await;
        assert_eq!(signal.reason, "task worker panicked: invariant broken");
    }

    #[tokio::test]
    async fn test_formatted_panic_message() {
        let supervisor = Supervisor::new();
        let handle = supervisor.handle();

        handle
            .spawn_supervised("worker", async {
                panic!("generation {} already registered", 7);
            })
            .await
            .unwrap();

        let signal = supervisor.run(&Recorder::default()).await;
        assert_eq!(signal.reason, "task worker panicked: generation 7 already registered");
    }

    #[tokio::test]
    async fn test_clean_task_sends_nothing() {
        let supervisor = Supervisor::new();
        let handle = supervisor.handle();

        handle.spawn_supervised("worker", async {}).await.unwrap();
        handle.crash("sentinel");

        assert_eq!(supervisor.run(&Recorder::default()).await.reason, "sentinel");
    }

    #[test]
    fn test_crash_after_supervisor_dropped_is_harmless() {
        let handle = Supervisor::new().handle();
        handle.crash("nobody listening");
    }
}
