use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio_util::task::TaskTracker;

/// A scheduled network operation together with its completion continuation.
pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Runs scheduled operations and their completions on some event loop.
pub trait Executor: Send + Sync {
    fn spawn(&self, task: Task);
}

impl Executor for Handle {
    #[inline]
    fn spawn(&self, task: Task) {
        drop(Handle::spawn(self, task));
    }
}

/// Spawns onto an [`IoService`] runtime and keeps count of what is still
/// running so the service can wait for it.
#[derive(Debug, Clone)]
pub struct IoHandle {
    handle: Handle,
    tracker: TaskTracker,
}

impl IoHandle {
    /// Number of scheduled operations that have not completed yet.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}

impl Executor for IoHandle {
    #[inline]
    fn spawn(&self, task: Task) {
        drop(self.tracker.spawn_on(task, &self.handle));
    }
}

/// A multi-threaded event loop owned by the caller.
///
/// Dropping the service without [`IoService::close`] drops every operation
/// still in flight, so their pipelines never report back.
#[derive(Debug)]
pub struct IoService {
    runtime: Runtime,
    io: Arc<IoHandle>,
}

impl IoService {
    pub fn new(worker_threads: usize) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("httpget-io")
            .enable_all()
            .build()?;
        let io = Arc::new(IoHandle {
            handle: runtime.handle().clone(),
            tracker: TaskTracker::new(),
        });
        Ok(Self { runtime, io })
    }

    #[inline]
    pub fn handle(&self) -> &Arc<IoHandle> {
        &self.io
    }

    /// Blocks until every scheduled operation has completed, then stops the
    /// worker threads. Must not be called from inside an async context.
    pub fn close(self) {
        self.io.tracker.close();
        self.runtime.block_on(self.io.tracker.wait());
        log::debug!("io service stopped");
    }
}
