use std::io;
use std::sync::Arc;

use crate::executor::{Executor, IoService};
use crate::pipeline::RequestPipeline;

/// Creates request pipelines bound to one executor.
///
/// [`Client::new`] owns its event loop; [`Client::with_executor`] schedules
/// onto an executor the caller already runs.
pub struct Client {
    executor: Arc<dyn Executor>,
    service: Option<IoService>,
}

impl Client {
    /// A client with its own single worker thread.
    #[inline]
    pub fn new() -> io::Result<Self> {
        Self::with_workers(1)
    }

    pub fn with_workers(worker_threads: usize) -> io::Result<Self> {
        let service = IoService::new(worker_threads)?;
        let executor: Arc<dyn Executor> = service.handle().clone();
        Ok(Self {
            executor,
            service: Some(service),
        })
    }

    #[inline]
    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            service: None,
        }
    }

    /// Number of operations still running on the owned event loop, or `None`
    /// for a client built on an external executor.
    #[inline]
    pub fn in_flight(&self) -> Option<usize> {
        self.service.as_ref().map(|service| service.handle().in_flight())
    }

    #[inline]
    pub fn create_request(&self, id: u64) -> Arc<RequestPipeline> {
        Arc::new(RequestPipeline::new(id, Arc::clone(&self.executor)))
    }

    /// Waits for every started pipeline to finish and stops the owned event
    /// loop. Nothing to wait for with an external executor.
    pub fn close(self) {
        if let Some(service) = self.service {
            service.close();
        }
    }
}
