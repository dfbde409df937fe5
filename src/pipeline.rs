//! The GET request state machine.
//!
//! A pipeline walks `Resolving → Connecting → Sending → ReadingStatusLine →
//! ReadingHeaders → ReadingBody` with exactly one network operation in flight
//! at a time. Each operation runs as a task on the pipeline's [`Executor`] and,
//! once it completes, calls back into the pipeline, which decides the next
//! stage. Every path ends in `Finished`, where the handler is
//! invoked exactly once.
//!
//! The data a stage hands to the next one (the connection, the encoded
//! request, the response buffer) lives in an `Exchange` that moves from one
//! operation to the next, so it is never shared. The only state touched from
//! several threads is the cancellation state, which sits behind its own lock.
//!
//! There is no timeout; callers bound a request by calling
//! [`RequestPipeline::cancel`] after their own deadline.

use std::fmt::{Debug, Formatter};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::AsyncWriteExt as _;
use tokio::net::{lookup_host, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::executor::Executor;
use crate::http::{Error, Outcome, Request, Response, ResponseBuffer, Result};

pub const DEFAULT_PORT: u16 = 80;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Stage {
    Idle,
    Resolving,
    Connecting,
    Sending,
    ReadingStatusLine,
    ReadingHeaders,
    ReadingBody,
    Finished,
}

impl Stage {
    /// The network operation outstanding while the pipeline is in this stage.
    #[inline]
    pub fn operation(self) -> Option<&'static str> {
        match self {
            Self::Resolving => Some("resolve"),
            Self::Connecting => Some("connect"),
            Self::Sending => Some("write"),
            Self::ReadingStatusLine | Self::ReadingHeaders => Some("read-until"),
            Self::ReadingBody => Some("read-to-end"),
            Self::Idle | Self::Finished => None,
        }
    }
}

/// Receives the result of a pipeline.
///
/// Implemented for any `Fn(&RequestPipeline, &Response, &Outcome)` closure.
pub trait Handler: Send + Sync {
    fn call(&self, pipeline: &RequestPipeline, response: &Response, outcome: &Outcome);
}

impl<F> Handler for F
where
    F: Fn(&RequestPipeline, &Response, &Outcome) + Send + Sync,
{
    #[inline]
    fn call(&self, pipeline: &RequestPipeline, response: &Response, outcome: &Outcome) {
        self(pipeline, response, outcome);
    }
}

struct Settings {
    host: String,
    port: u16,
    path: String,
    handler: Option<Arc<dyn Handler>>,
}

#[derive(Default)]
struct CancelState {
    requested: bool,
    connection_open: bool,
}

pub struct RequestPipeline {
    id: u64,
    executor: Arc<dyn Executor>,
    settings: Mutex<Settings>,
    stage: Mutex<Stage>,
    cancel: Mutex<CancelState>,
    resolver: CancellationToken,
    connection: CancellationToken,
}

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State owned by whichever operation is currently in flight.
struct Exchange {
    host: String,
    port: u16,
    path: String,
    handler: Arc<dyn Handler>,
    endpoints: Vec<SocketAddr>,
    stream: Option<TcpStream>,
    request: Vec<u8>,
    buffer: ResponseBuffer,
}

impl Exchange {
    async fn perform(&mut self, stage: Stage) -> Result<()> {
        match stage {
            Stage::Resolving => self.resolve().await,
            Stage::Connecting => self.connect().await,
            Stage::Sending => self.send().await,
            Stage::ReadingStatusLine => {
                let stream = self.stream.as_mut().ok_or_else(not_connected).map_err(Error::Read)?;
                self.buffer.read_status_line(stream).await.map_err(Error::Read)?;
                Ok(())
            }
            Stage::ReadingHeaders => {
                let stream = self.stream.as_mut().ok_or_else(not_connected).map_err(Error::Read)?;
                self.buffer.read_header_block(stream).await.map_err(Error::Read)?;
                Ok(())
            }
            Stage::ReadingBody => {
                let stream = self.stream.as_mut().ok_or_else(not_connected).map_err(Error::Read)?;
                self.buffer.read_body(stream).await.map_err(Error::Read)
            }
            Stage::Idle | Stage::Finished => Ok(()),
        }
    }

    async fn resolve(&mut self) -> Result<()> {
        let endpoints: Vec<SocketAddr> = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(Error::Resolve)?
            .collect();
        if endpoints.is_empty() {
            return Err(Error::Resolve(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for {}", self.host),
            )));
        }
        log::debug!("{} resolved to {:?}", self.host, endpoints);
        self.endpoints = endpoints;
        Ok(())
    }

    /// Tries each resolved endpoint in order and keeps the first that accepts.
    async fn connect(&mut self) -> Result<()> {
        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no endpoints to connect to");
        for &endpoint in &self.endpoints {
            match TcpStream::connect(endpoint).await {
                Ok(stream) => {
                    log::debug!("connected to {endpoint}");
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(error) => {
                    log::debug!("connecting to {endpoint} failed: {error}");
                    last_error = error;
                }
            }
        }
        Err(Error::Connect(last_error))
    }

    /// Writes the request and half-closes the write side.
    async fn send(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().ok_or_else(not_connected).map_err(Error::Write)?;
        stream.write_all(&self.request).await.map_err(Error::Write)?;
        stream.shutdown().await.map_err(Error::Write)
    }
}

fn not_connected() -> io::Error {
    io::ErrorKind::NotConnected.into()
}

impl RequestPipeline {
    #[inline]
    pub(crate) fn new(id: u64, executor: Arc<dyn Executor>) -> Self {
        Self {
            id,
            executor,
            settings: Mutex::new(Settings {
                host: String::new(),
                port: DEFAULT_PORT,
                path: String::new(),
                handler: None,
            }),
            stage: Mutex::new(Stage::Idle),
            cancel: Mutex::new(CancelState::default()),
            resolver: CancellationToken::new(),
            connection: CancellationToken::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn host(&self) -> String {
        lock(&self.settings).host.clone()
    }

    #[inline]
    pub fn port(&self) -> u16 {
        lock(&self.settings).port
    }

    #[inline]
    pub fn path(&self) -> String {
        lock(&self.settings).path.clone()
    }

    #[inline]
    pub fn set_host(&self, host: impl Into<String>) {
        lock(&self.settings).host = host.into();
    }

    #[inline]
    pub fn set_port(&self, port: u16) {
        lock(&self.settings).port = port;
    }

    #[inline]
    pub fn set_path(&self, path: impl Into<String>) {
        lock(&self.settings).path = path.into();
    }

    #[inline]
    pub fn set_handler(&self, handler: impl Handler + 'static) {
        lock(&self.settings).handler = Some(Arc::new(handler));
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        *lock(&self.stage)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        lock(&self.cancel).requested
    }

    /// Starts the request. The handler fires exactly once afterwards.
    ///
    /// # Panics
    ///
    /// If host, path or handler is unset, if the port is zero, or if the
    /// pipeline was already started.
    pub fn start(self: &Arc<Self>) {
        let exchange = {
            let settings = lock(&self.settings);
            assert!(settings.port > 0, "port must be non-zero");
            assert!(!settings.host.is_empty(), "host must be set before start");
            assert!(!settings.path.is_empty(), "path must be set before start");
            let Some(handler) = settings.handler.clone() else {
                panic!("handler must be set before start");
            };
            Exchange {
                host: settings.host.clone(),
                port: settings.port,
                path: settings.path.clone(),
                handler,
                endpoints: Vec::new(),
                stream: None,
                request: Vec::new(),
                buffer: ResponseBuffer::new(),
            }
        };
        {
            let mut stage = lock(&self.stage);
            assert_eq!(*stage, Stage::Idle, "request #{} was already started", self.id);
            *stage = Stage::Resolving;
        }

        let cancel = lock(&self.cancel);
        if cancel.requested {
            drop(cancel);
            return self.finish(exchange, Err(Error::Aborted));
        }
        drop(cancel);
        self.schedule(Stage::Resolving, exchange);
    }

    /// Requests that the pipeline stop. Safe from any thread at any time;
    /// calls after the first, or after the pipeline finished, change nothing.
    ///
    /// An operation that already completed still gets processed, but its
    /// successor is never scheduled.
    pub fn cancel(&self) {
        let mut state = lock(&self.cancel);
        if !state.requested {
            log::debug!("request #{} cancelled", self.id);
        }
        state.requested = true;
        self.resolver.cancel();
        if state.connection_open {
            self.connection.cancel();
        }
    }

    #[inline]
    fn enter(&self, stage: Stage) {
        *lock(&self.stage) = stage;
        log::trace!("request #{} entered {:?}", self.id, stage);
    }

    fn schedule(self: &Arc<Self>, stage: Stage, mut exchange: Exchange) {
        self.enter(stage);
        let token = match stage {
            Stage::Resolving => self.resolver.clone(),
            _ => self.connection.clone(),
        };
        let pipeline = Arc::clone(self);
        self.executor.spawn(Box::pin(async move {
            let result = tokio::select! {
                biased;
                () = token.cancelled() => Err(Error::Aborted),
                result = exchange.perform(stage) => result,
            };
            pipeline.complete(stage, exchange, result);
        }));
    }

    fn complete(self: Arc<Self>, stage: Stage, mut exchange: Exchange, result: Result<()>) {
        log::trace!(
            "request #{} {} completed: {}",
            self.id,
            stage.operation().unwrap_or("none"),
            if result.is_ok() { "ok" } else { "error" }
        );
        if let Err(error) = result {
            return self.finish(exchange, Err(error));
        }
        // end of stream was the last thing to wait for
        if stage == Stage::ReadingBody {
            return self.finish(exchange, Ok(()));
        }

        let mut cancel = lock(&self.cancel);
        if cancel.requested {
            drop(cancel);
            return self.finish(exchange, Err(Error::Aborted));
        }
        let next = match stage {
            Stage::Resolving => {
                cancel.connection_open = true;
                Stage::Connecting
            }
            Stage::Connecting => {
                exchange.request = Request::get(&exchange.host, &exchange.path).to_bytes();
                Stage::Sending
            }
            Stage::Sending => Stage::ReadingStatusLine,
            Stage::ReadingStatusLine => match exchange.buffer.parse_status_line() {
                Ok(()) => Stage::ReadingHeaders,
                Err(error) => {
                    drop(cancel);
                    return self.finish(exchange, Err(error));
                }
            },
            Stage::ReadingHeaders => {
                exchange.buffer.parse_headers();
                Stage::ReadingBody
            }
            Stage::Idle | Stage::ReadingBody | Stage::Finished => Stage::Finished,
        };
        drop(cancel);

        if next == Stage::Finished {
            return self.finish(exchange, Ok(()));
        }
        self.schedule(next, exchange);
    }

    fn finish(&self, mut exchange: Exchange, outcome: Outcome) {
        self.enter(Stage::Finished);
        drop(exchange.stream.take());

        match &outcome {
            Ok(()) => log::debug!(
                "request #{} to {}:{}{} completed",
                self.id,
                exchange.host,
                exchange.port,
                exchange.path
            ),
            Err(error) => log::warn!(
                "request #{} to {}:{}{} failed ({}): {}",
                self.id,
                exchange.host,
                exchange.port,
                exchange.path,
                error.kind(),
                error
            ),
        }

        let response = exchange.buffer.into_response();
        exchange.handler.call(self, &response, &outcome);
    }
}

impl Debug for RequestPipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let settings = lock(&self.settings);
        f.debug_struct("RequestPipeline")
            .field("id", &self.id)
            .field("host", &settings.host)
            .field("port", &settings.port)
            .field("path", &settings.path)
            .field("stage", &self.stage())
            .finish_non_exhaustive()
    }
}
