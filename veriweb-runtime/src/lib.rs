//! Tokio runtime for synchronous callers such as a test runner thread.
//!
//! Keywords are `async`; a runner drives them with
//! [`VeriwebRuntime::block_on_abortable`], which hands each call a fresh
//! cancellation token. Another thread can stop the running keyword through an
//! [`AbortHandle`] without tearing the runtime down.
use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

/// Cancels whichever keyword call is currently running.
#[derive(Clone)]
pub struct AbortHandle {
    current: Arc<Mutex<CancellationToken>>,
}

impl AbortHandle {
    /// Request cancellation of the running call. Calls started afterwards
    /// get a fresh token and are unaffected.
    pub fn abort(&self) {
        if let Ok(token) = self.current.lock() {
            tracing::info!(target: "runtime", "runtime.abort");
            token.cancel();
        }
    }
}

pub struct VeriwebRuntime {
    runtime: Runtime,
    shutdown: CancellationToken,
    current: Arc<Mutex<CancellationToken>>,
}

impl VeriwebRuntime {
    /// Build a multi-thread runtime.
    ///
    /// ```
    /// use veriweb_runtime::VeriwebRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = VeriwebRuntime::build("doctest-runtime", Some(1))
    ///     .expect("runtime builds");
    /// let value = runtime.block_on(async { 2 + 2 });
    /// assert_eq!(value, 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str, worker_threads: Option<usize>) -> Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(thread_name);

        if let Some(workers) = worker_threads {
            builder.worker_threads(workers.max(1));
        }

        let runtime = builder.build()?;
        let shutdown = CancellationToken::new();
        let current = Arc::new(Mutex::new(shutdown.child_token()));
        Ok(Self {
            runtime,
            shutdown,
            current,
        })
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            current: self.current.clone(),
        }
    }

    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Run the future built by `make` with a token that [`AbortHandle::abort`]
    /// and [`VeriwebRuntime::shutdown`] cancel.
    ///
    /// ```
    /// use veriweb_runtime::VeriwebRuntime;
    ///
    /// let runtime = VeriwebRuntime::build("abortable-example", Some(1)).unwrap();
    /// let aborted = runtime.block_on_abortable(|token| async move {
    ///     token.is_cancelled()
    /// });
    /// assert!(!aborted);
    /// ```
    pub fn block_on_abortable<F, Fut>(&self, make: F) -> Fut::Output
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: std::future::Future,
    {
        let token = self.shutdown.child_token();
        if let Ok(mut current) = self.current.lock() {
            *current = token.clone();
        }
        self.runtime.block_on(make(token))
    }

    /// Cancel outstanding work and shut the runtime down.
    pub fn shutdown(self, graceful: Duration) {
        self.shutdown.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}
