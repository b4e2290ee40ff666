//! Futures that cannot fail the caller
//!
//! Dropping an index or shutting down replication is best-effort cleanup. A
//! `Teardown` resolves to `()`; any error raised while tearing down is logged
//! at `warn` and goes no further.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use tracing::warn;

/// Infallible teardown future
#[must_use = "a teardown does nothing unless awaited or spawned"]
pub struct Teardown(BoxFuture<'static, ()>);

impl Teardown {
    /// Already finished
    pub fn completed() -> Self {
        Self(future::ready(()).boxed())
    }

    /// Wrap a fallible future, logging and discarding its error
    pub fn swallowing<F, E>(context: impl Into<String>, fut: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let context = context.into();
        Self(
            async move {
                if let Err(e) = fut.await {
                    warn!(context = %context, error = %e, "teardown failed, continuing");
                }
            }
            .boxed(),
        )
    }

    /// Wrap a future that already cannot fail
    pub fn from_future<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(fut.boxed())
    }

    /// Completes once every teardown has completed
    pub fn all(teardowns: impl IntoIterator<Item = Teardown>) -> Self {
        let pending: Vec<Teardown> = teardowns.into_iter().collect();
        Self(
            async move {
                future::join_all(pending).await;
            }
            .boxed(),
        )
    }
}

impl Future for Teardown {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.0.as_mut().poll(cx)
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Teardown")
    }
}
