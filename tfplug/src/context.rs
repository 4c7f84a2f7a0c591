//! Context implementation for request-scoped cancellation
//!
//! A Context carries a cancellation signal across async boundaries. The gRPC
//! server owns a root context that StopProvider cancels; every RPC runs under
//! a child of it.

use std::future::pending;
use std::sync::Arc;
use tokio::sync::watch;

/// Context carries request-scoped cancellation signals
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    done_tx: watch::Sender<bool>,
    parent: Option<Context>,
}

impl Context {
    pub fn new() -> Self {
        Self::build(None)
    }

    fn build(parent: Option<Context>) -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner { done_tx, parent }),
        }
    }

    /// Derived context cancelled together with this one
    pub fn child(&self) -> Self {
        Self::build(Some(self.clone()))
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done_tx.borrow()
            || self.inner.parent.as_ref().is_some_and(Context::is_cancelled)
    }

    /// Resolves once work done on behalf of this context should stop
    pub async fn cancelled(&self) {
        let mut done = self.inner.done_tx.subscribe();
        let own = async move {
            if done.wait_for(|cancelled| *cancelled).await.is_err() {
                pending::<()>().await;
            }
        };
        let parent = async {
            match &self.inner.parent {
                Some(p) => Box::pin(p.cancelled()).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            _ = own => {}
            _ = parent => {}
        }
    }

    pub fn cancel(&self) {
        self.inner.done_tx.send_replace(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
