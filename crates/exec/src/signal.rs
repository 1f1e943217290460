//! Blocked signals and the one-shot publication cell.
//!
//! Both are built on a shared oneshot future: an explicit single-assignment
//! cell with poll-or-wait semantics, not a callback system.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use veloq_common::{Result, VeloqError};

/// Future-like handle an operator returns to indicate whether it can make
/// further progress. Cloneable; awaiting an already-resolved signal returns
/// immediately.
#[derive(Clone)]
pub struct Blocked {
    inner: Option<Shared<BoxFuture<'static, ()>>>,
}

impl Blocked {
    /// The not-blocked constant.
    pub fn ready() -> Self {
        Self { inner: None }
    }

    pub fn from_future(fut: impl Future<Output = ()> + Send + 'static) -> Self {
        Self {
            inner: Some(fut.boxed().shared()),
        }
    }

    /// Observe resolved-ness with a single poll; never spins.
    pub fn is_ready(&self) -> bool {
        match &self.inner {
            None => true,
            Some(shared) => shared.clone().now_or_never().is_some(),
        }
    }
}

impl Future for Blocked {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match &mut self.inner {
            None => Poll::Ready(()),
            Some(shared) => shared.poll_unpin(cx),
        }
    }
}

/// One-shot single-assignment cell: the value may be published exactly
/// once, and every subscription holds a read-only `Arc` afterward.
pub struct Publication<T> {
    sender: Mutex<Option<oneshot::Sender<Arc<T>>>>,
    receiver: Shared<oneshot::Receiver<Arc<T>>>,
}

impl<T> Publication<T> {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: rx.shared(),
        }
    }

    /// Publish the value. A second publish attempt fails with
    /// `IllegalState`.
    pub fn publish(&self, value: T) -> Result<()> {
        let mut guard = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let sender = guard
            .take()
            .ok_or_else(|| VeloqError::IllegalState("value already published".to_string()))?;
        sender
            .send(Arc::new(value))
            .map_err(|_| VeloqError::IllegalState("publication receiver dropped".to_string()))
    }

    pub fn is_published(&self) -> bool {
        matches!(self.receiver.clone().now_or_never(), Some(Ok(_)))
    }

    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            receiver: self.receiver.clone(),
        }
    }
}

impl<T> Default for Publication<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer side of a [`Publication`]; created independently of the
/// publisher, potentially before anything is published.
#[derive(Clone)]
pub struct Subscription<T> {
    receiver: Shared<oneshot::Receiver<Arc<T>>>,
}

impl<T> Subscription<T> {
    /// The published value, if available; a single non-spinning poll.
    pub fn try_get(&self) -> Option<Arc<T>> {
        match self.receiver.clone().now_or_never() {
            Some(Ok(value)) => Some(value),
            _ => None,
        }
    }

    /// Wait for publication. A publisher torn down before publishing
    /// resolves every waiter with `IllegalState` rather than hanging them.
    pub async fn wait(&self) -> Result<Arc<T>> {
        self.receiver.clone().await.map_err(|_| {
            VeloqError::IllegalState("publisher dropped before publishing".to_string())
        })
    }

    /// Blocked signal resolving at publication or publisher teardown.
    pub fn blocked(&self) -> Blocked
    where
        T: Send + Sync + 'static,
    {
        let receiver = self.receiver.clone();
        Blocked::from_future(async move {
            let _ = receiver.await;
        })
    }
}
