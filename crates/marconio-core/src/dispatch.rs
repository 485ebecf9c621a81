//! Message-passing primitives shared by the coordinators and collaborators.
//!
//! A [`Dispatcher`] is the only way a collaborator can talk back to the
//! core: it pushes a normalised action onto the serial inbox. A
//! [`Subscription`] is what a collaborator hands back for anything
//! long-lived (OS command handlers, observers); dropping or cancelling it
//! runs the teardown exactly once.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

/// Cloneable, thread-safe action sink.
pub struct Dispatcher<A> {
    send: Arc<dyn Fn(A) -> bool + Send + Sync>,
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            send: Arc::clone(&self.send),
        }
    }
}

impl<A> fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatcher")
    }
}

impl<A: Send + 'static> Dispatcher<A> {
    pub fn new<F>(send: F) -> Self
    where
        F: Fn(A) -> bool + Send + Sync + 'static,
    {
        Self {
            send: Arc::new(send),
        }
    }

    pub fn from_sender(tx: mpsc::UnboundedSender<A>) -> Self {
        Self::new(move |action| tx.send(action).is_ok())
    }

    /// A sink that drops everything.
    pub fn noop() -> Self {
        Self::new(|_| false)
    }

    /// Returns `false` once the receiving side is gone.
    pub fn send(&self, action: A) -> bool {
        (self.send)(action)
    }

    /// Scope this dispatcher down to a child action type.
    pub fn map<B, F>(&self, embed: F) -> Dispatcher<B>
    where
        B: Send + 'static,
        F: Fn(B) -> A + Send + Sync + 'static,
    {
        let parent = self.clone();
        Dispatcher::new(move |child| parent.send(embed(child)))
    }
}

/// Handle to a live registration. Teardown runs once, on `cancel` or drop.
#[must_use = "dropping a Subscription tears it down immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    pub fn cancel(mut self) {
        self.run_teardown();
    }

    fn run_teardown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_teardown();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.teardown.is_some())
            .finish()
    }
}
