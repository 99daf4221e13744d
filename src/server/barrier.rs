//! Completion barrier for sidecar components
//!
//! Every long-running component takes a guard when it starts and drops it
//! when it exits. The guard decrements on drop, so a component that
//! returns early with an error (or panics) still releases its slot and
//! can never block process exit.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Counter of in-flight components with an async "wait for zero"
#[derive(Debug, Clone)]
pub struct CompletionBarrier {
    count: Arc<watch::Sender<usize>>,
}

impl CompletionBarrier {
    /// Create an empty barrier
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self {
            count: Arc::new(sender),
        }
    }

    /// Register a component
    ///
    /// The returned guard must be moved into the component's task.
    pub fn enter(&self, component: impl Into<String>) -> CompletionGuard {
        let component = component.into();
        self.count.send_modify(|count| *count += 1);
        debug!(component = %component, active = self.active(), "Component started");
        CompletionGuard {
            count: Arc::clone(&self.count),
            component,
        }
    }

    /// Number of components that have entered and not yet exited
    pub fn active(&self) -> usize {
        *self.count.borrow()
    }

    /// Wait until every registered component has exited
    ///
    /// Returns immediately when nothing is registered.
    pub async fn wait(&self) {
        let mut receiver = self.count.subscribe();
        // The sender lives as long as self, so this cannot fail
        let _ = receiver.wait_for(|count| *count == 0).await;
    }
}

impl Default for CompletionBarrier {
    fn default() -> Self {
        Self::new()
    }
}

/// Slot held by a running component
#[derive(Debug)]
pub struct CompletionGuard {
    count: Arc<watch::Sender<usize>>,
    component: String,
}

impl CompletionGuard {
    /// Name given when the component entered the barrier
    pub fn component(&self) -> &str {
        &self.component
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.count
            .send_modify(|count| *count = count.saturating_sub(1));
        debug!(
            component = %self.component,
            active = *self.count.borrow(),
            "Component exited"
        );
    }
}
