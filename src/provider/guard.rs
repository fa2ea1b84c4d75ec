use std::fmt;
use std::ops::Deref;

use tracing::trace;

use super::StoreProvider;

/// Scoped ownership of a provider node handle.
///
/// The handle is released when the guard is dropped, on every exit path.
pub struct NodeGuard<'p, P: StoreProvider + ?Sized> {
    provider: &'p P,
    node: Option<P::Node>,
}

impl<'p, P: StoreProvider + ?Sized> NodeGuard<'p, P> {
    pub fn new(provider: &'p P, node: P::Node) -> Self {
        Self {
            provider,
            node: Some(node),
        }
    }

    /// Releases the handle now instead of at end of scope.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(node) = self.node.take() {
            trace!("releasing node handle");
            self.provider.release(node);
        }
    }
}

impl<P: StoreProvider + ?Sized> Deref for NodeGuard<'_, P> {
    type Target = P::Node;

    fn deref(&self) -> &P::Node {
        // Only `release_inner` takes the node, and it runs in `release(self)` or `drop`.
        match &self.node {
            Some(node) => node,
            None => unreachable!("node guard used after release"),
        }
    }
}

impl<P: StoreProvider + ?Sized> Drop for NodeGuard<'_, P> {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl<P: StoreProvider + ?Sized> fmt::Debug for NodeGuard<'_, P>
where
    P::Node: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeGuard").field("node", &self.node).finish()
    }
}
