//! Render-thread affinity.
//!
//! Render-thread-only types ([`FrameDriver`](crate::frame::FrameDriver),
//! [`RenderNode`](crate::render::RenderNode)) carry a [`NotSend`] marker so
//! they cannot leave the thread that created them. [`RenderThread`] covers
//! what the type system cannot: producer-side calls that are only meaningful
//! on the render thread.

use crate::errors::BridgeError;
use std::marker::PhantomData;
use std::sync::OnceLock;
use std::thread::ThreadId;

/// Zero-sized marker that makes its owner `!Send` and `!Sync`.
pub(crate) type NotSend = PhantomData<*const ()>;

/// The thread an item renders on. Bound once, never rebound.
#[derive(Debug, Default)]
pub struct RenderThread {
    id: OnceLock<ThreadId>,
}

impl RenderThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the calling thread. Binding the same thread again is a no-op.
    pub fn bind(&self) -> Result<(), BridgeError> {
        let current = std::thread::current().id();
        let bound = *self.id.get_or_init(|| current);
        if bound != current {
            return Err(BridgeError::AlreadyAttached);
        }
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.id.get().is_some()
    }

    /// True when called from the bound thread.
    pub fn is_current(&self) -> bool {
        self.id.get() == Some(&std::thread::current().id())
    }

    pub fn check(&self) -> Result<(), BridgeError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(BridgeError::WrongThread)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn unbound_is_never_current() {
        let rt = RenderThread::new();
        assert!(!rt.is_bound());
        assert!(!rt.is_current());
        assert!(matches!(rt.check(), Err(BridgeError::WrongThread)));
    }

    #[test]
    fn bind_sticks_to_first_thread() {
        let rt = Arc::new(RenderThread::new());
        rt.bind().unwrap();
        rt.bind().unwrap();
        assert!(rt.is_current());
        rt.check().unwrap();

        let other = rt.clone();
        let (bind, current) = std::thread::spawn(move || (other.bind(), other.is_current()))
            .join()
            .unwrap();
        assert!(matches!(bind, Err(BridgeError::AlreadyAttached)));
        assert!(!current);
    }
}
