use std::ops::Deref;

use crate::platform::NodeHandle;

/// Scoped ownership of an acquired node handle.
///
/// The handle is released exactly once, when the lease is dropped.
pub struct Lease<H: NodeHandle> {
    handle: Option<H>,
}

impl<H: NodeHandle> Lease<H> {
    pub fn new(handle: H) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

impl<H: NodeHandle> Deref for Lease<H> {
    type Target = H;

    fn deref(&self) -> &H {
        match self.handle.as_ref() {
            Some(handle) => handle,
            // Only `drop` takes the handle out.
            None => unreachable!("lease used after release"),
        }
    }
}

impl<H: NodeHandle> Drop for Lease<H> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.release();
        }
    }
}
