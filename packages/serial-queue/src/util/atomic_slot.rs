//! Low-level concurrency utility.

use std::{
    marker::PhantomData,
    ptr::null_mut,
    sync::atomic::{
        Ordering::AcqRel,
        AtomicPtr,
    },
};

/// Like an atomic `Option<T>` that can only be exchanged, never peeked at.
pub(crate) struct AtomicSlot<T> {
    // null if none. otherwise points to a leaked Box<T>. the thread whose swap returns a non-null
    // pointer claims ownership of that allocation, so no allocation is ever reachable from two
    // places at once.
    ptr: AtomicPtr<T>,
    _owns: PhantomData<Box<T>>,
}

impl<T> AtomicSlot<T> {
    /// Construct without a value.
    pub const fn none() -> Self {
        AtomicSlot {
            ptr: AtomicPtr::new(null_mut()),
            _owns: PhantomData,
        }
    }

    /// Atomically replace the contents, returning what was there before.
    pub fn swap(&self, val: Option<T>) -> Option<T> {
        let new = val.map_or(null_mut(), |val| Box::into_raw(Box::new(val)));
        // acq-rel: the release half publishes our boxed value to whoever swaps it out next, the
        // acquire half makes the previous swapper's value readable to us.
        let old = self.ptr.swap(new, AcqRel);
        if old.is_null() {
            None
        } else {
            Some(*unsafe { Box::from_raw(old) })
        }
    }

    /// Atomically take the value, leaving none.
    pub fn take(&self) -> Option<T> {
        self.swap(None)
    }
}

impl<T> Drop for AtomicSlot<T> {
    fn drop(&mut self) {
        // make sure the value gets dropped if still present
        drop(self.take());
    }
}

// values only ever move through the slot whole, never shared, so T: Send is enough for both.
unsafe impl<T: Send> Send for AtomicSlot<T> {}
unsafe impl<T: Send> Sync for AtomicSlot<T> {}
