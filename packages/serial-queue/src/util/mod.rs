//! Utilities.

mod atomic_slot;

pub(crate) use self::atomic_slot::AtomicSlot;
