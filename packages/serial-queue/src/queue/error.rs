// serial queue error types.
//
// a submission can only fail because its body failed. bodies returning a Result hand their error
// straight to the caller as part of their value, so these types only cover what a value cannot:
// panics, teardown, and blocking waits that ran out of time.

use std::{
    any::Any,
    fmt::{self, Debug, Display, Formatter},
    panic::resume_unwind,
};
use thiserror::Error;


// ==== base error types ====


/// Error for a submission whose body panicked
///
/// Holds the original panic payload, so the panic can be inspected or re-raised unchanged.
pub struct PanickedError(pub(crate) Box<dyn Any + Send + 'static>);

impl PanickedError {
    /// The panic message, if the payload was a string
    pub fn message(&self) -> Option<&str> {
        if let Some(&s) = self.0.downcast_ref::<&'static str>() {
            Some(s)
        } else if let Some(s) = self.0.downcast_ref::<String>() {
            Some(s.as_str())
        } else {
            None
        }
    }

    /// Take the original panic payload
    pub fn into_panic(self) -> Box<dyn Any + Send + 'static> {
        self.0
    }

    /// Re-raise the original panic on the current thread
    pub fn resume(self) -> ! {
        resume_unwind(self.0)
    }
}

impl Debug for PanickedError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("PanickedError")
            .field(&self.message().unwrap_or("Box<dyn Any>"))
            .finish()
    }
}

impl Display for PanickedError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.message() {
            Some(msg) => write!(f, "submission body panicked: {}", msg),
            None => f.write_str("submission body panicked"),
        }
    }
}

impl std::error::Error for PanickedError {}

/// Error for a submission which was torn down before finishing because the runtime it was spawned
/// on shut down
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Error)]
#[error("submission torn down before finishing: runtime shut down")]
pub struct CancelledError;

/// Error for attempting to wait for a submission with no or limited blocking, and the submission
/// not completing immediately or by the specified deadline
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Error)]
#[error("submission did not complete in time")]
pub struct WouldBlockError;


// ==== compound error types ====


macro_rules! compound_from {
    ($compound:ident {$(
        $variant:ident($inner:ty),
    )*})=>{$(
        impl From<$inner> for $compound {
            fn from(inner: $inner) -> Self {
                Self::$variant(inner)
            }
        }
    )*};
}

/// Error for a submission which did not produce a value
#[derive(Debug, Error)]
pub enum TaskError {
    /// The body panicked
    #[error(transparent)]
    Panicked(PanickedError),
    /// The submission was torn down by runtime shutdown
    #[error(transparent)]
    Cancelled(CancelledError),
}

compound_from!(TaskError {
    Panicked(PanickedError),
    Cancelled(CancelledError),
});

impl TaskError {
    /// Whether the body panicked
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }

    /// Whether the submission was torn down by runtime shutdown
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled(_))
    }

    /// Re-raise on the current thread: panics resume with their original payload
    pub fn resume(self) -> ! {
        match self {
            TaskError::Panicked(e) => e.resume(),
            TaskError::Cancelled(e) => panic!("{}", e),
        }
    }
}
