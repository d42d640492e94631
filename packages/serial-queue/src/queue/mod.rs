// implementation of the serial queue.
//
// the architecture is a linked chain of completion signals rather than a queue data structure:
// there is no list of pending work anywhere. each submission holds the signal of the submission
// before it and the obligation to fire its own, and the queue itself holds only the most recent
// signal, behind an atomic exchange.
//
// the organization of these modules is as such:
//
//      signal<-----------------core: The chaining primitive. Admits submissions by exchanging the
//                               ^    tail signal, and runs bodies in turn, firing on every exit.
//                               |
//      polling<----------------api: Adapts the four kinds of body onto core, spawns them onto a
//                                   runtime, and wraps the outcome in futures which re-raise
//                                   panics or block the calling thread. The crate re-exports this
//                                   API publically.
//
// there is also the error module, which contains the relevant error types, which is also
// re-exported publically.

pub(crate) mod error;
pub(crate) mod api;

mod signal;
mod polling;
mod core;
