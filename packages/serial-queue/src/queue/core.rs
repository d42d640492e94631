// the chaining primitive. the exposed API is a set of adapters around this.
//
// the queue's only shared state is the tail slot, holding the Predecessor for the most recently
// admitted submission's Completion. admitting swaps a fresh Predecessor in and takes the previous
// one out, so each submission ends up holding exactly the signal of the one admitted right before
// it:
//
//      tail ---> P3        submission 3 waits on P2, fires C3
//                          submission 2 waits on P1, fires C2
//                          submission 1 waits on nothing, fires C1
//
// an empty tail means "already fired", which is the state of a new queue.

use super::signal::{signal, Completion, Predecessor};
use crate::util::AtomicSlot;
use std::future::Future;


// chain of submissions.
pub(crate) struct Chain {
    tail: AtomicSlot<Predecessor>,
}

// an admitted submission which has not yet had its turn. its completion knows the predecessor it
// waits on, so that dropping it before its turn forwards that predecessor rather than releasing
// the successor early.
pub(crate) struct Ticket(Completion);

// a submission whose turn has come. the body may run for as long as this is held.
pub(crate) struct Turn(Completion);

impl Chain {
    // construct an empty chain.
    pub(crate) fn new() -> Self {
        Chain { tail: AtomicSlot::none() }
    }

    // admit a submission. the order in which calls to this take effect is the order in which the
    // submissions' bodies will run.
    pub(crate) fn admit(&self) -> Ticket {
        let (mut completion, next) = signal();
        completion.set_after(self.tail.swap(Some(next)));
        let mut ticket = Ticket(completion);
        trace!(waiting = ticket.must_wait(), "submission admitted");
        ticket
    }
}

impl Ticket {
    // whether taking the turn now would have to wait on an earlier submission.
    pub(crate) fn must_wait(&mut self) -> bool {
        self.0.after_mut().is_some_and(|predecessor| !predecessor.is_fired())
    }

    // wait for the predecessor to fire.
    pub(crate) async fn turn(self) -> Turn {
        let Ticket(mut completion) = self;
        if let Some(predecessor) = completion.after_mut() {
            predecessor.await;
        }
        trace!("submission running");
        Turn(completion)
    }

    // take the turn, then produce and run the body to completion, then fire.
    //
    // the completion fires on every exit path: explicitly when the body returns, or by being
    // dropped if the body panics or this future is dropped part way through.
    pub(crate) async fn run_in_turn<F, Fut>(self, body: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let turn = self.turn().await;
        let output = body().await;
        turn.finish();
        output
    }
}

impl Turn {
    // fire, releasing the next submission.
    pub(crate) fn finish(self) {
        let Turn(completion) = self;
        completion.fire();
        trace!("submission completed");
    }
}
