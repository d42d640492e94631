// single-fire completion signal handed from one submission to the next.
//
// a signal is a pair: the Completion is the obligation to fire, held by the submission that owns
// it, and the Predecessor is what the next submission in line awaits. firing happens exactly once:
// either explicitly via Completion::fire, or implicitly when an unfired Completion is dropped
// (the body panicked, or the task was torn down).
//
// a Completion may be told which Predecessor its own submission waits on. if it fires while that
// predecessor is still pending, which only happens when a waiting submission is torn down, it
// forwards the predecessor instead of releasing the successor. the successor then keeps waiting
// on the forwarded signal, so a torn-down submission never lets anything skip ahead of the ones
// before it.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::oneshot::{
    self,
    error::TryRecvError,
};


// create a new pending signal.
pub(crate) fn signal() -> (Completion, Predecessor) {
    let (send, recv) = oneshot::channel();
    (
        Completion { send: Some(send), after: None },
        Predecessor { recv, fired: false },
    )
}

// obligation to fire a signal.
pub(crate) struct Completion {
    // none once fired.
    send: Option<oneshot::Sender<Option<Predecessor>>>,
    // signal this completion's own submission waits on, if any.
    after: Option<Predecessor>,
}

impl Completion {
    // set the signal this completion's own submission waits on.
    pub(crate) fn set_after(&mut self, after: Option<Predecessor>) {
        self.after = after;
    }

    // the signal this completion's own submission waits on, if any.
    pub(crate) fn after_mut(&mut self) -> Option<&mut Predecessor> {
        self.after.as_mut()
    }

    // fire the signal.
    pub(crate) fn fire(mut self) {
        self.send_once();
    }

    // release the successor, or hand it our own predecessor if that hasn't fired yet.
    fn send_once(&mut self) {
        let Some(send) = self.send.take() else { return };
        let forward = match self.after.take() {
            Some(mut after) => {
                if !after.is_fired() {
                    debug!("completion forwarded to a pending predecessor");
                    Some(after)
                } else {
                    None
                }
            }
            None => None,
        };
        // the receiver being gone just means nobody is waiting on us
        let _ = send.send(forward);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.send.is_some() {
            debug!("completion fired by drop");
            self.send_once();
        }
    }
}

// future which resolves once the paired completion has fired, following any forwarding.
pub(crate) struct Predecessor {
    recv: oneshot::Receiver<Option<Predecessor>>,
    // oneshot receivers panic if polled after resolving, so we remember it.
    fired: bool,
}

impl Predecessor {
    // whether the paired completion has fired, without waiting.
    pub(crate) fn is_fired(&mut self) -> bool {
        while !self.fired {
            match self.recv.try_recv() {
                Err(TryRecvError::Empty) => return false,
                // forwarded: keep checking on what we were handed
                Ok(Some(next)) => *self = next,
                // both a plain fire and a dropped sender count as fired
                Ok(None) | Err(TryRecvError::Closed) => self.fired = true,
            }
        }
        true
    }
}

impl Future for Predecessor {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<()> {
        let this = self.get_mut();
        while !this.fired {
            match Pin::new(&mut this.recv).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(Some(next))) => *this = next,
                Poll::Ready(_) => this.fired = true,
            }
        }
        Poll::Ready(())
    }
}
