// blocking waits on submissions, for callers outside of an async context.
//
// the calling thread polls the submission's join handle itself, with a waker that unparks it, and
// parks on a condvar whenever the handle is still pending. timeouts only bound the parking, so the
// handle is never dropped or cancelled by giving up.

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Condvar, Mutex},
    task::{Context, Poll, Wake, Waker},
    time::Instant,
};


// timeout for blocking on a future.
#[derive(Copy, Clone)]
pub(crate) enum Timeout {
    // never time out.
    Never,
    // time out at the given deadline.
    At(Instant),
    // time out if the future cannot be resolved without blocking.
    NonBlocking,
}

// poll a submission's join handle (or any other unpin future) on the calling thread until it
// resolves, or return none if the timeout is reached first. the future is left intact and may be
// polled again later, which is what lets a timed out block_timeout be retried.
pub(crate) fn poll<F>(fut: &mut F, timeout: Timeout) -> Option<F::Output>
where
    F: Future + Unpin,
{
    let parker = Arc::new(Parker {
        state: Mutex::new(State::Idle),
        cond: Condvar::new(),
    });
    let waker = Waker::from(Arc::clone(&parker));
    let mut cx = Context::from_waker(&waker);

    loop {
        if let Poll::Ready(output) = Pin::new(&mut *fut).poll(&mut cx) {
            return Some(output);
        }
        if !parker.park(timeout) {
            return None;
        }
    }
}

// parking state of the polling thread.
enum State {
    // not parked, no wakeup pending.
    Idle,
    // parked on the condvar.
    Parked,
    // woken while not parked. the next park returns straight away.
    Woken,
}

// waker target which unparks the polling thread.
struct Parker {
    state: Mutex<State>,
    cond: Condvar,
}

impl Parker {
    // park until woken, returning false if the timeout is reached first.
    fn park(&self, timeout: Timeout) -> bool {
        let mut state = self.state.lock().unwrap();

        // a wakeup which arrived while we were polling means the join handle may be ready now
        if let State::Woken = *state {
            *state = State::Idle;
            return true;
        }

        let deadline = match timeout {
            Timeout::NonBlocking => return false,
            Timeout::Never => None,
            Timeout::At(deadline) => Some(deadline),
        };

        *state = State::Parked;
        while let State::Parked = *state {
            state = match deadline {
                None => self.cond.wait(state).unwrap(),
                Some(deadline) => {
                    let Some(remaining) = deadline.checked_duration_since(Instant::now())
                    else {
                        *state = State::Idle;
                        return false;
                    };
                    self.cond.wait_timeout(state, remaining).unwrap().0
                }
            };
        }
        *state = State::Idle;
        true
    }
}

impl Wake for Parker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        let mut state = self.state.lock().unwrap();
        match *state {
            State::Woken => (),
            State::Idle => *state = State::Woken,
            State::Parked => {
                *state = State::Idle;
                self.cond.notify_one();
            }
        }
    }
}
