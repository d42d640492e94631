// exposed API of the serial queue

use self::future::*;
use super::core::{Chain, Ticket};
use std::{
    fmt::{self, Debug, Formatter},
    future::Future,
    panic::resume_unwind,
    sync::Arc,
};
use tokio::{
    runtime::Handle,
    task::spawn_blocking,
};


// ==== helper functions for adapting bodies to the chain ====


// wait for the turn, then run a synchronous body on the blocking pool, so it doesn't hold up an
// async worker thread, and re-raise its panic (if any) in the calling task.
//
// the turn moves onto the blocking thread along with the body, so it is only released once the
// body has returned or unwound there, even if this task is torn down in the meantime.
async fn run_blocking<F, T>(ticket: Ticket, function: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let turn = ticket.turn().await;
    let blocking = spawn_blocking(move || {
        let output = function();
        turn.finish();
        output
    });
    match blocking.await {
        Ok(output) => output,
        Err(e) if e.is_panic() => resume_unwind(e.into_panic()),
        // the blocking pool only drops tasks when the runtime is shutting down, in which case
        // this task is being torn down as well
        Err(e) => panic!("blocking body did not run: {}", e),
    }
}


// ==== the exposed API ====


/// Queue which runs submitted work one item at a time, in submission order
///
/// Each `enqueue*` method admits its body into the queue before returning, and the bodies run
/// strictly in admission order: a body starts only once the body admitted before it has fully
/// finished, including any suspensions of an async body. Admission never waits for execution, and
/// no lock is held while a body runs.
///
/// Submissions are eager. They are spawned onto a tokio runtime and run whether or not the
/// returned [`Enqueued`] is ever awaited; dropping it just detaches from the outcome. Queued
/// submissions cannot be cancelled.
///
/// A body failing affects only its own caller. A body returning `Err` is just a body whose value
/// is an `Err`. A panicking body re-raises its panic to whoever awaits its [`Enqueued`]. Either
/// way, the next submission runs as normal.
///
/// Cloning produces another handle to the same queue.
#[derive(Clone)]
pub struct SerialQueue(Arc<Shared>);

// queue shared state.
struct Shared {
    chain: Chain,
    // runtime to spawn onto, or the calling context's if none.
    runtime: Option<Handle>,
}

impl SerialQueue {
    /// Construct an empty queue which spawns submissions onto the calling context's runtime
    ///
    /// With this constructor, the `enqueue*` methods panic if called outside of a tokio runtime,
    /// in the same way as `tokio::spawn`. See [`with_runtime`](Self::with_runtime) for using the
    /// queue from plain threads.
    pub fn new() -> Self {
        SerialQueue(Arc::new(Shared {
            chain: Chain::new(),
            runtime: None,
        }))
    }

    /// Construct an empty queue which always spawns submissions onto the given runtime
    pub fn with_runtime(runtime: Handle) -> Self {
        SerialQueue(Arc::new(Shared {
            chain: Chain::new(),
            runtime: Some(runtime),
        }))
    }

    // admit, then spawn the task built from the ticket.
    fn admit_with<G, Fut>(&self, task: G) -> Enqueued<Fut::Output>
    where
        G: FnOnce(Ticket) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        // resolve the runtime first, so that a missing runtime panics before anything is admitted
        let runtime = self.0.runtime.clone().unwrap_or_else(Handle::current);
        let ticket = self.0.chain.admit();
        Enqueued::new(runtime.spawn(task(ticket)))
    }

    // the primitive all async enqueue variants funnel into: admit, then spawn a task which waits
    // its turn, runs the body, and fires.
    fn admit_and_run<F, Fut>(&self, body: F) -> Enqueued<Fut::Output>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        self.admit_with(move |ticket| ticket.run_in_turn(body))
    }

    /// Submit a synchronous action
    ///
    /// Once its turn comes, the action runs on the runtime's blocking thread pool.
    pub fn enqueue<F>(&self, action: F) -> Enqueued<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue_fn(action)
    }

    /// Submit a synchronous function, resolving to its return value
    ///
    /// Once its turn comes, the function runs on the runtime's blocking thread pool.
    pub fn enqueue_fn<F, T>(&self, function: F) -> Enqueued<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.admit_with(move |ticket| run_blocking(ticket, function))
    }

    /// Submit an asynchronous action
    ///
    /// `action` is called once its turn comes, and the queue is held until the future it returns
    /// completes.
    pub fn enqueue_async<F, Fut>(&self, action: F) -> Enqueued<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.admit_and_run(action)
    }

    /// Submit an asynchronous function, resolving to its future's output
    ///
    /// `function` is called once its turn comes, and the queue is held until the future it returns
    /// completes.
    pub fn enqueue_async_fn<F, Fut, T>(&self, function: F) -> Enqueued<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.admit_and_run(function)
    }

    /// Submit a no-op, resolving once everything submitted before it has finished
    pub fn drained(&self) -> Enqueued<()> {
        self.admit_and_run(|| async {})
    }
}

impl Default for SerialQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SerialQueue {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("pinned_runtime", &self.0.runtime.is_some())
            .finish_non_exhaustive()
    }
}


// future types for submissions.
pub(crate) mod future {
    use crate::queue::{
        error::*,
        polling::{Timeout, poll},
    };
    use std::{
        task::{Poll, Context},
        future::Future,
        pin::Pin,
        time::{Duration, Instant},
    };
    use tokio::task::{JoinError, JoinHandle};

    fn map_join_result<T>(result: Result<T, JoinError>) -> Result<T, TaskError> {
        result.map_err(|e| {
            if e.is_panic() {
                debug!("submission body panicked");
                PanickedError(e.into_panic()).into()
            } else {
                debug!("submission torn down before finishing");
                CancelledError.into()
            }
        })
    }

    fn unwrap_task_result<T>(result: Result<T, TaskError>) -> T {
        result.unwrap_or_else(|e| e.resume())
    }

    /// Future for the outcome of a submission to a [`SerialQueue`](crate::SerialQueue)
    ///
    /// Resolves to the body's value once the body has run. If the body panicked, awaiting this
    /// re-raises that panic with its original payload, as if the body had been run directly. If
    /// the submission was torn down by runtime shutdown, awaiting this panics with
    /// [`CancelledError`]'s message. Use [`into_try`](Self::into_try) to receive those as values
    /// instead.
    ///
    /// Dropping this does not cancel the submission.
    #[must_use = "the submission runs regardless, but its value and panics are lost if dropped"]
    pub struct Enqueued<T> {
        handle: JoinHandle<T>,
        terminated: bool,
    }

    impl<T> Enqueued<T> {
        pub(crate) fn new(handle: JoinHandle<T>) -> Self {
            Enqueued { handle, terminated: false }
        }

        fn poll_with(&mut self, timeout: Timeout) -> Result<T, WouldBlockError> {
            assert!(!self.terminated, "Enqueued waited on after already resolved");
            let result = poll(&mut self.handle, timeout).ok_or(WouldBlockError)?;
            self.terminated = true;
            Ok(unwrap_task_result(map_join_result(result)))
        }

        /// Convert into a future which resolves to an error rather than panicking
        pub fn into_try(self) -> TryEnqueued<T> {
            assert!(!self.terminated, "Enqueued converted after already resolved");
            TryEnqueued { handle: self.handle, terminated: false }
        }

        /// Try to resolve this future immediately without blocking
        ///
        /// If this returns anything other than [`WouldBlockError`], that counts as this future
        /// resolving. This method will panic if this future has already resolved.
        pub fn try_now(&mut self) -> Result<T, WouldBlockError> {
            self.poll_with(Timeout::NonBlocking)
        }

        /// Block the current thread until this future resolves
        ///
        /// Meant for callers outside of an async context. This method will panic if this future
        /// has already resolved.
        pub fn block(&mut self) -> T {
            self.poll_with(Timeout::Never)
                .ok().expect("poll timed out with Timeout::Never")
        }

        /// Block the current thread until this future resolves or a timeout elapses
        ///
        /// Timing out leaves this future intact, to be waited on again. This method will panic if
        /// this future has already resolved.
        pub fn block_timeout(&mut self, timeout: Duration) -> Result<T, WouldBlockError> {
            self.block_deadline(Instant::now() + timeout)
        }

        /// Block the current thread until this future resolves or the deadline is reached
        ///
        /// Reaching the deadline leaves this future intact, to be waited on again. This method
        /// will panic if this future has already resolved.
        pub fn block_deadline(&mut self, deadline: Instant) -> Result<T, WouldBlockError> {
            self.poll_with(Timeout::At(deadline))
        }

        /// Whether the submission has finished running, whether or not this has resolved yet
        pub fn is_finished(&self) -> bool {
            self.handle.is_finished()
        }

        /// Whether this future has already resolved
        pub fn is_terminated(&self) -> bool {
            self.terminated
        }
    }

    impl<T> Future for Enqueued<T> {
        type Output = T;

        fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<T> {
            let this = self.get_mut();
            // for implementation of FusedFuture
            if this.terminated {
                return Poll::Pending;
            }
            match Pin::new(&mut this.handle).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(result) => {
                    this.terminated = true;
                    Poll::Ready(unwrap_task_result(map_join_result(result)))
                }
            }
        }
    }

    #[cfg(feature = "futures")]
    impl<T> futures::future::FusedFuture for Enqueued<T> {
        fn is_terminated(&self) -> bool {
            Self::is_terminated(self)
        }
    }


    /// Future for the outcome of a submission, which resolves to an error rather than panicking
    ///
    /// Created by [`Enqueued::into_try`]. Dropping this does not cancel the submission.
    #[must_use = "the submission runs regardless, but its outcome is lost if dropped"]
    pub struct TryEnqueued<T> {
        handle: JoinHandle<T>,
        terminated: bool,
    }

    impl<T> TryEnqueued<T> {
        fn poll_with(
            &mut self,
            timeout: Timeout,
        ) -> Result<Result<T, TaskError>, WouldBlockError> {
            assert!(!self.terminated, "TryEnqueued waited on after already resolved");
            let result = poll(&mut self.handle, timeout).ok_or(WouldBlockError)?;
            self.terminated = true;
            Ok(map_join_result(result))
        }

        /// Try to resolve this future immediately without blocking
        ///
        /// If this returns anything other than [`WouldBlockError`], that counts as this future
        /// resolving. This method will panic if this future has already resolved.
        pub fn try_now(&mut self) -> Result<Result<T, TaskError>, WouldBlockError> {
            self.poll_with(Timeout::NonBlocking)
        }

        /// Block the current thread until this future resolves
        ///
        /// This method will panic if this future has already resolved.
        pub fn block(&mut self) -> Result<T, TaskError> {
            self.poll_with(Timeout::Never)
                .ok().expect("poll timed out with Timeout::Never")
        }

        /// Block the current thread until this future resolves or a timeout elapses
        ///
        /// Timing out leaves this future intact, to be waited on again. This method will panic if
        /// this future has already resolved.
        pub fn block_timeout(
            &mut self,
            timeout: Duration,
        ) -> Result<Result<T, TaskError>, WouldBlockError> {
            self.block_deadline(Instant::now() + timeout)
        }

        /// Block the current thread until this future resolves or the deadline is reached
        ///
        /// Reaching the deadline leaves this future intact, to be waited on again. This method
        /// will panic if this future has already resolved.
        pub fn block_deadline(
            &mut self,
            deadline: Instant,
        ) -> Result<Result<T, TaskError>, WouldBlockError> {
            self.poll_with(Timeout::At(deadline))
        }

        /// Whether the submission has finished running, whether or not this has resolved yet
        pub fn is_finished(&self) -> bool {
            self.handle.is_finished()
        }

        /// Whether this future has already resolved
        pub fn is_terminated(&self) -> bool {
            self.terminated
        }
    }

    impl<T> Future for TryEnqueued<T> {
        type Output = Result<T, TaskError>;

        fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
            let this = self.get_mut();
            if this.terminated {
                return Poll::Pending;
            }
            match Pin::new(&mut this.handle).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(result) => {
                    this.terminated = true;
                    Poll::Ready(map_join_result(result))
                }
            }
        }
    }

    #[cfg(feature = "futures")]
    impl<T> futures::future::FusedFuture for TryEnqueued<T> {
        fn is_terminated(&self) -> bool {
            Self::is_terminated(self)
        }
    }
}


// ==== tests ====
