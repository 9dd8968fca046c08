//! Run a call's main future together with helper legs.
//!
//! [`TryConcurrently`] polls every leg inside one future; nothing is
//! spawned. Legs are ordered around the main future:
//!
//! - push legs are polled before it (they feed data into the chain)
//! - pull legs are polled after it (they drain data out of the chain)
//!
//! Resolution:
//!
//! - the first leg to fail ends the whole call with its status
//! - a failing main future ends the call immediately
//! - a successful main future is returned once every *necessary* leg has
//!   completed; the remaining legs are dropped
//!
//! ```rust
//! use compression_filter::{CallResult, MetadataBatch, TryConcurrently};
//! use futures::executor::block_on;
//!
//! let main = async { CallResult::Ok(MetadataBatch::new()) };
//! let result = block_on(
//!     TryConcurrently::new(main)
//!         .necessary_pull(async { Ok(()) })
//!         .push(std::future::pending()),
//! );
//! assert!(result.is_ok());
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;

use compression_filter_core::{MetadataBatch, Status};

use crate::call::CallResult;

/// A helper leg of a call.
pub type Leg = BoxFuture<'static, Result<(), Status>>;

struct LegSlot {
    fut: Option<Leg>,
    necessary: bool,
}

impl LegSlot {
    fn new<F>(fut: F, necessary: bool) -> Self
    where
        F: Future<Output = Result<(), Status>> + Send + 'static,
    {
        Self {
            fut: Some(fut.boxed()),
            necessary,
        }
    }

    fn is_pending_necessary(&self) -> bool {
        self.necessary && self.fut.is_some()
    }
}

/// Poll every unfinished leg once. Returns the first failure.
fn poll_legs(legs: &mut [LegSlot], cx: &mut Context<'_>) -> Option<Status> {
    for leg in legs.iter_mut() {
        let Some(fut) = leg.fut.as_mut() else {
            continue;
        };
        match fut.poll_unpin(cx) {
            Poll::Ready(Ok(())) => leg.fut = None,
            Poll::Ready(Err(status)) => return Some(status),
            Poll::Pending => {}
        }
    }
    None
}

/// Main call future plus push and pull legs.
#[must_use = "futures do nothing unless polled"]
pub struct TryConcurrently {
    main: Option<BoxFuture<'static, CallResult>>,
    result: Option<MetadataBatch>,
    push: Vec<LegSlot>,
    pull: Vec<LegSlot>,
}

impl TryConcurrently {
    pub fn new<F>(main: F) -> Self
    where
        F: Future<Output = CallResult> + Send + 'static,
    {
        Self {
            main: Some(main.boxed()),
            result: None,
            push: Vec::new(),
            pull: Vec::new(),
        }
    }

    /// Add a leg polled before the main future. Dropped once main succeeds.
    pub fn push<F>(mut self, leg: F) -> Self
    where
        F: Future<Output = Result<(), Status>> + Send + 'static,
    {
        self.push.push(LegSlot::new(leg, false));
        self
    }

    /// Add a leg polled before the main future that must finish first.
    pub fn necessary_push<F>(mut self, leg: F) -> Self
    where
        F: Future<Output = Result<(), Status>> + Send + 'static,
    {
        self.push.push(LegSlot::new(leg, true));
        self
    }

    /// Add a leg polled after the main future. Dropped once main succeeds.
    pub fn pull<F>(mut self, leg: F) -> Self
    where
        F: Future<Output = Result<(), Status>> + Send + 'static,
    {
        self.pull.push(LegSlot::new(leg, false));
        self
    }

    /// Add a leg polled after the main future that must finish first.
    pub fn necessary_pull<F>(mut self, leg: F) -> Self
    where
        F: Future<Output = Result<(), Status>> + Send + 'static,
    {
        self.pull.push(LegSlot::new(leg, true));
        self
    }

    fn necessary_done(&self) -> bool {
        !self
            .push
            .iter()
            .chain(self.pull.iter())
            .any(LegSlot::is_pending_necessary)
    }
}

impl Future for TryConcurrently {
    type Output = CallResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<CallResult> {
        let this = self.get_mut();

        if let Some(status) = poll_legs(&mut this.push, cx) {
            return Poll::Ready(Err(status));
        }

        if let Some(main) = this.main.as_mut()
            && let Poll::Ready(result) = main.poll_unpin(cx)
        {
            this.main = None;
            match result {
                Ok(trailers) => this.result = Some(trailers),
                Err(status) => return Poll::Ready(Err(status)),
            }
        }

        if let Some(status) = poll_legs(&mut this.pull, cx) {
            return Poll::Ready(Err(status));
        }

        if this.result.is_some()
            && this.necessary_done()
            && let Some(trailers) = this.result.take()
        {
            this.push.clear();
            this.pull.clear();
            return Poll::Ready(Ok(trailers));
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compression_filter_core::Code;
    use std::future::pending;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::pipe::latch;

    fn ok_main() -> impl Future<Output = CallResult> + Send + 'static {
        async { Ok(MetadataBatch::new()) }
    }

    #[tokio::test]
    async fn test_main_success_drops_optional_legs() {
        let result = TryConcurrently::new(ok_main())
            .push(pending())
            .pull(pending())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_main_failure_returns_immediately() {
        let result = TryConcurrently::new(async { Err(Status::internal("main failed")) })
            .necessary_pull(pending())
            .await;
        assert_eq!(result.unwrap_err().message(), Some("main failed"));
    }

    #[tokio::test]
    async fn test_leg_failure_supersedes_main() {
        let (setter, waiter) = latch::<()>();
        let main = async move {
            // Main would succeed later; the leg fails first.
            waiter.wait().await;
            Ok(MetadataBatch::new())
        };
        let result = TryConcurrently::new(main)
            .necessary_pull(async { Err(Status::resource_exhausted("too big")) })
            .await;
        assert_eq!(result.unwrap_err().code(), Code::ResourceExhausted);
        drop(setter);
    }

    #[tokio::test]
    async fn test_waits_for_necessary_legs() {
        let (setter, waiter) = latch::<()>();
        let finished = Arc::new(AtomicBool::new(false));
        let leg_finished = finished.clone();

        let call = TryConcurrently::new(ok_main()).necessary_pull(async move {
            waiter.wait().await;
            leg_finished.store(true, Ordering::SeqCst);
            Ok(())
        });

        let mut call = Box::pin(call);
        assert!(futures::poll!(call.as_mut()).is_pending());

        setter.set(());
        let result = call.await;
        assert!(result.is_ok());
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_optional_leg_failure_before_main_completes() {
        let result = TryConcurrently::new(pending::<CallResult>())
            .push(async { Err(Status::internal("push leg failed")) })
            .await;
        assert_eq!(result.unwrap_err().code(), Code::Internal);
    }

    #[tokio::test]
    async fn test_push_legs_polled_before_main() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (push_order, main_order, pull_order) = (order.clone(), order.clone(), order.clone());

        let main = async move {
            main_order.lock().unwrap().push("main");
            Ok(MetadataBatch::new())
        };
        let result = TryConcurrently::new(main)
            .necessary_pull(async move {
                pull_order.lock().unwrap().push("pull");
                Ok(())
            })
            .necessary_push(async move {
                push_order.lock().unwrap().push("push");
                Ok(())
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(*order.lock().unwrap(), vec!["push", "main", "pull"]);
    }
}
