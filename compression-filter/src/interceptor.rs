//! Per-message interception of a call's message stream.
//!
//! A [`StreamInterceptor`] takes over one message stream of a call by
//! splicing a fresh pipe into the call args. The rest of the chain keeps
//! using the slot as before and never learns that a transform sits between
//! it and the original end.
//!
//! ```text
//! before:  source ───────────────────────────────> next stage
//! after:   source ──> [interceptor: f(item)] ──> fresh pipe ──> next stage
//! ```

use std::future::Future;

use compression_filter_core::Status;

use crate::pipe::{PipeReceiver, PipeSender, pipe};

/// A pipe end that can be taken over by a [`StreamInterceptor`].
pub trait Interceptable: Sized {
    type Item;

    /// Replace `slot` with the end of a fresh pipe, returning the source and
    /// sink the interceptor should pump between.
    fn splice(slot: &mut Self) -> (PipeReceiver<Self::Item>, PipeSender<Self::Item>);
}

impl<T> Interceptable for PipeReceiver<T> {
    type Item = T;

    fn splice(slot: &mut Self) -> (PipeReceiver<T>, PipeSender<T>) {
        let (tx, rx) = pipe();
        let source = std::mem::replace(slot, rx);
        (source, tx)
    }
}

impl<T> Interceptable for PipeSender<T> {
    type Item = T;

    fn splice(slot: &mut Self) -> (PipeReceiver<T>, PipeSender<T>) {
        let (tx, rx) = pipe();
        let sink = std::mem::replace(slot, tx);
        (rx, sink)
    }
}

/// Exclusive owner of one intercepted message stream.
///
/// The original pipe end is moved into the interceptor, so it cannot be
/// intercepted twice. Intercepting the same slot again wraps the stage that
/// is already there.
#[derive(Debug)]
pub struct StreamInterceptor<T> {
    source: PipeReceiver<T>,
    sink: PipeSender<T>,
}

impl<T> StreamInterceptor<T>
where
    T: Send + 'static,
{
    /// Take over the stream currently in `slot`.
    pub fn intercept<S>(slot: &mut S) -> Self
    where
        S: Interceptable<Item = T>,
    {
        let (source, sink) = S::splice(slot);
        Self { source, sink }
    }

    /// Pump the stream to completion, applying `f` to every item in order.
    ///
    /// Resolves to `Ok(())` when the source ends, and to a cancelled status
    /// if the sink is closed first.
    pub fn take_and_run<F>(self, mut f: F) -> impl Future<Output = Result<(), Status>> + Send
    where
        F: FnMut(T) -> T + Send + 'static,
    {
        self.take_and_run_fallible(move |item| Ok::<_, Status>(f(item)))
    }

    /// Like [`take_and_run`](Self::take_and_run) with a fallible transform.
    ///
    /// The first failure ends the pump with that status; the failing item is
    /// not forwarded.
    pub fn take_and_run_fallible<F, E>(
        self,
        mut f: F,
    ) -> impl Future<Output = Result<(), Status>> + Send
    where
        F: FnMut(T) -> Result<T, E> + Send + 'static,
        E: Into<Status> + Send + 'static,
    {
        let Self { mut source, sink } = self;
        async move {
            while let Some(item) = source.next().await {
                let item = f(item).map_err(Into::into)?;
                if !sink.push(item).await {
                    return Err(Status::cancelled("message stream closed"));
                }
            }
            Ok(())
        }
    }
}
