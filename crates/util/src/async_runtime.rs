//! Async runtime helpers for blocking callers.
//!
//! The action core is synchronous, but bounding an opaque blocking call (such as
//! attaching to an application's automation endpoint) needs a timer. These
//! helpers drive Tokio from synchronous code for exactly that purpose.

use std::{future::Future, thread, time::Duration};

use anyhow::anyhow;
use tokio::{
    runtime::{Handle, RuntimeFlavor},
    sync::oneshot,
    task, time,
};

/// Execute an async future from synchronous code.
///
/// Reuses the current multi-threaded runtime when called from inside one and
/// falls back to a single-threaded runtime for call sites outside Tokio. A
/// current-thread runtime cannot be blocked in place, so the future then runs
/// on a short-lived helper thread.
pub fn block_on_future<F, T>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => task::block_in_place(|| handle.block_on(future)),
        Ok(_) => thread::scope(|scope| {
            scope
                .spawn(move || block_on_fresh_runtime(future))
                .join()
                .map_err(|_| anyhow!("runtime helper thread panicked"))?
        }),
        Err(_) => block_on_fresh_runtime(future),
    }
}

fn block_on_fresh_runtime<F, T>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| anyhow!(error))?
        .block_on(future)
}

/// Run `work` on a dedicated thread and wait at most `timeout` for its result.
///
/// Returns `Ok(Some(output))` when the work finishes in time and `Ok(None)`
/// when the deadline passes first. The worker thread is never interrupted; if it
/// finishes after the caller gave up, its output is handed to `on_abandoned` so
/// the caller can release whatever the work produced.
pub fn run_blocking_with_timeout<T, W, A>(timeout: Duration, work: W, on_abandoned: A) -> anyhow::Result<Option<T>>
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
    A: FnOnce(T) + Send + 'static,
{
    let (sender, mut receiver) = oneshot::channel();
    thread::Builder::new()
        .name("cogwork-blocking".into())
        .spawn(move || {
            let output = work();
            if let Err(output) = sender.send(output) {
                on_abandoned(output);
            }
        })
        .map_err(|error| anyhow!("could not spawn blocking worker: {error}"))?;

    block_on_future(async move {
        match time::timeout(timeout, &mut receiver).await {
            Ok(Ok(output)) => Ok(Some(output)),
            Ok(Err(_)) => Err(anyhow!("blocking worker exited without producing a result")),
            Err(_) => {
                // Closing first means a send racing the deadline either lands here or
                // fails over to `on_abandoned`; the output is never silently dropped.
                receiver.close();
                Ok(receiver.try_recv().ok())
            }
        }
    })
}
