//! Render ownership for one mix session.
//!
//! A session owns at most one render. Starting a new one cancels whatever
//! the session still owns, and a render that was superseded reports
//! `MixError::Cancelled` even if its last block already finished, so a
//! session never hands out two results for overlapping requests.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use castmix_core::{MixError, MixSettings, RenderResult, Result};
use crossbeam_channel::{Receiver, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::graph::MixInputs;
use crate::render::{RenderCancel, RenderProgress};

/// Serializes renders for one mix.
#[derive(Debug)]
pub struct MixSession {
    sample_rate: u32,
    current: Mutex<Option<RenderCancel>>,
}

impl MixSession {
    /// Create a session rendering at `sample_rate`.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            current: Mutex::new(None),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Whether the session currently owns a render.
    pub fn is_busy(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Cancel the render this session owns, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.current.lock().take() {
            info!("cancelling session render");
            token.cancel();
        }
    }

    /// Take ownership for a new render, cancelling the previous one.
    fn begin(&self) -> RenderCancel {
        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            info!("superseding in-flight render");
            previous.cancel();
        }
        let token = RenderCancel::new();
        *current = Some(token.clone());
        token
    }

    /// Give up ownership if `token` still holds it. A newer render keeps its own.
    fn release(&self, token: &RenderCancel) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|c| c.same_as(token)) {
            *current = None;
        }
    }

    /// Release ownership. Cancellation is re-checked under the lock so a
    /// render superseded at the last moment cannot slip its result out.
    fn finish(&self, token: &RenderCancel, result: Result<RenderResult>) -> Result<RenderResult> {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|c| c.same_as(token)) {
            *current = None;
        }
        if token.is_cancelled() {
            return Err(MixError::Cancelled);
        }
        result
    }

    /// Render on the calling thread.
    pub fn render(
        &self,
        inputs: &MixInputs,
        settings: &MixSettings,
        on_progress: impl FnMut(RenderProgress),
    ) -> Result<RenderResult> {
        let token = self.begin();
        let result = crate::render_mix(inputs, settings, self.sample_rate, &token, on_progress);
        self.finish(&token, result)
    }

    /// Render on a background thread.
    ///
    /// The returned handle delivers progress and the final result over
    /// channels and can cancel the render.
    pub fn spawn(self: &Arc<Self>, inputs: MixInputs, settings: MixSettings) -> Result<RenderHandle> {
        let token = self.begin();
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let (progress_tx, progress_rx) = crossbeam_channel::unbounded();

        let session = Arc::clone(self);
        let worker_token = token.clone();
        let spawned = thread::Builder::new()
            .name("castmix-render".into())
            .spawn(move || {
                let result = crate::render_mix(
                    &inputs,
                    &settings,
                    session.sample_rate,
                    &worker_token,
                    |p| {
                        let _ = progress_tx.send(p);
                    },
                );
                let result = session.finish(&worker_token, result);
                debug!(ok = result.is_ok(), "render thread finished");
                let _ = result_tx.send(result);
            });
        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                warn!(error = %e, "failed to start render thread");
                self.release(&token);
                return Err(e.into());
            }
        };

        Ok(RenderHandle {
            cancel: token,
            result: result_rx,
            progress: progress_rx,
            thread: Some(thread),
        })
    }
}

/// A render running on a background thread.
#[derive(Debug)]
pub struct RenderHandle {
    cancel: RenderCancel,
    result: Receiver<Result<RenderResult>>,
    progress: Receiver<RenderProgress>,
    thread: Option<JoinHandle<()>>,
}

impl RenderHandle {
    /// Request cancellation. The result will be `MixError::Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Progress updates, one per rendered block.
    pub fn progress(&self) -> &Receiver<RenderProgress> {
        &self.progress
    }

    /// The result, if the render has finished.
    pub fn try_result(&self) -> Option<Result<RenderResult>> {
        match self.result.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(MixError::Internal(
                "render thread exited without a result".into(),
            ))),
        }
    }

    /// Block until the render finishes.
    pub fn wait(mut self) -> Result<RenderResult> {
        let result = self.result.recv().map_err(|_| {
            MixError::Internal("render thread exited without a result".into())
        });
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        result?
    }
}
