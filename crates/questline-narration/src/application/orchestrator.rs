//! Single-slot narration playback.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::providers::{NarrationProvider, Rendition};
use crate::domain::contracts::AudioOutput;
use crate::domain::unit::NarrationContent;

/// Time budget for one provider to produce a rendition. Generous enough for
/// the synthesis provider to exhaust its own retries first.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(200);

struct ActivePlayback {
    id: u64,
    cancel: watch::Sender<bool>,
}

/// Owns the audio channel.
///
/// At most one playback is active at any instant: starting a new one, or
/// calling [`stop`](Self::stop), cancels the previous one and halts the
/// output before anything else is performed.
pub struct NarrationOrchestrator {
    output: Arc<dyn AudioOutput>,
    providers: Vec<Arc<dyn NarrationProvider>>,
    stage_timeout: Duration,
    unlocked: AtomicBool,
    unlock_guard: tokio::sync::Mutex<()>,
    active: Mutex<Option<ActivePlayback>>,
    next_id: AtomicU64,
}

impl NarrationOrchestrator {
    /// Creates an orchestrator trying `providers` in order.
    #[must_use]
    pub fn new(output: Arc<dyn AudioOutput>, providers: Vec<Arc<dyn NarrationProvider>>) -> Self {
        Self {
            output,
            providers,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            unlocked: AtomicBool::new(false),
            unlock_guard: tokio::sync::Mutex::new(()),
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Replaces the per-stage time budget.
    #[must_use]
    pub fn with_stage_timeout(mut self, stage_timeout: Duration) -> Self {
        self.stage_timeout = stage_timeout;
        self
    }

    /// Resumes the audio output once. Safe to call on every gesture.
    ///
    /// A failed resume is logged and leaves the orchestrator locked so the
    /// next gesture tries again.
    pub async fn unlock(&self) {
        if self.is_unlocked() {
            return;
        }
        let _guard = self.unlock_guard.lock().await;
        if self.is_unlocked() {
            return;
        }
        match self.output.resume().await {
            Ok(()) => {
                self.unlocked.store(true, Ordering::Release);
                info!("audio unlocked");
            }
            Err(error) => warn!(error = %error, "audio unlock failed"),
        }
    }

    /// Returns `true` once the output has been resumed.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::Acquire)
    }

    /// Returns `true` while a playback holds the slot.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.active.lock().is_ok_and(|active| active.is_some())
    }

    /// Cancels any in-flight playback and silences the output.
    /// Unconditional; safe when nothing is playing.
    pub fn stop(&self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(previous) = active.take() {
                let _ = previous.cancel.send(true);
                debug!(playback = previous.id, "narration stopped");
            }
        }
        self.output.halt();
    }

    /// Plays `content`, replacing whatever was playing.
    ///
    /// Resolves when playback ends naturally, is cancelled, or every
    /// provider has failed. Never fails.
    pub async fn play(&self, content: NarrationContent) {
        if !self.is_unlocked() {
            self.stop();
            debug!(unit = %content.unit, "audio locked; narration skipped");
            return;
        }

        let (id, mut cancelled) = self.claim_slot();

        tokio::select! {
            biased;
            _ = cancelled.wait_for(|cancelled| *cancelled) => {
                debug!(playback = id, unit = %content.unit, "narration cancelled");
            }
            performed = self.perform(&content) => {
                if !performed {
                    warn!(unit = %content.unit, "every narration stage failed; continuing silently");
                }
            }
        }

        self.release_slot(id);
    }

    /// Plays `content` on a background task.
    pub fn spawn_play(self: &Arc<Self>, content: NarrationContent) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.play(content).await })
    }

    /// Stops the previous playback and takes the slot, atomically.
    fn claim_slot(&self) -> (u64, watch::Receiver<bool>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (cancel, receiver) = watch::channel(false);
        match self.active.lock() {
            Ok(mut active) => {
                if let Some(previous) = active.replace(ActivePlayback { id, cancel }) {
                    let _ = previous.cancel.send(true);
                    debug!(playback = previous.id, "narration replaced");
                }
                self.output.halt();
            }
            Err(_) => self.output.halt(),
        }
        (id, receiver)
    }

    fn release_slot(&self, id: u64) {
        if let Ok(mut active) = self.active.lock() {
            if active.as_ref().is_some_and(|current| current.id == id) {
                *active = None;
            }
        }
    }

    /// Walks the provider chain. Returns `true` if something was performed.
    async fn perform(&self, content: &NarrationContent) -> bool {
        for provider in &self.providers {
            let rendition =
                match tokio::time::timeout(self.stage_timeout, provider.render(content)).await {
                    Ok(Ok(rendition)) => rendition,
                    Ok(Err(error)) => {
                        warn!(provider = provider.name(), unit = %content.unit, error = %error, "narration stage failed");
                        continue;
                    }
                    Err(_) => {
                        warn!(provider = provider.name(), unit = %content.unit, "narration stage timed out");
                        continue;
                    }
                };

            let played = match rendition {
                Rendition::Clip(clip) => self.output.play_clip(clip).await,
                Rendition::DeviceSpeech(text) => self.output.speak(&text).await,
            };
            match played {
                Ok(()) => {
                    debug!(provider = provider.name(), unit = %content.unit, "narration finished");
                    return true;
                }
                Err(error) => {
                    warn!(provider = provider.name(), unit = %content.unit, error = %error, "narration playback failed");
                }
            }
        }
        false
    }
}
