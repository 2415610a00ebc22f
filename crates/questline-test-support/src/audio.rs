//! Fakes for the narration contracts.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use questline_narration::{
    AssetSource, AudioClip, AudioOutput, NarrationError, SpeechSynthesizer, SynthesisRequest,
};
use tokio::sync::watch;

/// Something the recording output performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Performance {
    /// A clip, by its bytes.
    Clip(Vec<u8>),
    /// Text spoken with the device voice.
    Speech(String),
}

#[derive(Debug, Default)]
struct Channel {
    current: Option<usize>,
    next_token: usize,
    max_audible: usize,
}

/// An audio output that models a single channel.
///
/// Each performance lasts `duration` unless halted. Starting a performance
/// while another is still audible counts as overlap, visible through
/// [`max_audible`](Self::max_audible).
#[derive(Debug)]
pub struct RecordingAudioOutput {
    duration: Duration,
    channel: Mutex<Channel>,
    performances: Mutex<Vec<Performance>>,
    halt_signal: watch::Sender<u64>,
    resume_failures: AtomicUsize,
    resumes: AtomicUsize,
    halts: AtomicUsize,
    fail_clips: AtomicBool,
}

impl RecordingAudioOutput {
    /// Create an output whose performances last `duration`.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            channel: Mutex::new(Channel::default()),
            performances: Mutex::new(Vec::new()),
            halt_signal: watch::Sender::new(0),
            resume_failures: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            halts: AtomicUsize::new(0),
            fail_clips: AtomicBool::new(false),
        }
    }

    /// Make the next `count` resume calls fail.
    #[must_use]
    pub fn failing_resumes(self, count: usize) -> Self {
        self.resume_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Make every clip fail to play (device speech still works).
    #[must_use]
    pub fn failing_clips(self) -> Self {
        self.fail_clips.store(true, Ordering::SeqCst);
        self
    }

    /// Everything started so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn performances(&self) -> Vec<Performance> {
        self.performances.lock().unwrap().clone()
    }

    /// Highest number of simultaneously audible performances observed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn max_audible(&self) -> usize {
        self.channel.lock().unwrap().max_audible
    }

    /// Returns `true` while something is audible.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn is_audible(&self) -> bool {
        self.channel.lock().unwrap().current.is_some()
    }

    /// Successful resume calls.
    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    /// Halt calls.
    pub fn halts(&self) -> usize {
        self.halts.load(Ordering::SeqCst)
    }

    fn begin(&self, performance: Performance) -> usize {
        self.performances.lock().unwrap().push(performance);
        let mut channel = self.channel.lock().unwrap();
        let audible = if channel.current.is_some() { 2 } else { 1 };
        channel.max_audible = channel.max_audible.max(audible);
        channel.next_token += 1;
        let token = channel.next_token;
        channel.current = Some(token);
        token
    }

    fn finish(&self, token: usize) {
        let mut channel = self.channel.lock().unwrap();
        if channel.current == Some(token) {
            channel.current = None;
        }
    }

    async fn perform(&self, performance: Performance) {
        let mut halted = self.halt_signal.subscribe();
        let token = self.begin(performance);
        tokio::select! {
            () = tokio::time::sleep(self.duration) => self.finish(token),
            _ = halted.changed() => {}
        }
    }
}

#[async_trait]
impl AudioOutput for RecordingAudioOutput {
    async fn resume(&self) -> Result<(), NarrationError> {
        let failures = self.resume_failures.load(Ordering::SeqCst);
        if failures > 0 {
            self.resume_failures.store(failures - 1, Ordering::SeqCst);
            return Err(NarrationError::Playback("audio context suspended".into()));
        }
        self.resumes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn play_clip(&self, clip: AudioClip) -> Result<(), NarrationError> {
        if self.fail_clips.load(Ordering::SeqCst) {
            return Err(NarrationError::Playback("decode failed".into()));
        }
        self.perform(Performance::Clip(clip.bytes.to_vec())).await;
        Ok(())
    }

    async fn speak(&self, text: &str) -> Result<(), NarrationError> {
        self.perform(Performance::Speech(text.to_owned())).await;
        Ok(())
    }

    fn halt(&self) {
        self.halts.fetch_add(1, Ordering::SeqCst);
        self.channel.lock().unwrap().current = None;
        self.halt_signal.send_modify(|generation| *generation += 1);
    }
}

/// A speech synthesizer that answers from a script. An exhausted script
/// renders the text's bytes as the clip.
#[derive(Debug, Default)]
pub struct ScriptedSynthesizer {
    script: Mutex<VecDeque<Result<AudioClip, NarrationError>>>,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl ScriptedSynthesizer {
    /// Create a synthesizer that answers with `script` first.
    #[must_use]
    pub fn new(script: Vec<Result<AudioClip, NarrationError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of synthesis calls so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioClip, NarrationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(AudioClip::mpeg(request.text.as_bytes().to_vec())))
    }
}

/// An asset source serving a fixed set of clips.
#[derive(Debug, Default)]
pub struct StaticAssetSource {
    clips: HashMap<String, AudioClip>,
    failing: bool,
}

impl StaticAssetSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clip under `key`.
    #[must_use]
    pub fn with(mut self, key: &str, bytes: &[u8]) -> Self {
        self.clips
            .insert(key.to_owned(), AudioClip::mpeg(bytes.to_vec()));
        self
    }

    /// Create a source whose every fetch fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            clips: HashMap::new(),
            failing: true,
        }
    }
}

#[async_trait]
impl AssetSource for StaticAssetSource {
    async fn fetch(&self, key: &str) -> Result<Option<AudioClip>, NarrationError> {
        if self.failing {
            return Err(NarrationError::Unavailable("asset host unreachable".into()));
        }
        Ok(self.clips.get(key).cloned())
    }
}
