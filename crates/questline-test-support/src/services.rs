//! Scripted fakes for the chat, vision and geolocation contracts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use questline_geo::Coordinate;
use questline_verification::{
    ChatReply, ChatRequest, ChatService, GeolocationError, GeolocationProvider, ServiceError,
    VisionReport, VisionRequest, VisionService,
};
use tokio::sync::Notify;

/// A geolocation provider that answers from a script, in order. An
/// exhausted script answers `PositionUnavailable`.
#[derive(Debug, Default)]
pub struct ScriptedGeolocation {
    script: Mutex<VecDeque<Result<Coordinate, GeolocationError>>>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl ScriptedGeolocation {
    /// Create a provider that answers with `script`.
    #[must_use]
    pub fn new(script: Vec<Result<Coordinate, GeolocationError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a provider that reports `position` once.
    #[must_use]
    pub fn at(position: Coordinate) -> Self {
        Self::new(vec![Ok(position)])
    }

    /// Hold every answer until `gate` is notified.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of fixes requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeolocationProvider for ScriptedGeolocation {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GeolocationError::PositionUnavailable))
    }
}

/// A chat service that answers from a script and records every request.
#[derive(Debug, Default)]
pub struct ScriptedChatService {
    script: Mutex<VecDeque<Result<ChatReply, ServiceError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatService {
    /// Create a service that answers with `script`.
    #[must_use]
    pub fn new(script: Vec<Result<ChatReply, ServiceError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a service that replies once with `reply` and `match_count`.
    #[must_use]
    pub fn replying(reply: &str, match_count: u32) -> Self {
        Self::new(vec![Ok(ChatReply {
            reply: reply.to_owned(),
            match_count,
            auto_unlock: match_count >= 2,
            photo_prompt: false,
        })])
    }

    /// Every request received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatService for ScriptedChatService {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ServiceError> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Transport("chat script exhausted".into())))
    }
}

/// A vision service that answers from a script.
#[derive(Debug, Default)]
pub struct ScriptedVisionService {
    script: Mutex<VecDeque<Result<VisionReport, ServiceError>>>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl ScriptedVisionService {
    /// Create a service that answers with `script`.
    #[must_use]
    pub fn new(script: Vec<Result<VisionReport, ServiceError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a service that reports `confidence` once.
    #[must_use]
    pub fn scoring(confidence: u8, reply: &str) -> Self {
        Self::new(vec![Ok(VisionReport {
            matched_identifiers: Vec::new(),
            confidence,
            accepted: confidence >= 80,
            reply: reply.to_owned(),
        })])
    }

    /// Hold every answer until `gate` is notified.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of inspections requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionService for ScriptedVisionService {
    async fn inspect(&self, _request: VisionRequest) -> Result<VisionReport, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Transport("vision script exhausted".into())))
    }
}
