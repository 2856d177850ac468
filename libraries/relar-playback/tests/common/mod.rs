//! Shared helpers for integration tests
//!
//! `MockBackend` records every call, lets a test script failures and a slow
//! preload, and emits backend events through the sink it was connected with.

#![allow(dead_code)]

use async_trait::async_trait;
use relar_playback::{
    AudioBackend, BackendError, BackendEvent, BackendEventSink, BackendResult, PreloadRequest,
    QueueSource, QueueTrack, SourceKind,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ===== Tracks =====

pub fn create_track(id: &str) -> QueueTrack {
    QueueTrack {
        id: id.to_string(),
        path: format!("https://cdn.test/songs/{}.mp3", id),
        title: format!("Track {}", id),
        artist: "Test Artist".to_string(),
        album: Some("Test Album".to_string()),
        duration: Duration::from_secs(200),
        artwork: Some(format!("https://cdn.test/art/{}.jpg", id)),
    }
}

pub fn create_tracks(ids: &[&str]) -> Vec<QueueTrack> {
    ids.iter().map(|id| create_track(id)).collect()
}

pub fn album() -> QueueSource {
    QueueSource::new(SourceKind::Album, "album-1", "Test Album")
}

// ===== Mock Backend =====

/// Call recorded by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Preload(String),
    AlbumArt(String),
    Play,
    Pause,
    Stop,
    SetVolume(f32),
    SetCurrentTime(f64),
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    sink: Option<BackendEventSink>,
    failing_paths: HashSet<String>,
    preload_delay: Option<Duration>,
    fail_album_art: bool,
    current_time: f64,
    duration: f64,
    time_polls: usize,
    disconnects: usize,
    keep_sink: bool,
}

/// Scriptable in-memory backend
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.set_duration(200.0);
        backend
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Paths passed to `preload`, in order
    pub fn preloaded(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Preload(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn fail_preload_of(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_paths
            .insert(path.to_string());
    }

    pub fn set_preload_delay(&self, delay: Duration) {
        self.state.lock().unwrap().preload_delay = Some(delay);
    }

    pub fn fail_album_art(&self) {
        self.state.lock().unwrap().fail_album_art = true;
    }

    /// Position reported by the next `current_time()` poll
    pub fn set_position(&self, seconds: f64) {
        self.state.lock().unwrap().current_time = seconds;
    }

    pub fn set_duration(&self, seconds: f64) {
        self.state.lock().unwrap().duration = seconds;
    }

    pub fn time_polls(&self) -> usize {
        self.state.lock().unwrap().time_polls
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    /// Hold on to the sink after `disconnect`, like a native layer that
    /// never unregisters its listener
    pub fn keep_sink_on_disconnect(&self) {
        self.state.lock().unwrap().keep_sink = true;
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().sink.is_some()
    }

    /// Push an event as the native layer would
    pub fn emit(&self, event: BackendEvent) -> bool {
        let sink = self.state.lock().unwrap().sink.clone();
        sink.is_some_and(|sink| sink.emit(event))
    }

    pub fn as_backend(&self) -> Arc<dyn AudioBackend> {
        Arc::new(self.clone())
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl AudioBackend for MockBackend {
    fn connect(&self, sink: BackendEventSink) {
        self.state.lock().unwrap().sink = Some(sink);
    }

    fn disconnect(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.keep_sink {
            state.sink = None;
        }
        state.disconnects += 1;
    }

    async fn preload(&self, request: &PreloadRequest) -> BackendResult<()> {
        self.record(Call::Preload(request.path.clone()));

        let (delay, failing) = {
            let state = self.state.lock().unwrap();
            (
                state.preload_delay,
                state.failing_paths.contains(&request.path),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if failing {
            return Err(BackendError::InvalidSource {
                path: request.path.clone(),
                reason: "not found".to_string(),
            });
        }

        self.state.lock().unwrap().current_time = 0.0;
        Ok(())
    }

    async fn set_album_art(&self, url: &str) -> BackendResult<()> {
        self.record(Call::AlbumArt(url.to_string()));
        if self.state.lock().unwrap().fail_album_art {
            return Err(BackendError::Other("artwork download failed".to_string()));
        }
        Ok(())
    }

    async fn play(&self) -> BackendResult<()> {
        self.record(Call::Play);
        Ok(())
    }

    async fn pause(&self) -> BackendResult<()> {
        self.record(Call::Pause);
        Ok(())
    }

    async fn stop(&self) -> BackendResult<()> {
        self.record(Call::Stop);
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> BackendResult<()> {
        self.record(Call::SetVolume(volume));
        Ok(())
    }

    async fn current_time(&self) -> BackendResult<f64> {
        let mut state = self.state.lock().unwrap();
        state.time_polls += 1;
        Ok(state.current_time)
    }

    async fn set_current_time(&self, seconds: f64) -> BackendResult<()> {
        self.record(Call::SetCurrentTime(seconds));
        self.state.lock().unwrap().current_time = seconds;
        Ok(())
    }

    async fn duration(&self) -> BackendResult<f64> {
        Ok(self.state.lock().unwrap().duration)
    }
}
