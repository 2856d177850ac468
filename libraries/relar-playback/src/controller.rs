//! Playback controller
//!
//! A single tokio task owns the queue, the session state and the (optional)
//! backend connection. Callers talk to it through a cloneable
//! [`PlaybackHandle`]; the backend talks to it through the
//! [`BackendEventSink`] it receives on attach. Every transition republishes a
//! [`PlaybackSnapshot`] on a watch channel.
//!
//! Loads (`preload` + `play`) race against the inbox: a newer user
//! transition drops the outstanding load, everything else waits until it
//! finishes. Backend events carry the load generation current when they were
//! emitted, so a late or duplicated `complete` never advances the queue twice.

use crate::backend::{AudioBackend, BackendEvent, BackendEventSink, PreloadRequest, StampedEvent};
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackSnapshot;
use crate::queue::{QueueManager, Removal, RemovalOutcome};
use crate::types::{PlayMode, PlaybackConfig, QueueSource, QueueTrack, TransportState};
use crate::volume::Volume;
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest accepted polling period
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

type Reply<T> = oneshot::Sender<Result<T>>;

/// Requests sent from handles to the controller task
enum Command {
    SetQueue {
        tracks: Vec<QueueTrack>,
        source: QueueSource,
        start: Option<usize>,
        reply: Reply<()>,
    },
    JumpTo {
        position: usize,
        reply: Reply<()>,
    },
    Next(Reply<()>),
    Previous(Reply<()>),
    Pause(Reply<()>),
    Resume(Reply<()>),
    TogglePlayback(Reply<()>),
    Seek {
        seconds: f64,
        reply: Reply<f64>,
    },
    SetVolume {
        volume: f32,
        /// `None` once the snapshot has been updated and only the backend
        /// call is left
        reply: Option<Reply<f32>>,
    },
    SetShuffle {
        enabled: bool,
        reply: Reply<()>,
    },
    ToggleShuffle(Reply<bool>),
    SetPlayMode {
        mode: PlayMode,
        reply: Reply<()>,
    },
    CyclePlayMode(Reply<PlayMode>),
    RemoveTrack {
        original_index: usize,
        reply: Reply<QueueTrack>,
    },
    RemoveAt {
        position: usize,
        reply: Reply<QueueTrack>,
    },
    Enqueue {
        track: QueueTrack,
        reply: Reply<()>,
    },
    Clear(Reply<()>),
    AttachBackend {
        backend: Arc<dyn AudioBackend>,
        reply: Reply<()>,
    },
    DetachBackend(Reply<()>),
    Shutdown(Reply<()>),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::SetQueue { .. } => "set_queue",
            Command::JumpTo { .. } => "jump_to",
            Command::Next(_) => "next",
            Command::Previous(_) => "previous",
            Command::Pause(_) => "pause",
            Command::Resume(_) => "resume",
            Command::TogglePlayback(_) => "toggle_playback",
            Command::Seek { .. } => "seek",
            Command::SetVolume { .. } => "set_volume",
            Command::SetShuffle { .. } => "set_shuffle",
            Command::ToggleShuffle(_) => "toggle_shuffle",
            Command::SetPlayMode { .. } => "set_play_mode",
            Command::CyclePlayMode(_) => "cycle_play_mode",
            Command::RemoveTrack { .. } => "remove_track",
            Command::RemoveAt { .. } => "remove_at",
            Command::Enqueue { .. } => "enqueue",
            Command::Clear(_) => "clear",
            Command::AttachBackend { .. } => "attach_backend",
            Command::DetachBackend(_) => "detach_backend",
            Command::Shutdown(_) => "shutdown",
        }
    }
}

/// One unit of work for the controller task
enum Inbound {
    Command(Command),
    Event(StampedEvent),
    /// Every handle has been dropped
    Closed,
}

impl Inbound {
    /// Whether this drops an outstanding load
    fn supersedes_load(&self) -> bool {
        match self {
            Inbound::Command(command) => matches!(
                command,
                Command::SetQueue { .. }
                    | Command::JumpTo { .. }
                    | Command::Next(_)
                    | Command::Previous(_)
                    | Command::Clear(_)
                    | Command::DetachBackend(_)
                    | Command::Shutdown(_)
            ),
            Inbound::Event(stamped) => {
                matches!(stamped.event, BackendEvent::Next | BackendEvent::Previous)
            }
            Inbound::Closed => true,
        }
    }
}

enum Wake {
    Inbound(Inbound),
    Poll,
}

enum LoadWake {
    Finished(Result<()>),
    Inbound(Inbound),
}

/// Direction of a user skip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Next,
    Previous,
}

/// Controller task state
///
/// Only reachable through [`PlaybackController::spawn`]; everything else
/// goes through the returned handle.
pub struct PlaybackController {
    config: PlaybackConfig,
    queue: QueueManager,
    backend: Option<Arc<dyn AudioBackend>>,

    transport: TransportState,
    current_time: f64,
    duration: f64,
    volume: Volume,
    last_error: Option<String>,

    /// Bumped on every load and every drop to idle
    generation: Arc<AtomicU64>,

    /// Id of the sink handed to the attached backend
    connection: u64,

    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedReceiver<StampedEvent>,
    event_tx: mpsc::UnboundedSender<StampedEvent>,

    /// Work received while a load was outstanding
    deferred: VecDeque<Inbound>,

    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    poll: Interval,
}

impl PlaybackController {
    /// Spawn the controller on the current tokio runtime
    ///
    /// The task runs until [`PlaybackHandle::shutdown`] is called or every
    /// handle is dropped.
    pub fn spawn(config: PlaybackConfig) -> PlaybackHandle {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();

        let period = config.poll_interval.max(MIN_POLL_INTERVAL);
        let mut poll = interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let queue = QueueManager::with_settings(config.shuffle, config.play_mode);
        let volume = Volume::new(config.volume);

        let (snapshot_tx, snapshot) = watch::channel(PlaybackSnapshot::default());

        let controller = Self {
            config,
            queue,
            backend: None,
            transport: TransportState::Idle,
            current_time: 0.0,
            duration: 0.0,
            volume,
            last_error: None,
            generation: Arc::new(AtomicU64::new(0)),
            connection: 0,
            commands,
            events,
            event_tx,
            deferred: VecDeque::new(),
            snapshot_tx,
            poll,
        };
        controller.publish();

        tokio::spawn(controller.run());

        PlaybackHandle {
            commands: command_tx,
            snapshot,
        }
    }

    async fn run(mut self) {
        info!("Playback controller started");

        loop {
            let wake = match self.deferred.pop_front() {
                Some(inbound) => Wake::Inbound(inbound),
                None => self.next_wake().await,
            };

            let flow = match wake {
                Wake::Poll => {
                    self.poll_current_time().await;
                    ControlFlow::Continue(())
                }
                Wake::Inbound(inbound) => self.dispatch(inbound).await,
            };

            if flow.is_break() {
                break;
            }
        }

        info!("Playback controller stopped");
    }

    async fn next_wake(&mut self) -> Wake {
        let polling = self.transport == TransportState::Playing;

        tokio::select! {
            command = self.commands.recv() => Wake::Inbound(match command {
                Some(command) => Inbound::Command(command),
                None => Inbound::Closed,
            }),
            Some(event) = self.events.recv() => Wake::Inbound(Inbound::Event(event)),
            _ = self.poll.tick(), if polling => Wake::Poll,
        }
    }

    async fn dispatch(&mut self, inbound: Inbound) -> ControlFlow<()> {
        match inbound {
            Inbound::Closed => {
                debug!("All playback handles dropped");
                self.shutdown().await;
                ControlFlow::Break(())
            }
            Inbound::Command(command) => self.handle_command(command).await,
            Inbound::Event(stamped) => {
                self.handle_event(stamped).await;
                ControlFlow::Continue(())
            }
        }
    }

    // ===== Commands =====

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        debug!("Playback command: {}", command.name());

        match command {
            Command::SetQueue {
                tracks,
                source,
                start,
                reply,
            } => {
                let result = self.set_queue(tracks, source, start).await;
                let _ = reply.send(result);
            }
            Command::JumpTo { position, reply } => {
                let result = match self.queue.jump_to(position) {
                    Ok(track) => self.play_track(track).await,
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            Command::Next(reply) => {
                let result = self.skip(Skip::Next).await;
                let _ = reply.send(result);
            }
            Command::Previous(reply) => {
                let result = self.previous().await;
                let _ = reply.send(result);
            }
            Command::Pause(reply) => {
                let result = self.pause().await;
                let _ = reply.send(result);
            }
            Command::Resume(reply) => {
                let result = self.resume().await;
                let _ = reply.send(result);
            }
            Command::TogglePlayback(reply) => {
                let result = if self.transport == TransportState::Playing {
                    self.pause().await
                } else {
                    self.resume().await
                };
                let _ = reply.send(result);
            }
            Command::Seek { seconds, reply } => {
                let result = self.seek(seconds).await;
                let _ = reply.send(result);
            }
            Command::SetVolume { volume, reply } => {
                self.apply_volume(volume, reply);
                self.forward_volume().await;
            }
            Command::SetShuffle { enabled, reply } => {
                let result = self.queue.set_shuffle(enabled);
                self.publish();
                let _ = reply.send(result);
            }
            Command::ToggleShuffle(reply) => {
                let enabled = !self.queue.is_shuffled();
                let result = self.queue.set_shuffle(enabled).map(|()| enabled);
                self.publish();
                let _ = reply.send(result);
            }
            Command::SetPlayMode { mode, reply } => {
                self.queue.set_play_mode(mode);
                self.publish();
                let _ = reply.send(Ok(()));
            }
            Command::CyclePlayMode(reply) => {
                let mode = self.queue.cycle_play_mode();
                debug!("Play mode is now {:?}", mode);
                self.publish();
                let _ = reply.send(Ok(mode));
            }
            Command::RemoveTrack {
                original_index,
                reply,
            } => {
                let result = self.remove(|queue| queue.remove_track(original_index)).await;
                let _ = reply.send(result);
            }
            Command::RemoveAt { position, reply } => {
                let result = self.remove(|queue| queue.remove_at(position)).await;
                let _ = reply.send(result);
            }
            Command::Enqueue { track, reply } => {
                debug!("Enqueued '{}'", track.title);
                self.queue.enqueue(track);
                self.publish();
                let _ = reply.send(Ok(()));
            }
            Command::Clear(reply) => {
                self.queue.clear();
                self.go_idle(true).await;
                let _ = reply.send(Ok(()));
            }
            Command::AttachBackend { backend, reply } => {
                self.attach_backend(backend).await;
                let _ = reply.send(Ok(()));
            }
            Command::DetachBackend(reply) => {
                self.detach_backend().await;
                let _ = reply.send(Ok(()));
            }
            Command::Shutdown(reply) => {
                self.shutdown().await;
                let _ = reply.send(Ok(()));
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    async fn set_queue(
        &mut self,
        tracks: Vec<QueueTrack>,
        source: QueueSource,
        start: Option<usize>,
    ) -> Result<()> {
        self.queue.set_queue(tracks, source, start)?;

        match self.queue.current().cloned() {
            Some(track) => self.play_track(track).await,
            None => {
                self.go_idle(true).await;
                Ok(())
            }
        }
    }

    async fn skip(&mut self, direction: Skip) -> Result<()> {
        let respect_repeat_one = self.config.skip_respects_repeat_one;
        let track = match (direction, respect_repeat_one) {
            (Skip::Next, false) => self.queue.skip_next()?,
            (Skip::Next, true) => self.queue.advance()?,
            (Skip::Previous, false) => self.queue.skip_previous()?,
            (Skip::Previous, true) => self.queue.retreat()?,
        };

        self.play_or_idle(track).await
    }

    async fn previous(&mut self) -> Result<()> {
        let restart = self.config.restart_threshold.is_some_and(|threshold| {
            self.has_loaded_track() && self.current_time > threshold.as_secs_f64()
        });

        if restart {
            debug!("Restarting current track at {:.1}s", self.current_time);
            let backend = self.require_backend()?;
            if let Err(e) = backend.set_current_time(0.0).await {
                return Err(self.fail(e.into()));
            }
            self.current_time = 0.0;
            self.publish();
            return Ok(());
        }

        self.skip(Skip::Previous).await
    }

    async fn pause(&mut self) -> Result<()> {
        let backend = self.require_backend()?;
        if self.transport != TransportState::Playing {
            return Ok(());
        }

        if let Err(e) = backend.pause().await {
            return Err(self.fail(e.into()));
        }

        self.transport = TransportState::Paused;
        self.publish();
        Ok(())
    }

    async fn resume(&mut self) -> Result<()> {
        let backend = self.require_backend()?;

        match self.transport {
            TransportState::Playing | TransportState::Loading => Ok(()),
            TransportState::Paused => {
                if let Err(e) = backend.play().await {
                    return Err(self.fail(e.into()));
                }
                self.enter_playing();
                self.publish();
                Ok(())
            }
            TransportState::Idle => {
                // Restart the selected track, or start over from the top
                let track = match self.queue.current().cloned() {
                    Some(track) => Some(track),
                    None if self.queue.is_empty() => {
                        return Err(PlaybackError::EmptyQueueOperation("resume"));
                    }
                    None => self.queue.advance()?,
                };
                self.play_or_idle(track).await
            }
        }
    }

    async fn seek(&mut self, seconds: f64) -> Result<f64> {
        if !seconds.is_finite() {
            return Err(PlaybackError::SeekOutOfRange(seconds));
        }
        if !self.has_loaded_track() {
            return Err(PlaybackError::NoTrackLoaded);
        }
        let backend = self.require_backend()?;

        let target = if self.duration > 0.0 {
            seconds.clamp(0.0, self.duration)
        } else {
            seconds.max(0.0)
        };

        if let Err(e) = backend.set_current_time(target).await {
            return Err(self.fail(e.into()));
        }

        debug!("Seeked to {:.1}s", target);
        self.current_time = target;
        self.publish();
        Ok(target)
    }

    /// Update the snapshot and answer the caller before the backend call
    fn apply_volume(&mut self, volume: f32, reply: Option<Reply<f32>>) {
        self.volume = Volume::new(volume);
        self.publish();
        if let Some(reply) = reply {
            let _ = reply.send(Ok(self.volume.level()));
        }
    }

    async fn forward_volume(&mut self) {
        if let Some(backend) = self.backend.clone() {
            if let Err(e) = backend.set_volume(self.volume.level()).await {
                warn!("Failed to set backend volume: {}", e);
            }
        }
    }

    async fn remove<F>(&mut self, remove: F) -> Result<QueueTrack>
    where
        F: FnOnce(&mut QueueManager) -> Result<Removal>,
    {
        let removal = remove(&mut self.queue)?;

        match removal.outcome {
            RemovalOutcome::Unaffected => self.publish(),
            RemovalOutcome::Replaced(track) => {
                if self.transport == TransportState::Idle {
                    self.publish();
                } else if let Err(e) = self.play_track(track).await {
                    // Already recorded in the snapshot; the removal itself succeeded
                    warn!("Failed to play replacement track: {}", e);
                }
            }
            RemovalOutcome::Stopped => self.go_idle(true).await,
        }

        Ok(removal.track)
    }

    async fn attach_backend(&mut self, backend: Arc<dyn AudioBackend>) {
        if self.backend.is_some() {
            debug!("Replacing attached audio backend");
            self.detach_backend().await;
        }

        // Only the sink carrying this id is listened to from here on
        self.connection += 1;
        self.bump_generation();
        backend.connect(BackendEventSink::new(
            self.event_tx.clone(),
            self.generation.clone(),
            self.connection,
        ));

        if let Err(e) = backend.set_volume(self.volume.level()).await {
            warn!("Failed to apply volume to new backend: {}", e);
        }

        info!("Audio backend attached");
        self.backend = Some(backend);
        self.transport = TransportState::Idle;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.publish();
    }

    async fn detach_backend(&mut self) {
        self.go_idle(true).await;
        if let Some(backend) = self.backend.take() {
            backend.disconnect();
            info!("Audio backend detached");
        }
    }

    async fn shutdown(&mut self) {
        if let Some(backend) = self.backend.take() {
            if self.has_loaded_track() {
                if let Err(e) = backend.stop().await {
                    warn!("Failed to stop backend during shutdown: {}", e);
                }
            }
            backend.disconnect();
        }

        self.bump_generation();
        self.transport = TransportState::Idle;
        self.current_time = 0.0;
        self.publish();
    }

    // ===== Backend Events =====

    async fn handle_event(&mut self, stamped: StampedEvent) {
        if self.backend.is_none() {
            debug!("Ignoring {:?} with no backend attached", stamped.event);
            return;
        }

        if stamped.connection != self.connection {
            debug!(
                "Ignoring {:?} from a replaced backend (connection {})",
                stamped.event, stamped.connection
            );
            return;
        }

        let current = stamped.generation == self.generation.load(Ordering::SeqCst);

        match stamped.event {
            BackendEvent::Complete => {
                if !current || self.transport != TransportState::Playing {
                    debug!(
                        "Ignoring stale completion (generation {}, {:?})",
                        stamped.generation, self.transport
                    );
                    return;
                }

                let next = match self.queue.advance() {
                    Ok(track) => track,
                    Err(e) => {
                        warn!("Cannot advance after completion: {}", e);
                        None
                    }
                };
                if let Err(e) = self.play_or_idle(next).await {
                    warn!("Failed to start next track: {}", e);
                }
            }
            BackendEvent::Play => {
                if self.transport == TransportState::Paused {
                    self.enter_playing();
                    self.publish();
                }
            }
            BackendEvent::Pause => {
                if self.transport == TransportState::Playing {
                    self.transport = TransportState::Paused;
                    self.publish();
                }
            }
            BackendEvent::Next => self.media_control(Skip::Next).await,
            BackendEvent::Previous => self.media_control(Skip::Previous).await,
            BackendEvent::Stop => {
                if self.has_loaded_track() {
                    debug!("Backend stopped playback");
                    self.go_idle(false).await;
                }
            }
            BackendEvent::Error(message) => {
                if !current {
                    debug!("Ignoring error from a previous load: {}", message);
                    return;
                }
                warn!("Audio backend reported an error: {}", message);
                self.last_error = Some(message);
                self.go_idle(false).await;
            }
        }
    }

    /// Next/previous pressed on the lock screen or a headset
    async fn media_control(&mut self, direction: Skip) {
        let result = match direction {
            Skip::Next => self.skip(Skip::Next).await,
            Skip::Previous => self.previous().await,
        };

        if let Err(e) = result {
            debug!("Ignoring {:?} media control: {}", direction, e);
        }
    }

    // ===== Loading =====

    async fn play_or_idle(&mut self, track: Option<QueueTrack>) -> Result<()> {
        match track {
            Some(track) => self.play_track(track).await,
            None => {
                self.go_idle(true).await;
                Ok(())
            }
        }
    }

    /// Preload and start a track
    ///
    /// Returns `Ok` when a newer transition dropped the load before it
    /// finished; that transition is queued and runs next.
    async fn play_track(&mut self, track: QueueTrack) -> Result<()> {
        let Some(backend) = self.backend.clone() else {
            return Err(self.fail(PlaybackError::BackendUnavailable));
        };

        let generation = self.bump_generation();
        info!(
            "Loading '{}' by {} (generation {})",
            track.title, track.artist, generation
        );

        self.transport = TransportState::Loading;
        self.current_time = 0.0;
        self.duration = track.duration.as_secs_f64();
        self.publish();

        let request = PreloadRequest::new(&track, self.volume);
        let load = load_track(backend.clone(), request, track.artwork.clone());
        tokio::pin!(load);

        let result = loop {
            let wake = tokio::select! {
                biased;
                result = &mut load => LoadWake::Finished(result),
                command = self.commands.recv() => LoadWake::Inbound(match command {
                    Some(command) => Inbound::Command(command),
                    None => Inbound::Closed,
                }),
                Some(event) = self.events.recv() => LoadWake::Inbound(Inbound::Event(event)),
            };

            match wake {
                LoadWake::Finished(result) => break result,
                LoadWake::Inbound(Inbound::Event(stamped))
                    if stamped.connection != self.connection =>
                {
                    debug!("Ignoring {:?} from a replaced backend", stamped.event);
                }
                LoadWake::Inbound(inbound) if inbound.supersedes_load() => {
                    debug!("Load of '{}' superseded", track.title);
                    self.deferred.push_back(inbound);
                    self.bump_generation();
                    self.transport = TransportState::Idle;
                    self.publish();
                    return Ok(());
                }
                LoadWake::Inbound(Inbound::Command(Command::SetVolume { volume, reply })) => {
                    self.apply_volume(volume, reply);
                    self.deferred.push_back(Inbound::Command(Command::SetVolume {
                        volume,
                        reply: None,
                    }));
                }
                LoadWake::Inbound(Inbound::Event(StampedEvent {
                    event: BackendEvent::Complete,
                    generation: stamp,
                    ..
                })) => {
                    debug!("Ignoring completion during load (generation {})", stamp);
                }
                LoadWake::Inbound(inbound) => self.deferred.push_back(inbound),
            }
        };

        if let Err(e) = result {
            warn!("Failed to load '{}': {}", track.title, e);
            return Err(self.fail(e));
        }

        self.duration = match backend.duration().await {
            Ok(duration) if duration.is_finite() && duration > 0.0 => duration,
            Ok(_) => track.duration.as_secs_f64(),
            Err(e) => {
                debug!("Backend did not report a duration: {}", e);
                track.duration.as_secs_f64()
            }
        };

        self.last_error = None;
        self.enter_playing();
        self.publish();
        Ok(())
    }

    // ===== State =====

    async fn poll_current_time(&mut self) {
        let Some(backend) = self.backend.clone() else {
            return;
        };

        match backend.current_time().await {
            Ok(seconds) => {
                if seconds != self.current_time {
                    self.current_time = seconds;
                    self.publish();
                }
            }
            Err(e) => debug!("Failed to poll current time: {}", e),
        }
    }

    fn enter_playing(&mut self) {
        self.transport = TransportState::Playing;
        self.poll.reset();
    }

    /// Drop the session to idle, optionally stopping the backend first
    async fn go_idle(&mut self, stop_backend: bool) {
        if stop_backend && self.has_loaded_track() {
            if let Some(backend) = self.backend.clone() {
                if let Err(e) = backend.stop().await {
                    warn!("Failed to stop backend: {}", e);
                }
            }
        }

        self.bump_generation();
        self.transport = TransportState::Idle;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.publish();
    }

    /// Record a backend failure and drop to idle
    fn fail(&mut self, err: PlaybackError) -> PlaybackError {
        self.bump_generation();
        self.transport = TransportState::Idle;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.last_error = Some(err.to_string());
        self.publish();
        err
    }

    fn require_backend(&self) -> Result<Arc<dyn AudioBackend>> {
        self.backend
            .clone()
            .ok_or(PlaybackError::BackendUnavailable)
    }

    fn has_loaded_track(&self) -> bool {
        matches!(
            self.transport,
            TransportState::Playing | TransportState::Paused
        )
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            queue: self.queue.summary(),
            current_track: self.queue.current().cloned(),
            transport: self.transport,
            current_time: self.current_time,
            duration: self.duration,
            volume: self.volume.level(),
            shuffle: self.queue.is_shuffled(),
            play_mode: self.queue.play_mode(),
            last_error: self.last_error.clone(),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

async fn load_track(
    backend: Arc<dyn AudioBackend>,
    request: PreloadRequest,
    artwork: Option<String>,
) -> Result<()> {
    backend.preload(&request).await?;

    if let Some(url) = artwork {
        if let Err(e) = backend.set_album_art(&url).await {
            debug!("Failed to set album art: {}", e);
        }
    }

    backend.play().await?;
    Ok(())
}

/// Handle to the playback controller
///
/// Cheap to clone. Once the controller has shut down every request fails
/// with [`PlaybackError::ControllerClosed`].
#[derive(Clone)]
pub struct PlaybackHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<PlaybackSnapshot>,
}

impl PlaybackHandle {
    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| PlaybackError::ControllerClosed)?;
        response.await.map_err(|_| PlaybackError::ControllerClosed)?
    }

    /// Replace the queue and play the start track (original index)
    pub async fn set_queue(
        &self,
        tracks: Vec<QueueTrack>,
        source: QueueSource,
        start: Option<usize>,
    ) -> Result<()> {
        self.request(|reply| Command::SetQueue {
            tracks,
            source,
            start,
            reply,
        })
        .await
    }

    /// Play the track at an effective position
    pub async fn jump_to(&self, position: usize) -> Result<()> {
        self.request(|reply| Command::JumpTo { position, reply })
            .await
    }

    pub async fn next(&self) -> Result<()> {
        self.request(Command::Next).await
    }

    /// Previous track, or restart the current one when past the configured
    /// threshold
    pub async fn previous(&self) -> Result<()> {
        self.request(Command::Previous).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(Command::Pause).await
    }

    /// Resume; from idle this restarts the current (or first) track
    pub async fn resume(&self) -> Result<()> {
        self.request(Command::Resume).await
    }

    pub async fn toggle_playback(&self) -> Result<()> {
        self.request(Command::TogglePlayback).await
    }

    /// Seek within the loaded track; returns the clamped position
    pub async fn seek(&self, seconds: f64) -> Result<f64> {
        self.request(|reply| Command::Seek { seconds, reply }).await
    }

    /// Set volume; returns the clamped level once the snapshot reflects it
    pub async fn set_volume(&self, volume: f32) -> Result<f32> {
        self.request(|reply| Command::SetVolume {
            volume,
            reply: Some(reply),
        })
        .await
    }

    pub async fn set_shuffle(&self, enabled: bool) -> Result<()> {
        self.request(|reply| Command::SetShuffle { enabled, reply })
            .await
    }

    /// Flip shuffle and return the new flag
    pub async fn toggle_shuffle(&self) -> Result<bool> {
        self.request(Command::ToggleShuffle).await
    }

    pub async fn set_play_mode(&self, mode: PlayMode) -> Result<()> {
        self.request(|reply| Command::SetPlayMode { mode, reply })
            .await
    }

    /// Advance `none -> repeat -> repeat-one` and return the new mode
    pub async fn cycle_play_mode(&self) -> Result<PlayMode> {
        self.request(Command::CyclePlayMode).await
    }

    /// Remove by original index; returns the removed track
    pub async fn remove_track(&self, original_index: usize) -> Result<QueueTrack> {
        self.request(|reply| Command::RemoveTrack {
            original_index,
            reply,
        })
        .await
    }

    /// Remove by effective position; returns the removed track
    pub async fn remove_at(&self, position: usize) -> Result<QueueTrack> {
        self.request(|reply| Command::RemoveAt { position, reply })
            .await
    }

    pub async fn enqueue(&self, track: QueueTrack) -> Result<()> {
        self.request(|reply| Command::Enqueue { track, reply })
            .await
    }

    /// Stop playback and drop all queued tracks
    pub async fn clear(&self) -> Result<()> {
        self.request(Command::Clear).await
    }

    /// Connect a backend, replacing any attached one
    pub async fn attach_backend(&self, backend: Arc<dyn AudioBackend>) -> Result<()> {
        self.request(|reply| Command::AttachBackend { backend, reply })
            .await
    }

    pub async fn detach_backend(&self) -> Result<()> {
        self.request(Command::DetachBackend).await
    }

    /// Stop the backend and end the controller task
    pub async fn shutdown(&self) -> Result<()> {
        self.request(Command::Shutdown).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every transition
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("closed", &self.commands.is_closed())
            .finish_non_exhaustive()
    }
}
