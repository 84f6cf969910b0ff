//! Persistent background music player
//!
//! The player owns at most one [`PlaybackHandle`] for the whole process
//! lifetime. Views call [`BackgroundPlayer::activate`] every time they mount;
//! the first call creates the handle, later calls reuse it, and unmounting a
//! view never stops the music.
//!
//! When the platform refuses to start playback (autoplay policy), the player
//! listens once for the first click, touch or key press and retries from
//! there. Load errors trigger a bounded number of reloads with exponential
//! backoff; the budget is restored once playback has stayed up for a while.
//!
//! ```text
//! Uninitialized ──activate──▶ Created ──play──▶ Playing ◀──play── Paused
//!                                                  └─────pause─────▶┘
//! ```

use crate::error::{PlayerError, Result};
use crate::gesture::{GestureKind, GestureSource};
use crate::handle::{AudioBackend, HandleSpec, MediaEvent, PlaybackHandle};
use crate::listeners::ListenerId;
use mindsound::{AudioSourceConfig, SoundId};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Default number of consecutive reloads after load errors
pub const DEFAULT_RELOAD_ATTEMPTS: u32 = 3;

/// Default delay before the first reload
pub const DEFAULT_RELOAD_BACKOFF_MS: u64 = 500;

/// Upper bound of the reload delay
pub const MAX_RELOAD_BACKOFF: Duration = Duration::from_secs(30);

/// Default uninterrupted playing time that restores the reload budget
pub const DEFAULT_RELOAD_HEALTHY_SECS: u64 = 60;

/// Process-wide player, see [`install`]
static BACKGROUND_PLAYER: OnceCell<BackgroundPlayer> = OnceCell::new();

/// Playback state shared by every view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Uninitialized,
    Created,
    Playing,
    Paused,
}

/// Reload budget applied to load/decode errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadPolicy {
    /// Consecutive reloads before giving up; 0 disables reloading
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// An error arriving after playback ran this long without interruption
    /// starts a new series of reloads
    pub healthy_after: Duration,
}

impl Default for ReloadPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RELOAD_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_RELOAD_BACKOFF_MS),
            healthy_after: Duration::from_secs(DEFAULT_RELOAD_HEALTHY_SECS),
        }
    }
}

impl ReloadPolicy {
    /// Delay before the reload number `attempt` (1-based), doubling each time
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(MAX_RELOAD_BACKOFF)
    }
}

/// Result of [`BackgroundPlayer::activate`]
#[derive(Debug)]
pub enum ActivateOutcome {
    /// A handle exists and is playing; nothing was done
    AlreadyPlaying,
    /// Playback started right away
    Started,
    /// Playback was refused; it will be retried on the next user gesture
    Deferred(DeferredStart),
    /// A gesture retry registered by an earlier activation is still pending
    AwaitingGesture,
    /// No URL is configured for the background music
    Unavailable,
}

/// Result of the retry made on the first user gesture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Started,
    /// Something else started playback before the gesture
    AlreadyPlaying,
    Failed(PlayerError),
    /// The gesture listeners were dropped without firing
    Cancelled,
}

/// Pending retry waiting for a user gesture
#[derive(Debug)]
pub struct DeferredStart {
    task: JoinHandle<RetryOutcome>,
}

impl DeferredStart {
    /// Waits for the gesture and the retry it triggers
    pub async fn wait(self) -> Result<RetryOutcome> {
        self.task
            .await
            .map_err(|e| PlayerError::Aborted(e.to_string()))
    }
}

struct Inner {
    backend: Arc<dyn AudioBackend>,
    gestures: Arc<dyn GestureSource>,
    sources: AudioSourceConfig,
    policy: ReloadPolicy,
    handle: Mutex<Option<Arc<dyn PlaybackHandle>>>,
    local_dir: Option<PathBuf>,
    source_url: OnceCell<String>,
    state: Mutex<PlaybackState>,
    gesture_pending: AtomicBool,
    reload_attempts: AtomicU32,
    /// Start of the current uninterrupted playback, if playing
    playing_since: Mutex<Option<Instant>>,
    runtime: OnceCell<tokio::runtime::Handle>,
}

impl Inner {
    fn state(&self) -> PlaybackState {
        *self.state.lock()
    }

    fn set_state(&self, state: PlaybackState) {
        *self.state.lock() = state;
    }

    fn background_url(&self) -> Option<String> {
        match &self.local_dir {
            Some(dir) => self
                .sources
                .playable_candidates(SoundId::Background, dir)
                .into_iter()
                .next(),
            None => self.sources.primary_url(SoundId::Background),
        }
    }

    fn mark_playing(&self) {
        self.set_state(PlaybackState::Playing);
        self.reload_attempts.store(0, Ordering::SeqCst);
    }

    /// Registers the play/pause state observers and the error observer
    fn observe(inner: &Arc<Inner>, handle: &Arc<dyn PlaybackHandle>) -> [ListenerId; 2] {
        let weak: Weak<Inner> = Arc::downgrade(inner);
        let state_observer = handle.add_listener(Arc::new(move |event: &MediaEvent| {
            let Some(inner) = weak.upgrade() else { return };
            match event {
                MediaEvent::Play => {
                    inner.set_state(PlaybackState::Playing);
                    inner.playing_since.lock().get_or_insert_with(Instant::now);
                }
                MediaEvent::Pause => {
                    inner.set_state(PlaybackState::Paused);
                    *inner.playing_since.lock() = None;
                }
                // Cleared by the error observer, which needs the start time
                MediaEvent::Error(_) => {}
            }
        }));

        let weak: Weak<Inner> = Arc::downgrade(inner);
        let error_observer = handle.add_listener(Arc::new(move |event: &MediaEvent| {
            if let (MediaEvent::Error(reason), Some(inner)) = (event, weak.upgrade()) {
                Inner::schedule_reload(&inner, reason);
            }
        }));

        [state_observer, error_observer]
    }

    /// Reassigns the resolved URL and reloads, within the reload budget
    fn schedule_reload(inner: &Arc<Inner>, reason: &str) {
        error!(reason, "Background music error");

        let recovered = inner
            .playing_since
            .lock()
            .take()
            .is_some_and(|since| since.elapsed() >= inner.policy.healthy_after);
        if recovered && inner.reload_attempts.swap(0, Ordering::SeqCst) > 0 {
            info!("Background music played long enough, reload budget restored");
        }

        let attempt = inner.reload_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt > inner.policy.max_attempts {
            if attempt == inner.policy.max_attempts + 1 {
                error!(
                    attempts = inner.policy.max_attempts,
                    "Giving up on background music after repeated errors"
                );
            }
            return;
        }

        let handle = inner.handle.lock().clone();
        let (Some(url), Some(handle)) = (inner.source_url.get().cloned(), handle) else {
            return;
        };

        let delay = inner.policy.delay(attempt);
        match inner.runtime.get() {
            Some(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    debug!(attempt, url = %url, "Reloading background music");
                    handle.set_source(&url);
                    handle.reload();
                });
            }
            None => {
                warn!(attempt, "No async runtime, reloading background music immediately");
                handle.set_source(&url);
                handle.reload();
            }
        }
    }
}

/// Background music service
///
/// Cheap to clone; every clone drives the same handle. Use [`install`] to
/// make one instance process-wide.
#[derive(Clone)]
pub struct BackgroundPlayer {
    inner: Arc<Inner>,
}

impl BackgroundPlayer {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        gestures: Arc<dyn GestureSource>,
        sources: AudioSourceConfig,
        policy: ReloadPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                gestures,
                sources,
                policy,
                local_dir: None,
                handle: Mutex::new(None),
                source_url: OnceCell::new(),
                state: Mutex::new(PlaybackState::Uninitialized),
                gesture_pending: AtomicBool::new(false),
                reload_attempts: AtomicU32::new(0),
                playing_since: Mutex::new(None),
                runtime: OnceCell::new(),
            }),
        }
    }

    /// Plays bundled files from `directory` instead of the web base path
    ///
    /// A bundled file missing from `directory` is skipped in favour of the
    /// next source. Call before the player is cloned or installed.
    pub fn with_local_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.local_dir = Some(directory.into()),
            None => warn!("Background player already shared, local directory ignored"),
        }
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.state()
    }

    /// The shared handle, once created
    pub fn handle(&self) -> Option<Arc<dyn PlaybackHandle>> {
        self.inner.handle.lock().clone()
    }

    /// URL the handle was created with
    pub fn source_url(&self) -> Option<&str> {
        self.inner.source_url.get().map(String::as_str)
    }

    pub fn reload_policy(&self) -> ReloadPolicy {
        self.inner.policy
    }

    /// Whether a gesture retry is registered
    pub fn is_awaiting_gesture(&self) -> bool {
        self.inner.gesture_pending.load(Ordering::SeqCst)
    }

    /// Entry point of a mounting view; safe to call any number of times
    pub async fn activate(&self) -> Result<ActivateOutcome> {
        let inner = &self.inner;
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let _ = inner.runtime.set(runtime);
        }

        // Check-then-create under one lock: concurrent mounts share a handle
        let handle = {
            let mut slot = inner.handle.lock();
            match slot.as_ref() {
                Some(existing) => {
                    if inner.state() == PlaybackState::Playing {
                        debug!("Background music already playing");
                        return Ok(ActivateOutcome::AlreadyPlaying);
                    }
                    Arc::clone(existing)
                }
                None => {
                    let Some(url) = inner.background_url() else {
                        warn!("No source configured for background music");
                        return Ok(ActivateOutcome::Unavailable);
                    };
                    let handle = inner.backend.create(HandleSpec::background(url.clone()))?;
                    Inner::observe(inner, &handle);
                    info!(url = %url, "Background music handle created");
                    let _ = inner.source_url.set(url);
                    inner.set_state(PlaybackState::Created);
                    *slot = Some(Arc::clone(&handle));
                    handle
                }
            }
        };

        if self.is_awaiting_gesture() {
            debug!("Background music waits for a user gesture");
            return Ok(ActivateOutcome::AwaitingGesture);
        }

        match handle.play().await {
            Ok(()) => {
                inner.mark_playing();
                info!("Background music started");
                Ok(ActivateOutcome::Started)
            }
            Err(e) => {
                info!(reason = %e, "Autoplay blocked, music will start on user interaction");
                Ok(self.defer_until_gesture(handle))
            }
        }
    }

    /// Called when the owning view goes away: the music keeps playing
    pub fn unmount(&self) {
        debug!(state = ?self.state(), "View unmounted, background music left untouched");
    }

    /// Registers the one-shot gesture listeners and the retry task
    fn defer_until_gesture(&self, handle: Arc<dyn PlaybackHandle>) -> ActivateOutcome {
        let inner = &self.inner;
        if inner.gesture_pending.swap(true, Ordering::SeqCst) {
            return ActivateOutcome::AwaitingGesture;
        }

        let (tx, rx) = oneshot::channel::<GestureKind>();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let tokens: Vec<ListenerId> = GestureKind::ALL
            .iter()
            .map(|&kind| {
                let tx = Arc::clone(&tx);
                inner.gestures.add_listener(
                    kind,
                    Arc::new(move |fired| {
                        if let Some(tx) = tx.lock().take() {
                            let _ = tx.send(fired);
                        }
                    }),
                )
            })
            .collect();

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let gesture = rx.await;
            for token in tokens {
                inner.gestures.remove_listener(token);
            }
            inner.gesture_pending.store(false, Ordering::SeqCst);

            let Ok(gesture) = gesture else {
                return RetryOutcome::Cancelled;
            };
            if inner.state() == PlaybackState::Playing {
                return RetryOutcome::AlreadyPlaying;
            }

            debug!(%gesture, "User gesture, retrying background music");
            match handle.play().await {
                Ok(()) => {
                    inner.mark_playing();
                    info!("Background music started");
                    RetryOutcome::Started
                }
                Err(e) => {
                    warn!(error = %e, "Could not start background music");
                    RetryOutcome::Failed(e)
                }
            }
        });

        ActivateOutcome::Deferred(DeferredStart { task })
    }
}

/// Makes `player` the process-wide instance
///
/// The first installed player wins; later calls return it and drop theirs.
pub fn install(player: BackgroundPlayer) -> &'static BackgroundPlayer {
    let mut installed = false;
    let global = BACKGROUND_PLAYER.get_or_init(|| {
        installed = true;
        player
    });
    if !installed {
        warn!("Background player already installed, keeping the existing one");
    }
    global
}

/// The process-wide player, if one was installed
pub fn background_player() -> Option<&'static BackgroundPlayer> {
    BACKGROUND_PLAYER.get()
}
