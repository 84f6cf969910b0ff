//! Playable audio resources and the backends creating them

use crate::error::Result;
use crate::listeners::{Listener, ListenerId};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Volume of the background music, as a fraction of the maximum
pub const BACKGROUND_VOLUME: f32 = 0.3;

/// Event reported by a playback handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    Play,
    Pause,
    /// Load or decode failure of the current source
    Error(String),
}

impl fmt::Display for MediaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaEvent::Play => f.write_str("play"),
            MediaEvent::Pause => f.write_str("pause"),
            MediaEvent::Error(e) => write!(f, "error ({e})"),
        }
    }
}

/// Parameters of a handle at construction
#[derive(Debug, Clone, PartialEq)]
pub struct HandleSpec {
    pub url: String,
    pub looping: bool,
    /// 0.0 to 1.0
    pub volume: f32,
}

impl HandleSpec {
    /// Looping source at [`BACKGROUND_VOLUME`]
    pub fn background(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            looping: true,
            volume: BACKGROUND_VOLUME,
        }
    }

    /// Volume as a 0-100 percentage
    pub fn volume_percent(&self) -> u32 {
        (self.volume.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// One playable audio resource
///
/// Handles are shared (`Arc`) and report state changes through listeners
/// rather than return values: a `play()` that succeeds is followed by a
/// [`MediaEvent::Play`], a later failure of the source by a
/// [`MediaEvent::Error`].
#[async_trait]
pub trait PlaybackHandle: Send + Sync {
    /// Current source URL
    fn source(&self) -> String;

    /// Requests playback. An error means playback did not start.
    async fn play(&self) -> Result<()>;

    fn pause(&self);

    /// Replaces the source; takes effect on the next [`reload`](Self::reload)
    fn set_source(&self, url: &str);

    fn reload(&self);

    fn add_listener(&self, listener: Listener<MediaEvent>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

/// Factory of playback handles
pub trait AudioBackend: Send + Sync {
    fn create(&self, spec: HandleSpec) -> Result<Arc<dyn PlaybackHandle>>;
}
