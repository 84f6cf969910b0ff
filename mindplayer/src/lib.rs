//! # mindplayer
//!
//! Background music for Mindshift: one looping track, shared by every
//! view, started at most once per process.
//!
//! The player is platform-agnostic. An [`AudioBackend`] creates
//! [`PlaybackHandle`]s and a [`GestureSource`] reports user interaction;
//! [`ProcessBackend`] and [`GestureBus`] are the implementations used by the
//! command-line host.
//!
//! ```no_run
//! use mindplayer::{BackgroundPlayer, GestureBus, ProcessBackend, ReloadPolicy};
//! use mindsound::{AudioSourceConfig, SoundId};
//! use std::sync::Arc;
//!
//! # async fn run() -> mindplayer::Result<()> {
//! let sources = AudioSourceConfig::new().with_local_file(SoundId::Background, "bg.mp3");
//! let player = BackgroundPlayer::new(
//!     Arc::new(ProcessBackend::default()),
//!     Arc::new(GestureBus::new()),
//!     sources,
//!     ReloadPolicy::default(),
//! );
//! player.activate().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gesture;
pub mod handle;
pub mod listeners;
pub mod player;
pub mod process;

#[cfg(feature = "mindconfig")]
pub mod config_ext;

pub use error::{PlayerError, Result};
pub use gesture::{GestureBus, GestureKind, GestureListener, GestureSource};
pub use handle::{AudioBackend, HandleSpec, MediaEvent, PlaybackHandle, BACKGROUND_VOLUME};
pub use listeners::{Listener, ListenerId, Listeners};
pub use player::{
    background_player, install, ActivateOutcome, BackgroundPlayer, DeferredStart,
    PlaybackState, ReloadPolicy, RetryOutcome,
};
pub use process::{ProcessBackend, ProcessCommand, ProcessHandle};

#[cfg(feature = "mindconfig")]
pub use config_ext::PlayerConfigExt;
