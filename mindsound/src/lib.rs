//! # mindsound
//!
//! Ambient sound catalogue and audio-source resolution for Mindshift.
//!
//! Every sound is identified by a [`SoundId`] and may be available from up
//! to four tiers, consulted in a fixed priority order: the local bundle,
//! a public object-storage bucket, a shared external folder and a list of
//! fallback mirrors. [`AudioSourceConfig::candidates`] turns a sound into the
//! ordered list of URLs worth trying.
//!
//! # Example
//!
//! ```
//! use mindsound::{AudioSourceConfig, SoundId};
//!
//! let sources = AudioSourceConfig::new()
//!     .with_local_file(SoundId::Rain, "rain.mp3")
//!     .with_storage("https://abcd.supabase.co", "mindshift-audio");
//!
//! assert_eq!(
//!     sources.candidates(SoundId::Rain),
//!     vec![
//!         "/sounds/rain.mp3".to_string(),
//!         "https://abcd.supabase.co/storage/v1/object/public/mindshift-audio/rain.mp3".to_string(),
//!     ]
//! );
//! ```
//!
//! # Configuration Extension
//!
//! With the `mindconfig` feature (default), [`AudioConfigExt`] reads the
//! tiers from the `audio` section of the configuration and
//! [`audio_sources`] exposes the process-wide instance.

pub mod error;
pub mod fetch;
pub mod sound_id;
pub mod sources;

#[cfg(feature = "mindconfig")]
pub mod config_ext;

pub use error::{Error, Result};
pub use fetch::{FetchReport, SoundFetcher};
pub use sound_id::SoundId;
pub use sources::{AudioSourceConfig, ExternalFolderTier, LocalTier, StorageTier};

#[cfg(feature = "mindconfig")]
pub use config_ext::AudioConfigExt;

#[cfg(feature = "mindconfig")]
static AUDIO_SOURCES: once_cell::sync::OnceCell<AudioSourceConfig> =
    once_cell::sync::OnceCell::new();

/// Process-wide source configuration, built from `mindconfig` on first use
///
/// A configuration that cannot be decoded is logged and replaced by empty
/// tiers, so resolution degrades to "no candidate" instead of failing.
#[cfg(feature = "mindconfig")]
pub fn audio_sources() -> &'static AudioSourceConfig {
    AUDIO_SOURCES.get_or_init(|| {
        match mindconfig::get_config().get_audio_source_config() {
            Ok(sources) => sources,
            Err(e) => {
                tracing::error!("Failed to read audio configuration: {}", e);
                AudioSourceConfig::default()
            }
        }
    })
}

/// Candidate URLs of a sound from the process-wide configuration
#[cfg(feature = "mindconfig")]
pub fn resolve_candidates(sound: &str) -> Vec<String> {
    audio_sources().resolve_candidates(sound)
}
