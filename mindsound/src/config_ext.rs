//! Extension to read the sound sources from mindconfig
//!
//! This module provides the `AudioConfigExt` trait, which adds the audio
//! source getters and setters to `mindconfig::Config`. Everything lives
//! under the `audio` subtree:
//!
//! ```yaml
//! audio:
//!   local:
//!     base_path: /sounds
//!     directory: public/sounds
//!     files: { rain: rain.mp3 }
//!   storage:
//!     endpoint: ""            # or MINDSHIFT_STORAGE_URL
//!     bucket: mindshift-audio
//!   external_folder:
//!     folder_id: ...
//!     file_ids: { rain: "" }
//!   fallbacks:
//!     rain: [https://...]
//! ```
//!
//! # Example
//!
//! ```no_run
//! use mindconfig::get_config;
//! use mindsound::AudioConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! let sources = config.get_audio_source_config()?;
//! println!("{:?}", sources.resolve_candidates("rain"));
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::sound_id::SoundId;
use crate::sources::{
    AudioSourceConfig, ExternalFolderTier, LocalTier, StorageTier, DEFAULT_LOCAL_BASE_PATH,
    DEFAULT_STORAGE_BUCKET,
};
use mindconfig::Config;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Default directory the sound fetcher writes into, relative to the config directory
pub const DEFAULT_SOUNDS_DIRECTORY: &str = "public/sounds";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAudioConfig {
    local: RawLocal,
    storage: RawStorage,
    external_folder: RawExternalFolder,
    fallbacks: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLocal {
    base_path: Option<String>,
    files: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStorage {
    endpoint: Option<String>,
    bucket: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExternalFolder {
    folder_id: Option<String>,
    file_ids: BTreeMap<String, Option<String>>,
}

/// Keeps the entries whose key is a known sound
fn keyed_by_sound<V>(section: &str, raw: BTreeMap<String, V>) -> BTreeMap<SoundId, V> {
    raw.into_iter()
        .filter_map(|(key, value)| match key.parse::<SoundId>() {
            Ok(id) => Some((id, value)),
            Err(_) => {
                warn!(section, sound = %key, "Ignoring unknown sound in audio configuration");
                None
            }
        })
        .collect()
}

impl From<RawAudioConfig> for AudioSourceConfig {
    fn from(raw: RawAudioConfig) -> Self {
        let files = raw
            .local
            .files
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect();
        let file_ids = raw
            .external_folder
            .file_ids
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect();

        AudioSourceConfig {
            local: LocalTier {
                base_path: raw
                    .local
                    .base_path
                    .unwrap_or_else(|| DEFAULT_LOCAL_BASE_PATH.to_string()),
                files: keyed_by_sound("local.files", files),
            },
            storage: StorageTier {
                bucket: raw
                    .storage
                    .bucket
                    .unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string()),
                endpoint: raw.storage.endpoint.unwrap_or_default(),
            },
            external_folder: ExternalFolderTier {
                folder_id: raw.external_folder.folder_id.unwrap_or_default(),
                file_ids: keyed_by_sound("external_folder.file_ids", file_ids),
            },
            fallbacks: keyed_by_sound("fallbacks", raw.fallbacks),
        }
    }
}

/// Extension trait to manage the audio sources in mindconfig
///
/// Getters never fail on a missing key: an absent tier simply contributes
/// no candidate.
pub trait AudioConfigExt {
    /// Builds the four-tier source configuration from the `audio` subtree
    fn get_audio_source_config(&self) -> Result<AudioSourceConfig>;

    /// Object-storage endpoint; empty when the tier is disabled
    fn get_storage_endpoint(&self) -> String;

    /// Sets the object-storage endpoint (empty disables the tier)
    fn set_storage_endpoint(&self, endpoint: &str) -> Result<()>;

    /// Registers the external-folder file id of a sound
    fn set_external_file_id(&self, id: SoundId, file_id: &str) -> Result<()>;

    /// Directory where fetched sounds are written, created if needed
    fn get_sounds_directory(&self) -> Result<String>;
}

impl AudioConfigExt for Config {
    fn get_audio_source_config(&self) -> Result<AudioSourceConfig> {
        match self.get_value(&["audio"]) {
            Ok(value @ Value::Mapping(_)) => {
                let raw: RawAudioConfig = serde_yaml::from_value(value)?;
                Ok(raw.into())
            }
            _ => {
                warn!("No audio section in configuration, every tier is empty");
                Ok(AudioSourceConfig::default())
            }
        }
    }

    fn get_storage_endpoint(&self) -> String {
        self.get_string(&["audio", "storage", "endpoint"])
            .unwrap_or_default()
    }

    fn set_storage_endpoint(&self, endpoint: &str) -> Result<()> {
        self.set_value(
            &["audio", "storage", "endpoint"],
            Value::String(endpoint.to_string()),
        )?;
        Ok(())
    }

    fn set_external_file_id(&self, id: SoundId, file_id: &str) -> Result<()> {
        self.set_value(
            &["audio", "external_folder", "file_ids", id.as_str()],
            Value::String(file_id.to_string()),
        )?;
        Ok(())
    }

    fn get_sounds_directory(&self) -> Result<String> {
        Ok(self.get_managed_dir(&["audio", "local", "directory"], DEFAULT_SOUNDS_DIRECTORY)?)
    }
}
