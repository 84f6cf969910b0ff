//! Audio source tiers and prioritized URL resolution
//!
//! A sound can be served from four places, consulted in this order:
//!
//! 1. **local**: a file bundled with the application under `base_path`
//! 2. **object storage**: a public bucket; the local filename is reused as
//!    the object key
//! 3. **external folder**: a shared drive file, when its id is known
//! 4. **fallbacks**: external mirror URLs
//!
//! Resolution only builds URLs. Nothing here touches the network, and a
//! candidate is never checked for reachability: the consumer discovers
//! whether playback of a candidate succeeds. The one exception is
//! [`AudioSourceConfig::playable_candidates`], for hosts that play bundled
//! files straight from disk.

use crate::sound_id::SoundId;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Default base path of bundled sounds
pub const DEFAULT_LOCAL_BASE_PATH: &str = "/sounds";

/// Default object-storage bucket
pub const DEFAULT_STORAGE_BUCKET: &str = "mindshift-audio";

/// Scheme stripped from the storage endpoint to get the project id
pub const STORAGE_SCHEME: &str = "https://";

/// Domain stripped from the storage endpoint to get the project id
pub const STORAGE_DOMAIN: &str = "supabase.co";

/// Public object path on the storage host
pub const STORAGE_PUBLIC_PATH: &str = "/storage/v1/object/public";

/// Download link template of the external folder, completed by a file id
pub const EXTERNAL_DOWNLOAD_URL: &str = "https://drive.google.com/uc?export=download&id=";

/// Characters kept verbatim in an object key: RFC 3986 unreserved set.
///
/// Parentheses, which are common in downloaded track names, are encoded.
const OBJECT_KEY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Priority 1: files bundled with the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTier {
    pub base_path: String,
    pub files: BTreeMap<SoundId, String>,
}

impl Default for LocalTier {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_LOCAL_BASE_PATH.to_string(),
            files: BTreeMap::new(),
        }
    }
}

impl LocalTier {
    /// Configured filename for a sound, ignoring empty entries
    pub fn file_name(&self, id: SoundId) -> Option<&str> {
        self.files
            .get(&id)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn url(&self, id: SoundId) -> Option<String> {
        self.file_name(id)
            .map(|name| format!("{}/{}", self.base_path.trim_end_matches('/'), name))
    }
}

/// Priority 2: public object-storage bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTier {
    pub bucket: String,
    /// Storage endpoint such as `https://abcd.supabase.co`; empty disables the tier
    pub endpoint: String,
}

impl Default for StorageTier {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            endpoint: String::new(),
        }
    }
}

impl StorageTier {
    /// Derived from the endpoint, never stored
    pub fn enabled(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }

    /// Project identifier: the endpoint without scheme and storage domain
    pub fn project_id(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        let host = endpoint.strip_prefix(STORAGE_SCHEME).unwrap_or(endpoint);
        host.replacen(&format!(".{STORAGE_DOMAIN}"), "", 1)
    }

    /// Public URL of an object, or an empty string when storage is disabled
    pub fn url(&self, file_name: &str) -> String {
        if !self.enabled() {
            return String::new();
        }
        let encoded = utf8_percent_encode(file_name, OBJECT_KEY);
        format!(
            "https://{}.{}{}/{}/{}",
            self.project_id(),
            STORAGE_DOMAIN,
            STORAGE_PUBLIC_PATH,
            self.bucket,
            encoded
        )
    }
}

/// Priority 3: files shared from an external drive folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalFolderTier {
    pub folder_id: String,
    pub file_ids: BTreeMap<SoundId, String>,
}

impl ExternalFolderTier {
    pub fn file_id(&self, id: SoundId) -> Option<&str> {
        self.file_ids
            .get(&id)
            .map(|s| s.trim())
            .filter(|file_id| !file_id.is_empty())
    }

    pub fn url(&self, id: SoundId) -> Option<String> {
        self.file_id(id)
            .map(|file_id| format!("{EXTERNAL_DOWNLOAD_URL}{file_id}"))
    }
}

/// Complete source configuration: the four tiers, keyed by [`SoundId`]
///
/// The process-wide instance is built once from the configuration (see
/// [`crate::audio_sources`]); tests and tools build their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioSourceConfig {
    pub local: LocalTier,
    pub storage: StorageTier,
    pub external_folder: ExternalFolderTier,
    pub fallbacks: BTreeMap<SoundId, Vec<String>>,
}

impl AudioSourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.local.base_path = base_path.into();
        self
    }

    pub fn with_local_file(mut self, id: SoundId, file_name: impl Into<String>) -> Self {
        self.local.files.insert(id, file_name.into());
        self
    }

    pub fn with_storage(mut self, endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        self.storage.endpoint = endpoint.into();
        self.storage.bucket = bucket.into();
        self
    }

    pub fn with_external_file(mut self, id: SoundId, file_id: impl Into<String>) -> Self {
        self.external_folder.file_ids.insert(id, file_id.into());
        self
    }

    pub fn with_fallbacks<I, S>(mut self, id: SoundId, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallbacks
            .insert(id, urls.into_iter().map(Into::into).collect());
        self
    }

    /// Candidate URLs for a sound name, in priority order
    ///
    /// Unknown names miss in every tier and yield an empty list.
    pub fn resolve_candidates(&self, sound: &str) -> Vec<String> {
        match sound.parse::<SoundId>() {
            Ok(id) => self.candidates(id),
            Err(_) => {
                debug!(sound, "Unknown sound, no candidate");
                Vec::new()
            }
        }
    }

    /// Candidate URLs for a sound, in priority order
    ///
    /// local < object storage < external folder < fallbacks, with no
    /// interleaving and no deduplication.
    pub fn candidates(&self, id: SoundId) -> Vec<String> {
        let mut urls = Vec::new();

        let local_file = self.local.file_name(id);
        if let Some(url) = self.local.url(id) {
            urls.push(url);
        }

        // The storage object key is the local filename
        if let Some(file_name) = local_file {
            let url = self.storage.url(file_name);
            if !url.is_empty() {
                urls.push(url);
            }
        }

        if let Some(url) = self.external_folder.url(id) {
            urls.push(url);
        }

        if let Some(mirrors) = self.fallbacks.get(&id) {
            urls.extend(mirrors.iter().filter(|u| !u.is_empty()).cloned());
        }

        debug!(sound = %id, count = urls.len(), "Resolved audio candidates");
        urls
    }

    /// First candidate of a sound, if any tier defines it
    pub fn primary_url(&self, id: SoundId) -> Option<String> {
        self.candidates(id).into_iter().next()
    }

    /// Candidates for a host reading bundled files from `directory`
    ///
    /// The local tier becomes the file path under `directory`, and is left
    /// out when that file does not exist so the next tier comes first.
    pub fn playable_candidates(&self, id: SoundId, directory: &Path) -> Vec<String> {
        let mut urls = self.candidates(id);
        let Some(file_name) = self.local.file_name(id) else {
            return urls;
        };

        // The local URL, when present, is always the first candidate
        urls.remove(0);
        let path = directory.join(file_name);
        if path.is_file() {
            urls.insert(0, path.to_string_lossy().into_owned());
        } else {
            debug!(sound = %id, path = %path.display(), "Bundled file missing, skipping local tier");
        }
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_strips_scheme_and_domain() {
        let storage = StorageTier {
            bucket: "b".into(),
            endpoint: "https://xyzproject.supabase.co".into(),
        };
        assert_eq!(storage.project_id(), "xyzproject");

        let trailing = StorageTier {
            bucket: "b".into(),
            endpoint: "https://xyzproject.supabase.co/".into(),
        };
        assert_eq!(trailing.project_id(), "xyzproject");
    }

    #[test]
    fn test_storage_url_encodes_object_key() {
        let storage = StorageTier {
            bucket: "mindshift-audio".into(),
            endpoint: "https://abc.supabase.co".into(),
        };
        assert_eq!(
            storage.url("my track (live).mp3"),
            "https://abc.supabase.co/storage/v1/object/public/mindshift-audio/my%20track%20%28live%29.mp3"
        );
    }

    #[test]
    fn test_disabled_storage_builds_nothing() {
        let storage = StorageTier::default();
        assert!(!storage.enabled());
        assert_eq!(storage.url("rain.mp3"), "");

        let blank = StorageTier {
            bucket: "b".into(),
            endpoint: "   ".into(),
        };
        assert!(!blank.enabled());
    }

    #[test]
    fn test_empty_entries_are_absent() {
        let config = AudioSourceConfig::new()
            .with_local_file(SoundId::Rain, "")
            .with_external_file(SoundId::Rain, "");
        assert!(config.candidates(SoundId::Rain).is_empty());
    }

    #[test]
    fn test_base_path_trailing_slash() {
        let config = AudioSourceConfig::new()
            .with_base_path("/assets/sounds/")
            .with_local_file(SoundId::Wind, "wind.mp3");
        assert_eq!(
            config.candidates(SoundId::Wind),
            vec!["/assets/sounds/wind.mp3".to_string()]
        );
    }

    #[test]
    fn test_primary_url_is_first_candidate() {
        let config = AudioSourceConfig::new()
            .with_fallbacks(SoundId::Piano, ["https://mirror/piano.mp3"]);
        assert_eq!(
            config.primary_url(SoundId::Piano).as_deref(),
            Some("https://mirror/piano.mp3")
        );
        assert_eq!(config.primary_url(SoundId::Ocean), None);
    }
}
