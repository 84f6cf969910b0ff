//! # mindconfig
//!
//! YAML configuration shared by every Mindshift crate.
//!
//! The effective configuration is built in three layers:
//! 1. the defaults embedded in the binary (`mindshift.yaml`);
//! 2. `config.yaml` from the configuration directory, merged key by key;
//! 3. environment overrides: `MINDSHIFT_CONFIG__SECTION__KEY=value` (values
//!    are parsed as YAML) and a few short aliases such as
//!    `MINDSHIFT_STORAGE_URL`.
//!
//! Keys are case-insensitive (stored lower-cased). The first two layers are
//! written back to `config.yaml`, so the file always lists every setting.
//! Environment overrides live in memory only: unsetting a variable restores
//! the file value on the next start.
//!
//! Feature crates extend [`Config`] with their own getters through
//! extension traits (see `mindsound::AudioConfigExt`).
//!
//! ```no_run
//! use mindconfig::get_config;
//!
//! let config = get_config();
//! let level = config.get_log_min_level()?;
//! config.set_log_enable_console(false)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, bail, Result};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde_yaml::{Mapping, Number, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = include_str!("mindshift.yaml");

const CONFIG_FILE: &str = "config.yaml";
const DEFAULT_DIR_NAME: &str = ".mindshift";

const ENV_CONFIG_DIR: &str = "MINDSHIFT_CONFIG";
const ENV_PREFIX: &str = "MINDSHIFT_CONFIG__";

/// Short-hand variables mapped onto a configuration path, applied after
/// the `MINDSHIFT_CONFIG__` overrides
const ENV_ALIASES: &[(&str, &[&str])] = &[("MINDSHIFT_STORAGE_URL", &["audio", "storage", "endpoint"])];

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load Mindshift configuration"));
}

/// Generates a bool getter (with default) and its setter
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            Ok(match self.get_value($path) {
                Ok(Value::Bool(b)) => b,
                _ => $default,
            })
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Loaded configuration tree and the file backing it
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: PathBuf,
    data: Mutex<Value>,
    overlay: Value,
}

impl Config {
    /// Resolves and prepares the configuration directory
    ///
    /// Candidates, first match wins: `directory` when not empty, the
    /// `MINDSHIFT_CONFIG` variable, an existing `./.mindshift`, an existing
    /// `~/.mindshift`, and finally `./.mindshift`. The directory is created
    /// when missing and must be writable.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir = Self::locate_dir(directory);
        Self::prepare_dir(&dir)?;
        Ok(dir.to_string_lossy().into_owned())
    }

    fn locate_dir(directory: &str) -> PathBuf {
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }
        if let Ok(dir) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %dir, "Config directory from environment");
            return PathBuf::from(dir);
        }

        let local = PathBuf::from(DEFAULT_DIR_NAME);
        if local.exists() {
            return local;
        }
        dirs::home_dir()
            .map(|home| home.join(DEFAULT_DIR_NAME))
            .filter(|dir| dir.exists())
            .unwrap_or(local)
    }

    fn prepare_dir(dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        if !dir.is_dir() {
            bail!("{} is not a directory", dir.display());
        }

        let marker = dir.join(".write_test");
        fs::write(&marker, b"mindshift")?;
        fs::remove_file(&marker)?;
        Ok(())
    }

    /// Builds the layered configuration for `directory` and saves it
    ///
    /// An empty `directory` uses the search order of [`Config::config_dir`].
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        let path = Path::new(&config_dir).join(CONFIG_FILE);
        info!(config_dir = %config_dir, "Using config directory");

        let mut data: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        match fs::read_to_string(&path) {
            Ok(text) => {
                info!(config_file = %path.display(), "Loaded config file");
                let user: Value = serde_yaml::from_str(&text)?;
                merge_yaml(&mut data, &user);
            }
            Err(_) => {
                info!(config_file = %path.display(), "No config file, starting from defaults");
            }
        }

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(lowercase_keys(data)),
            overlay: Self::env_overlay(env::vars()),
        };
        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    /// Writes the current tree to `config.yaml`, without environment overrides
    pub fn save(&self) -> Result<()> {
        let text = serde_yaml::to_string(&*self.data.lock())?;
        fs::write(&self.path, text)?;
        Ok(())
    }

    /// Sets the value at `path` (e.g. `&["audio", "storage", "bucket"]`),
    /// creating intermediate mappings, then saves
    ///
    /// An environment override of the same key keeps precedence in memory.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        insert_at(&mut self.data.lock(), path, value)?;
        self.save()
    }

    /// Value at `path` with environment overrides applied; an error when
    /// any segment is missing
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let stored = value_at(&self.data.lock(), path).cloned();
        match (stored, value_at(&self.overlay, path)) {
            (Ok(mut value), Ok(env)) => {
                merge_yaml(&mut value, env);
                Ok(value)
            }
            (Err(_), Ok(env)) => Ok(env.clone()),
            (stored, Err(_)) => stored,
        }
    }

    /// String at `path`; `None` when missing or not a string
    pub fn get_string(&self, path: &[&str]) -> Option<String> {
        match self.get_value(path) {
            Ok(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Unsigned integer at `path`, `default` when missing or malformed
    pub fn get_u64_or(&self, path: &[&str], default: u64) -> u64 {
        let parsed = match self.get_value(path) {
            Ok(Value::Number(n)) => n.as_u64(),
            Ok(Value::String(s)) => s.trim().parse().ok(),
            Err(_) => return default,
            Ok(_) => None,
        };
        parsed.unwrap_or_else(|| {
            warn!(path = %path.join("."), default, "Invalid integer, using default");
            default
        })
    }

    pub fn set_u64(&self, path: &[&str], value: u64) -> Result<()> {
        self.set_value(path, Value::Number(Number::from(value)))
    }

    /// Directory stored at `path`, resolved against the config directory
    ///
    /// `default` is stored when the key is missing; the directory is
    /// created if needed.
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<String> {
        let configured = self.get_string(path).filter(|s| !s.is_empty());
        let dir = match configured {
            Some(dir) => dir,
            None => {
                self.set_managed_dir(path, default.to_string())?;
                default.to_string()
            }
        };

        let dir = Path::new(&dir);
        let absolute = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            Path::new(&self.config_dir).join(dir)
        };
        if !absolute.exists() {
            fs::create_dir_all(&absolute)?;
            info!(directory = %absolute.display(), "Created managed directory");
        }
        Ok(absolute.to_string_lossy().into_owned())
    }

    pub fn set_managed_dir(&self, path: &[&str], directory: String) -> Result<()> {
        self.set_value(path, Value::String(directory))
    }

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Minimum log level (`ERROR`, `WARN`, `INFO`, `DEBUG`, `TRACE`)
    pub fn get_log_min_level(&self) -> Result<String> {
        Ok(self
            .get_string(&["host", "logger", "min_level"])
            .unwrap_or_else(|| DEFAULT_LOG_MIN_LEVEL.to_string()))
    }

    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }

    /// Builds the in-memory override tree from environment variables
    fn env_overlay(vars: impl IntoIterator<Item = (String, String)>) -> Value {
        let mut vars: Vec<(String, String)> = vars.into_iter().collect();
        vars.sort();

        let mut overlay = Value::Mapping(Mapping::new());
        for (name, raw) in vars.iter().filter(|(name, _)| name.starts_with(ENV_PREFIX)) {
            let path: Vec<&str> = name[ENV_PREFIX.len()..].split("__").collect();
            if let Err(e) = insert_at(&mut overlay, &path, Self::convert_env_value(raw)) {
                warn!(env_var = %name, "Ignoring override: {}", e);
            }
        }

        for (alias, path) in ENV_ALIASES {
            let Some((_, raw)) = vars.iter().find(|(name, _)| name == alias) else {
                continue;
            };
            info!(env_var = alias, "Applying configuration alias");
            if let Err(e) = insert_at(&mut overlay, path, Value::String(raw.clone())) {
                warn!(env_var = alias, "Ignoring alias: {}", e);
            }
        }
        overlay
    }

    /// Environment values are YAML scalars; anything unparsable stays a string
    fn convert_env_value(raw: &str) -> Value {
        serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(self.data.lock().clone()),
            overlay: self.overlay.clone(),
        }
    }
}

/// Process-wide configuration, loaded on first access
///
/// # Panics
///
/// On first access, if the configuration directory cannot be prepared or
/// the YAML cannot be parsed.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

fn value_at<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut node = root;
    for (depth, key) in path.iter().enumerate() {
        let Value::Mapping(map) = node else {
            bail!("{} is not a mapping", path[..depth].join("."));
        };
        node = map
            .get(&Value::String(key.to_lowercase()))
            .ok_or_else(|| anyhow!("Path {} does not exist", path[..=depth].join(".")))?;
    }
    Ok(node)
}

/// Inserts `value` at `path` (keys lower-cased), creating mappings on the way
fn insert_at(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for key in parents {
        let Value::Mapping(map) = node else {
            bail!("Cannot set {}: {} is not a mapping", path.join("."), key);
        };
        node = map
            .entry(Value::String(key.to_lowercase()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    match node {
        Value::Mapping(map) => {
            map.insert(Value::String(last.to_lowercase()), value);
            Ok(())
        }
        _ => Err(anyhow!("Cannot set {}: parent is not a mapping", path.join("."))),
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lowercase_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Recursive merge: mappings are merged key by key, anything else in
/// `user` replaces the default
fn merge_yaml(defaults: &mut Value, user: &Value) {
    match (defaults, user) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_in(dir: &tempfile::TempDir) -> Config {
        Config::load_config(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults_are_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        assert_eq!(
            config.get_string(&["audio", "storage", "bucket"]).as_deref(),
            Some("mindshift-audio")
        );
        assert_eq!(
            config.get_string(&["audio", "local", "base_path"]).as_deref(),
            Some("/sounds")
        );
        assert!(dir.path().join("config.yaml").exists());
    }

    #[test]
    fn test_external_file_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "audio:\n  storage:\n    bucket: other-bucket\n",
        )
        .unwrap();

        let config = load_in(&dir);
        assert_eq!(
            config.get_string(&["audio", "storage", "bucket"]).as_deref(),
            Some("other-bucket")
        );
        // Untouched siblings keep their default
        assert_eq!(
            config.get_string(&["audio", "local", "base_path"]).as_deref(),
            Some("/sounds")
        );
    }

    #[test]
    fn test_keys_are_lowercased() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yaml"), "Host:\n  Logger:\n    Min_Level: DEBUG\n").unwrap();

        let config = load_in(&dir);
        assert_eq!(config.get_log_min_level().unwrap(), "DEBUG");
        assert_eq!(
            config.get_string(&["HOST", "logger", "MIN_LEVEL"]).as_deref(),
            Some("DEBUG")
        );
    }

    #[test]
    fn test_set_value_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        config.set_log_enable_console(false).unwrap();
        config.set_u64(&["player", "reload", "max_attempts"], 7).unwrap();

        let reloaded = load_in(&dir);
        assert!(!reloaded.get_log_enable_console().unwrap());
        assert_eq!(reloaded.get_u64_or(&["player", "reload", "max_attempts"], 0), 7);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        assert!(config.get_value(&["nope", "missing"]).is_err());
        assert_eq!(config.get_string(&["nope"]), None);
        assert_eq!(config.get_u64_or(&["nope"], 42), 42);
    }

    #[test]
    fn test_set_value_through_scalar_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        assert!(config
            .set_value(&["audio", "storage", "bucket", "deeper"], Value::Bool(true))
            .is_err());
    }

    #[test]
    fn test_managed_dir_is_created_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        let sounds = config
            .get_managed_dir(&["audio", "local", "directory"], "public/sounds")
            .unwrap();
        assert!(Path::new(&sounds).is_dir());
        assert!(sounds.starts_with(dir.path().to_str().unwrap()));
    }

    #[test]
    fn test_merge_replaces_sequences() {
        let mut defaults: Value = serde_yaml::from_str("a: [1, 2]\nb: {c: 1, d: 2}").unwrap();
        let user: Value = serde_yaml::from_str("a: [3]\nb: {c: 9}").unwrap();
        merge_yaml(&mut defaults, &user);

        let expected: Value = serde_yaml::from_str("a: [3]\nb: {c: 9, d: 2}").unwrap();
        assert_eq!(defaults, expected);
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overlay_parses_nested_keys() {
        let overlay = Config::env_overlay(vars(&[
            ("MINDSHIFT_CONFIG__PLAYER__RELOAD__MAX_ATTEMPTS", "9"),
            ("MINDSHIFT_CONFIG__Host__Logger__Enable_Console", "false"),
            ("UNRELATED", "1"),
        ]));

        let expected: Value = serde_yaml::from_str(
            "player: {reload: {max_attempts: 9}}\nhost: {logger: {enable_console: false}}",
        )
        .unwrap();
        assert_eq!(overlay, expected);
    }

    #[test]
    fn test_storage_alias_lands_on_endpoint() {
        let overlay = Config::env_overlay(vars(&[(
            "MINDSHIFT_STORAGE_URL",
            "https://abc.supabase.co",
        )]));

        assert_eq!(
            value_at(&overlay, &["audio", "storage", "endpoint"]).unwrap(),
            &Value::String("https://abc.supabase.co".into())
        );
    }

    #[test]
    fn test_overlay_wins_over_file_but_keeps_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = load_in(&dir);
        config.overlay = Config::env_overlay(vars(&[("MINDSHIFT_CONFIG__AUDIO__STORAGE__BUCKET", "from-env")]));

        assert_eq!(
            config.get_string(&["audio", "storage", "bucket"]).as_deref(),
            Some("from-env")
        );
        let storage = config.get_value(&["audio", "storage"]).unwrap();
        assert_eq!(storage["bucket"], Value::String("from-env".into()));
        assert!(storage.get("endpoint").is_some());

        config.save().unwrap();
        let text = fs::read_to_string(dir.path().join("config.yaml")).unwrap();
        assert!(!text.contains("from-env"));
    }

    #[test]
    fn test_config_override_variable_is_read() {
        env::set_var("MINDSHIFT_CONFIG__OVERRIDE_CHECK__LEVEL", "3");
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        env::remove_var("MINDSHIFT_CONFIG__OVERRIDE_CHECK__LEVEL");

        assert_eq!(config.get_u64_or(&["override_check", "level"], 0), 3);
    }

    #[test]
    fn test_storage_alias_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();

        env::set_var("MINDSHIFT_STORAGE_URL", "https://abc.supabase.co");
        let config = load_in(&dir);
        env::remove_var("MINDSHIFT_STORAGE_URL");
        assert_eq!(
            config.get_string(&["audio", "storage", "endpoint"]).as_deref(),
            Some("https://abc.supabase.co")
        );

        let text = fs::read_to_string(dir.path().join("config.yaml")).unwrap();
        assert!(!text.contains("abc.supabase.co"));

        let reloaded = load_in(&dir);
        assert_eq!(
            reloaded.get_string(&["audio", "storage", "endpoint"]).as_deref(),
            Some("")
        );
    }

    #[test]
    fn test_convert_env_value() {
        assert_eq!(Config::convert_env_value("12"), Value::Number(Number::from(12)));
        assert_eq!(Config::convert_env_value("true"), Value::Bool(true));
        assert_eq!(
            Config::convert_env_value("https://abc.supabase.co"),
            Value::String("https://abc.supabase.co".into())
        );
    }
}
