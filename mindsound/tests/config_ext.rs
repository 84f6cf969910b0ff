#![cfg(feature = "mindconfig")]

use mindconfig::Config;
use mindsound::{AudioConfigExt, SoundId};
use parking_lot::{Mutex, MutexGuard};
use std::env;
use std::fs;
use tempfile::TempDir;

const STORAGE_URL_VAR: &str = "MINDSHIFT_STORAGE_URL";

// Configs read the environment when loaded; tests touching it run one at a time
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_guard() -> MutexGuard<'static, ()> {
    let guard = ENV_LOCK.lock();
    env::remove_var(STORAGE_URL_VAR);
    guard
}

fn config_with(yaml: &str) -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yaml"), yaml).unwrap();
    let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
    (dir, config)
}

#[test]
fn test_default_catalogue() {
    let _env = env_guard();
    let (_dir, config) = config_with("{}\n");
    assert_eq!(config.get_storage_endpoint(), "");

    let sources = config.get_audio_source_config().unwrap();
    assert_eq!(
        sources.resolve_candidates("rain"),
        vec![
            "/sounds/rain.mp3".to_string(),
            "https://cdn.pixabay.com/download/audio/2022/03/10/audio_bb630cc098.mp3?filename=rain-and-thunder-ambient-116927.mp3".to_string(),
            "https://www.soundjay.com/misc/sounds/rain-01.mp3".to_string(),
        ]
    );
    assert_eq!(
        sources.primary_url(SoundId::Background).as_deref(),
        Some("/sounds/Evening-Improvisation-with-Ethera(chosic.com).mp3")
    );
}

#[test]
fn test_storage_endpoint_enables_tier() {
    let _env = env_guard();
    let (_dir, config) = config_with(
        "audio:\n  storage:\n    endpoint: https://proj.supabase.co\n    bucket: sounds\n",
    );

    let sources = config.get_audio_source_config().unwrap();
    let urls = sources.candidates(SoundId::Ocean);
    assert_eq!(urls[0], "/sounds/ocean.mp3");
    assert_eq!(
        urls[1],
        "https://proj.supabase.co/storage/v1/object/public/sounds/ocean.mp3"
    );
}

#[test]
fn test_set_external_file_id_round_trips() {
    let (_dir, config) = config_with("{}\n");

    config.set_external_file_id(SoundId::Piano, "1xyz").unwrap();
    let sources = config.get_audio_source_config().unwrap();

    assert!(sources
        .candidates(SoundId::Piano)
        .contains(&"https://drive.google.com/uc?export=download&id=1xyz".to_string()));
}

#[test]
fn test_set_storage_endpoint() {
    let _env = env_guard();
    let (_dir, config) = config_with("{}\n");

    config.set_storage_endpoint("https://other.supabase.co").unwrap();
    assert_eq!(config.get_storage_endpoint(), "https://other.supabase.co");

    config.set_storage_endpoint("").unwrap();
    let sources = config.get_audio_source_config().unwrap();
    assert!(!sources.storage.enabled());
}

#[test]
fn test_sounds_directory_is_created() {
    let (dir, config) = config_with("{}\n");

    let sounds = config.get_sounds_directory().unwrap();
    assert!(std::path::Path::new(&sounds).is_dir());
    assert!(sounds.starts_with(dir.path().to_str().unwrap()));
}

#[test]
fn test_storage_url_variable_enables_tier_for_this_run_only() {
    let _env = env_guard();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_str().unwrap();

    env::set_var(STORAGE_URL_VAR, "https://envproj.supabase.co/");
    let config = Config::load_config(path).unwrap();
    env::remove_var(STORAGE_URL_VAR);

    let sources = config.get_audio_source_config().unwrap();
    assert!(sources.storage.enabled());
    assert_eq!(
        sources.candidates(SoundId::Rain)[1],
        "https://envproj.supabase.co/storage/v1/object/public/mindshift-audio/rain.mp3"
    );

    let reloaded = Config::load_config(path).unwrap();
    assert!(!reloaded.get_audio_source_config().unwrap().storage.enabled());
}

#[test]
fn test_nested_override_variable_reaches_audio_config() {
    let _env = env_guard();
    let dir = tempfile::tempdir().unwrap();

    env::set_var("MINDSHIFT_CONFIG__AUDIO__LOCAL__BASE_PATH", "/static/audio");
    let config = Config::load_config(dir.path().to_str().unwrap());
    env::remove_var("MINDSHIFT_CONFIG__AUDIO__LOCAL__BASE_PATH");

    let sources = config.unwrap().get_audio_source_config().unwrap();
    assert_eq!(
        sources.primary_url(SoundId::Forest).as_deref(),
        Some("/static/audio/forest.mp3")
    );
}
