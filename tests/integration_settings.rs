use std::fs;

use indoc::indoc;
use term_gloss::settings::{DEFAULT_FONT_SIZE, Provider, Settings, SettingsError, TriggerModifier};
use tracing::Level;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = Settings::load(Some(&dir.path().join("absent.toml"))).expect("loads");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.provider, Provider::Mock);
    assert_eq!(settings.model, "gemini-2.5-flash");
    assert_eq!(settings.target_language, "Korean");
    assert_eq!(settings.content_font_size, 16);
    assert_eq!(settings.trigger_modifier, TriggerModifier::Ctrl);
    assert_eq!(settings.log_level, Level::INFO);
}

#[test]
fn loads_file_and_falls_back_per_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.toml");
    fs::write(
        &path,
        indoc! {r#"
            provider = "command"
            command = "llm-translate --stream"
            target_language = "Italian"
            content_font_size = 0
            trigger_modifier = "hyper"
        "#},
    )
    .expect("writes");

    let settings = Settings::load(Some(&path)).expect("loads");
    assert_eq!(settings.provider, Provider::Command);
    assert_eq!(settings.command.as_deref(), Some("llm-translate --stream"));
    assert_eq!(settings.target_language, "Italian");
    assert_eq!(settings.content_font_size, DEFAULT_FONT_SIZE);
    assert_eq!(settings.trigger_modifier, TriggerModifier::Ctrl);
}

#[test]
fn non_table_content_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.toml");
    fs::write(&path, "[[[not toml").expect("writes");
    assert_eq!(Settings::load(Some(&path)).expect("loads"), Settings::default());
}

#[test]
fn unreadable_path_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    // A directory exists at the path but cannot be read as a file.
    match Settings::load(Some(dir.path())) {
        Err(SettingsError::Read { path, .. }) => assert_eq!(path, dir.path()),
        other => panic!("expected a read error, got {other:?}"),
    }
}

#[test]
fn saved_settings_load_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("settings.toml");
    let settings = Settings {
        provider: Provider::Command,
        model: " gpt-4o-mini ".to_string(),
        api_key: "secret".to_string(),
        target_language: "Japanese".to_string(),
        content_font_size: 20,
        command: Some("llm --stream".to_string()),
        trigger_modifier: TriggerModifier::Alt,
        log_level: Level::DEBUG,
    };
    settings.save(&path).expect("saves");

    let loaded = Settings::load(Some(&path)).expect("loads");
    assert_eq!(loaded.model, "gpt-4o-mini");
    assert_eq!(
        loaded,
        Settings {
            model: "gpt-4o-mini".to_string(),
            ..settings
        }
    );
}

#[test]
fn saving_without_api_key_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.toml");
    match Settings::default().save(&path) {
        Err(SettingsError::Empty(field)) => assert_eq!(field, "api_key"),
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert!(!path.exists());
}
