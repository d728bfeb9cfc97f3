#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use adminlink_config::{
    Config, Defaults, Profile, auth_state_for, load_config_from, profile_to_controller_config,
    save_config_to,
};
use pretty_assertions::assert_eq;

#[test]
fn saved_profiles_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut profiles = HashMap::new();
    profiles.insert(
        "lab".to_owned(),
        Profile {
            server: "http://127.0.0.1:3000".into(),
            username: Some("ops".into()),
            role: "supervisor".into(),
            token_env: Some("LAB_TOKEN".into()),
            transports: Some(vec!["polling".into(), "websocket".into()]),
            ..Profile::default()
        },
    );
    let config = Config {
        default_profile: Some("lab".into()),
        defaults: Defaults::default(),
        profiles,
    };
    save_config_to(&config, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    let (name, profile) = loaded.profile(None).unwrap();
    assert_eq!(name, "lab");
    assert_eq!(profile.role, "supervisor");
    assert_eq!(profile.token_env.as_deref(), Some("LAB_TOKEN"));

    let auth = auth_state_for(profile, &name).unwrap();
    assert_eq!(auth.identity.unwrap().role, "supervisor");

    let controller = profile_to_controller_config(profile, &loaded.defaults).unwrap();
    assert_eq!(controller.url.as_str(), "http://127.0.0.1:3000/");
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(loaded.default_profile.as_deref(), Some("default"));
    assert!(loaded.profiles.is_empty());
    assert_eq!(loaded.defaults.timeout, 20);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[profiles.lab]\nserver = 42\n").unwrap();

    assert!(load_config_from(&path).is_err());
}
