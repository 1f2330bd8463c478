use std::path::PathBuf;

use statgrab::Config;
use stealth::config::load_bundle_from_path;
use stealth::StealthRuntime;

fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn example_config_matches_defaults() {
    let parsed = Config::from_path(&config_dir().join("statgrab.example.yaml")).unwrap();
    let defaults = Config::default();
    assert_eq!(parsed.server.port, defaults.server.port);
    assert!(parsed.server.api_key.is_none());
    assert_eq!(
        parsed.render.blocked_resource_types,
        defaults.render.blocked_resource_types
    );
    assert_eq!(parsed.render.marker_selector, defaults.render.marker_selector);
    assert_eq!(parsed.render.grace_delay_ms, defaults.render.grace_delay_ms);
}

#[test]
fn example_stealth_bundle_loads() {
    let bundle = load_bundle_from_path(config_dir().join("stealth_profiles.example.yaml")).unwrap();
    let runtime = StealthRuntime::from_bundle(bundle, None).unwrap();
    let active = runtime.active_profile();
    assert_eq!(active.name, "desktop_chrome_linux");
    assert_eq!(active.timezone.as_deref(), Some("America/New_York"));
    assert!(runtime.profile_names().contains(&"plain".to_string()));
}
