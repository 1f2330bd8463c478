use std::sync::Arc;

use async_trait::async_trait;
use cdp_adapter::{AdapterError, CdpTransport, CommandTarget, PageSession, TransportEvent};
use serde_json::{json, Value};
use stealth::config::{load_bundle_from_path, Evasions, StealthProfile};
use stealth::{StealthControl, StealthRuntime};
use tokio::sync::Mutex;

#[derive(Default)]
struct RecordingTransport {
    commands: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl CdpTransport for RecordingTransport {
    async fn next_event(&self) -> Option<TransportEvent> {
        None
    }

    async fn send_command(
        &self,
        _target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        self.commands
            .lock()
            .await
            .push((method.to_string(), params));
        Ok(match method {
            "Target.createTarget" => json!({ "targetId": "T-1" }),
            "Target.attachToTarget" => json!({ "sessionId": "S-1" }),
            "Page.addScriptToEvaluateOnNewDocument" => json!({ "identifier": "1" }),
            _ => Value::Null,
        })
    }

    async fn close(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}

async fn page() -> (Arc<RecordingTransport>, PageSession) {
    let transport = Arc::new(RecordingTransport::default());
    let session = PageSession::create(transport.clone() as Arc<dyn CdpTransport>)
        .await
        .unwrap();
    transport.commands.lock().await.clear();
    (transport, session)
}

#[tokio::test]
async fn configure_page_applies_profile_before_scripts() {
    let (transport, session) = page().await;
    let runtime = StealthRuntime::new();

    runtime.configure_page(&session).await.unwrap();

    let commands = transport.commands.lock().await;
    let methods: Vec<&str> = commands.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(
        &methods[..3],
        &[
            "Emulation.setUserAgentOverride",
            "Emulation.setLocaleOverride",
            "Emulation.setDeviceMetricsOverride"
        ]
    );
    assert_eq!(
        methods
            .iter()
            .filter(|m| **m == "Page.addScriptToEvaluateOnNewDocument")
            .count(),
        5
    );
    assert_eq!(
        commands[0].1["userAgent"],
        json!(stealth::config::DEFAULT_USER_AGENT)
    );
    assert_eq!(commands[2].1["width"], json!(1920));
}

#[tokio::test]
async fn bare_profile_only_overrides_user_agent() {
    let (transport, session) = page().await;
    let runtime = StealthRuntime::new();
    runtime.load_bundle(stealth::config::StealthProfileBundle {
        profiles: vec![StealthProfile {
            name: "bare".into(),
            user_agent: "UA/2".into(),
            accept_language: None,
            platform: None,
            locale: None,
            timezone: Some("Europe/Berlin".into()),
            viewport: None,
            evasions: Evasions::none(),
        }],
        default_profile: None,
    });
    runtime.select("bare").unwrap();

    runtime.configure_page(&session).await.unwrap();

    let commands = transport.commands.lock().await;
    let methods: Vec<&str> = commands.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(
        methods,
        vec!["Emulation.setUserAgentOverride", "Emulation.setTimezoneOverride"]
    );
    assert_eq!(commands[0].1, json!({ "userAgent": "UA/2" }));
}

#[test]
fn bundle_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.yaml");
    std::fs::write(
        &path,
        "profiles:\n  - name: slim\n    user_agent: \"UA/3\"\n    locale: fr-FR\n",
    )
    .unwrap();

    let bundle = load_bundle_from_path(&path).unwrap();
    let runtime = StealthRuntime::from_bundle(bundle, Some("slim")).unwrap();
    assert_eq!(runtime.active_profile().locale.as_deref(), Some("fr-FR"));
    assert_eq!(
        stealth::navigator_languages(&runtime.active_profile()),
        vec!["fr-FR", "fr"]
    );
}
