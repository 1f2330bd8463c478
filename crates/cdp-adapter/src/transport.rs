use std::collections::HashMap;
use std::convert::TryInto;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::async_process::Child;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::target::SessionId as CdpSessionId;
use chromiumoxide::cdp::events::CdpEventMessage;
use chromiumoxide::conn::Connection;
use chromiumoxide::error::CdpError;
use chromiumoxide_types::{CallId, CdpJsonEventMessage, Message, MethodId, Response};
use futures::StreamExt;
use serde_json::json;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::metrics;
use crate::util::extract_ws_url;

#[derive(Clone, Debug)]
pub struct TransportEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

#[derive(Clone, Debug)]
pub enum CommandTarget {
    Browser,
    Session(String),
}

/// Raw DevTools channel to one browser.
#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn next_event(&self) -> Option<TransportEvent>;
    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError>;
    /// Shut the browser down. Calling it again is a no-op.
    async fn close(&self) -> Result<(), AdapterError>;
}

const BROWSER_CLOSE_GRACE: Duration = Duration::from_secs(2);

type Responder = oneshot::Sender<Result<Value, AdapterError>>;

struct ControlMessage {
    target: CommandTarget,
    method: String,
    params: Value,
    responder: Responder,
}

/// Commands submitted to the browser and still waiting for their response.
#[derive(Default)]
struct Inflight(HashMap<CallId, Responder>);

impl Inflight {
    fn register(&mut self, call_id: CallId, responder: Responder) {
        self.0.insert(call_id, responder);
    }

    fn resolve(&mut self, resp: Response) {
        let Some(responder) = self.0.remove(&resp.id) else {
            debug!(target: "cdp-transport", id = ?resp.id, "response without pending command");
            return;
        };
        let _ = responder.send(ChromiumTransport::extract_payload(resp));
    }

    /// Fail every pending command with `err`.
    fn fail_all(&mut self, err: &AdapterError) {
        for (_, responder) in self.0.drain() {
            let _ = responder.send(Err(err.clone()));
        }
    }
}

/// Transport owning a launched Chromium process and its throwaway profile directory.
pub struct ChromiumTransport {
    cfg: CdpConfig,
    command_tx: mpsc::Sender<ControlMessage>,
    events_rx: Mutex<mpsc::UnboundedReceiver<TransportEvent>>,
    loop_task: JoinHandle<()>,
    child: Mutex<Option<Child>>,
    profile_dir: Mutex<Option<TempDir>>,
    alive: Arc<AtomicBool>,
    closed: AtomicBool,
}

impl ChromiumTransport {
    /// Launch a fresh browser, or attach when `websocket_url` is set.
    pub async fn launch(cfg: CdpConfig) -> Result<Self, AdapterError> {
        let result = Self::launch_inner(cfg).await;
        metrics::record_launch(result.is_ok());
        result
    }

    async fn launch_inner(cfg: CdpConfig) -> Result<Self, AdapterError> {
        if let Some(url) = cfg.websocket_url.clone() {
            let conn = Self::connect(&url, &cfg).await?;
            return Ok(Self::spawn(cfg, conn, None, None, &url));
        }

        let profile = tempfile::Builder::new()
            .prefix("statgrab-profile-")
            .tempdir()
            .map_err(|err| {
                AdapterError::new(AdapterErrorKind::LaunchFailed)
                    .with_hint(format!("failed to create user-data-dir: {err}"))
            })?;
        let browser_cfg = Self::browser_config(&cfg, profile.path())?;
        let mut child = Self::launch_browser(browser_cfg)?;

        let launch_timeout = Duration::from_millis(cfg.launch_timeout_ms);
        let ws_url = match extract_ws_url(&mut child, launch_timeout).await {
            Ok(url) => url,
            Err(err) => {
                Self::kill_child(&mut child).await;
                return Err(AdapterError::new(AdapterErrorKind::LaunchFailed)
                    .with_hint(err.to_string())
                    .retriable(true));
            }
        };

        let conn = match Self::connect(&ws_url, &cfg).await {
            Ok(conn) => conn,
            Err(err) => {
                Self::kill_child(&mut child).await;
                return Err(err);
            }
        };

        Ok(Self::spawn(cfg, conn, Some(child), Some(profile), &ws_url))
    }

    async fn connect(
        ws_url: &str,
        cfg: &CdpConfig,
    ) -> Result<Connection<CdpEventMessage>, AdapterError> {
        let wait = Duration::from_millis(cfg.launch_timeout_ms);
        match tokio::time::timeout(wait, Connection::<CdpEventMessage>::connect(ws_url)).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(err)) => Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string())),
            Err(_) => Err(AdapterError::new(AdapterErrorKind::LaunchFailed)
                .with_hint(format!("devtools connect to {ws_url} timed out"))),
        }
    }

    fn spawn(
        cfg: CdpConfig,
        conn: Connection<CdpEventMessage>,
        child: Option<Child>,
        profile_dir: Option<TempDir>,
        ws_url: &str,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(128);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let alive = Arc::new(AtomicBool::new(true));
        let loop_alive = alive.clone();
        let loop_task = tokio::spawn(async move {
            let result = Self::run_loop(conn, command_rx, events_tx).await;
            loop_alive.store(false, Ordering::Relaxed);
            if let Err(err) = result {
                error!(target: "cdp-transport", ?err, "transport loop terminated with error");
            }
        });

        info!(target: "cdp-transport", url = %ws_url, "chromium connection established");

        Self {
            cfg,
            command_tx,
            events_rx: Mutex::new(events_rx),
            loop_task,
            child: Mutex::new(child),
            profile_dir: Mutex::new(profile_dir),
            alive,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed) && !self.closed.load(Ordering::SeqCst)
    }

    async fn send_internal(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, AdapterError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        let message = ControlMessage {
            target,
            method: method.to_string(),
            params,
            responder: resp_tx,
        };

        self.command_tx
            .send(message)
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;

        match tokio::time::timeout(deadline, resp_rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(_)) => Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint("command response channel closed")),
            Err(_) => Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(format!("{method} timed out"))
                .retriable(true)),
        }
    }

    fn browser_config(cfg: &CdpConfig, profile_dir: &Path) -> Result<BrowserConfig, AdapterError> {
        if !cfg.executable.as_os_str().is_empty() && !cfg.executable.exists() {
            return Err(AdapterError::new(AdapterErrorKind::LaunchFailed)
                .with_hint(format!(
                    "chrome executable not found at {}",
                    cfg.executable.display()
                ))
                .with_data(json!({
                    "expected": cfg.executable,
                    "hint": "Set STATGRAB_CHROME to the full path of chrome/chromium."
                })));
        }

        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_millis(cfg.default_deadline_ms))
            .launch_timeout(Duration::from_millis(cfg.launch_timeout_ms))
            .disable_default_args();

        if !cfg.headless {
            builder = builder.with_head();
        }
        if cfg.no_sandbox {
            builder = builder.no_sandbox();
        }

        let mut args: Vec<String> = [
            "--disable-background-networking",
            "--disable-background-timer-throttling",
            "--disable-breakpad",
            "--disable-client-side-phishing-detection",
            "--disable-component-update",
            "--disable-default-apps",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--disable-gpu",
            "--disable-hang-monitor",
            "--disable-popup-blocking",
            "--disable-prompt-on-repost",
            "--disable-sync",
            "--metrics-recording-only",
            "--no-first-run",
            "--no-default-browser-check",
            "--no-zygote",
            "--password-store=basic",
            "--remote-allow-origins=*",
            "--use-mock-keychain",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect();
        if cfg.headless {
            args.push("--headless=new".into());
            args.push("--hide-scrollbars".into());
            args.push("--mute-audio".into());
        }
        args.extend(cfg.extra_args.iter().cloned());
        builder = builder.args(args);

        if !cfg.executable.as_os_str().is_empty() {
            builder = builder.chrome_executable(cfg.executable.clone());
        }
        builder = builder.user_data_dir(profile_dir);

        builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::LaunchFailed)
                .with_hint(format!("browser config error: {err}"))
        })
    }

    fn launch_browser(config: BrowserConfig) -> Result<Child, AdapterError> {
        config.launch().map_err(|err| {
            AdapterError::new(AdapterErrorKind::LaunchFailed)
                .with_hint(format!("failed to launch chromium: {err}"))
        })
    }

    async fn kill_child(child: &mut Child) {
        if let Err(err) = child.kill().await {
            debug!(target: "cdp-transport", ?err, "chromium child already gone");
        }
    }

    async fn run_loop(
        mut conn: Connection<CdpEventMessage>,
        mut command_rx: mpsc::Receiver<ControlMessage>,
        event_tx: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), AdapterError> {
        let mut inflight = Inflight::default();

        loop {
            tokio::select! {
                Some(cmd) = command_rx.recv() => {
                    Self::handle_command(&mut conn, cmd, &mut inflight)?;
                }
                message = conn.next() => {
                    match message {
                        Some(Ok(Message::Response(resp))) => inflight.resolve(resp),
                        Some(Ok(Message::Event(event))) => {
                            if let Err(err) = Self::handle_event(event, &event_tx) {
                                debug!(target: "cdp-transport", ?err, "dropped event");
                            }
                        }
                        Some(Err(err)) => {
                            let adapter_err = Self::map_cdp_error(err);
                            inflight.fail_all(&adapter_err);
                            return Err(adapter_err);
                        }
                        None => {
                            inflight.fail_all(
                                &AdapterError::new(AdapterErrorKind::CdpIo)
                                    .with_hint("browser closed the devtools connection"),
                            );
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn handle_command(
        conn: &mut Connection<CdpEventMessage>,
        cmd: ControlMessage,
        inflight: &mut Inflight,
    ) -> Result<(), AdapterError> {
        let session = match cmd.target {
            CommandTarget::Browser => None,
            CommandTarget::Session(session_id) => Some(CdpSessionId::from(session_id)),
        };

        let method_id: MethodId = cmd.method.clone().into();
        match conn.submit_command(method_id, session, cmd.params) {
            Ok(call_id) => {
                inflight.register(call_id, cmd.responder);
                Ok(())
            }
            Err(err) => {
                let adapter_err =
                    AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string());
                let _ = cmd.responder.send(Err(adapter_err.clone()));
                Err(adapter_err)
            }
        }
    }

    fn handle_event(
        event: CdpEventMessage,
        event_tx: &mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), AdapterError> {
        let raw: CdpJsonEventMessage = event.try_into().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("failed to decode cdp event: {err}"))
        })?;

        let payload = TransportEvent {
            method: raw.method.into_owned(),
            params: raw.params,
            session_id: raw.session_id,
        };

        event_tx
            .send(payload)
            .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))
    }

    fn extract_payload(resp: Response) -> Result<Value, AdapterError> {
        if let Some(result) = resp.result {
            Ok(result)
        } else if let Some(error) = resp.error {
            let retriable = error.code >= 500;
            Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("cdp error {}: {}", error.code, error.message))
                .retriable(retriable))
        } else {
            Err(AdapterError::new(AdapterErrorKind::Internal).with_hint("empty cdp response"))
        }
    }

    fn map_cdp_error(err: CdpError) -> AdapterError {
        let hint = err.to_string();
        match err {
            CdpError::Timeout => AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(hint)
                .retriable(true),
            CdpError::LaunchExit(_, _) | CdpError::LaunchTimeout(_) | CdpError::LaunchIo(_, _) => {
                AdapterError::new(AdapterErrorKind::LaunchFailed).with_hint(hint)
            }
            CdpError::Serde(_) | CdpError::FrameNotFound(_) | CdpError::JavascriptException(_) => {
                AdapterError::new(AdapterErrorKind::Internal).with_hint(hint)
            }
            _ => AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(hint)
                .retriable(true),
        }
    }
}

#[async_trait]
impl CdpTransport for ChromiumTransport {
    async fn next_event(&self) -> Option<TransportEvent> {
        let mut guard = self.events_rx.lock().await;
        guard.recv().await
    }

    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("transport closed before {method}")));
        }
        self.send_internal(
            target,
            method,
            params,
            Duration::from_millis(self.cfg.default_deadline_ms),
        )
        .await
    }

    async fn close(&self) -> Result<(), AdapterError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if self.alive.load(Ordering::Relaxed) {
            if let Err(err) = self
                .send_internal(
                    CommandTarget::Browser,
                    "Browser.close",
                    json!({}),
                    BROWSER_CLOSE_GRACE,
                )
                .await
            {
                debug!(target: "cdp-transport", %err, "Browser.close did not complete");
            }
        }

        self.alive.store(false, Ordering::Relaxed);
        self.loop_task.abort();

        if let Some(mut child) = self.child.lock().await.take() {
            Self::kill_child(&mut child).await;
        }
        if let Some(dir) = self.profile_dir.lock().await.take() {
            if let Err(err) = dir.close() {
                warn!(target: "cdp-transport", ?err, "failed to remove browser profile dir");
            }
        }

        info!(target: "cdp-transport", "browser closed");
        Ok(())
    }
}

impl Drop for ChromiumTransport {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
        self.loop_task.abort();

        if let Ok(mut guard) = self.child.try_lock() {
            if let Some(mut child) = guard.take() {
                warn!(target: "cdp-transport", "transport dropped without close; killing chromium");
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        if let Err(err) = child.kill().await {
                            warn!(target: "cdp-transport", ?err, "failed to kill chromium child");
                        }
                    });
                } else {
                    debug!(target: "cdp-transport", "no tokio runtime available to kill chromium child");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    impl ChromiumTransport {
        /// Transport whose loop answers every command with `null` and counts `Browser.close`.
        fn stub(browser_closes: Arc<AtomicUsize>) -> Self {
            let (command_tx, mut command_rx) = mpsc::channel::<ControlMessage>(8);
            let (_events_tx, events_rx) = mpsc::unbounded_channel();
            let alive = Arc::new(AtomicBool::new(true));
            let loop_task = tokio::spawn(async move {
                while let Some(cmd) = command_rx.recv().await {
                    if cmd.method == "Browser.close" {
                        browser_closes.fetch_add(1, Ordering::SeqCst);
                    }
                    let _ = cmd.responder.send(Ok(Value::Null));
                }
            });
            Self {
                cfg: CdpConfig {
                    default_deadline_ms: 1_000,
                    ..CdpConfig::default()
                },
                command_tx,
                events_rx: Mutex::new(events_rx),
                loop_task,
                child: Mutex::new(None),
                profile_dir: Mutex::new(tempfile::tempdir().ok()),
                alive,
                closed: AtomicBool::new(false),
            }
        }
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let closes = Arc::new(AtomicUsize::new(0));
        let transport = ChromiumTransport::stub(closes.clone());
        let profile = transport
            .profile_dir
            .lock()
            .await
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .unwrap();
        assert!(profile.exists());

        transport.close().await.unwrap();
        transport.close().await.unwrap();

        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(!transport.is_alive());
        assert!(!profile.exists());
    }

    #[tokio::test]
    async fn commands_after_close_fail_fast() {
        let transport = ChromiumTransport::stub(Arc::new(AtomicUsize::new(0)));
        let value = transport
            .send_command(CommandTarget::Browser, "Browser.getVersion", json!({}))
            .await
            .unwrap();
        assert_eq!(value, Value::Null);

        transport.close().await.unwrap();
        let err = transport
            .send_command(CommandTarget::Browser, "Browser.getVersion", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::CdpIo);
    }

    #[tokio::test]
    async fn inflight_resolves_by_call_id_and_fails_the_rest() {
        let mut inflight = Inflight::default();
        let (answered_tx, answered_rx) = oneshot::channel();
        let (pending_tx, pending_rx) = oneshot::channel();
        inflight.register(serde_json::from_value(json!(1)).unwrap(), answered_tx);
        inflight.register(serde_json::from_value(json!(2)).unwrap(), pending_tx);

        let resp: Response =
            serde_json::from_value(json!({ "id": 1, "result": { "frameId": "F" } })).unwrap();
        inflight.resolve(resp);
        inflight.fail_all(&AdapterError::new(AdapterErrorKind::CdpIo).with_hint("gone"));

        assert_eq!(answered_rx.await.unwrap().unwrap()["frameId"], "F");
        let err = pending_rx.await.unwrap().unwrap_err();
        assert_eq!(err.hint.as_deref(), Some("gone"));
    }

    #[test]
    fn rejects_missing_executable() {
        let cfg = CdpConfig {
            executable: "/definitely/not/here/chrome".into(),
            ..CdpConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = ChromiumTransport::browser_config(&cfg, dir.path()).unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::LaunchFailed);
        assert!(err.data.is_some());
    }

    #[test]
    fn error_responses_map_to_cdp_io() {
        let resp: Response = serde_json::from_value(json!({
            "id": 7,
            "error": { "code": -32000, "message": "Cannot navigate to invalid URL" }
        }))
        .unwrap();
        let err = ChromiumTransport::extract_payload(resp).unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::CdpIo);
        assert!(!err.retriable);
        assert!(err.to_string().contains("Cannot navigate"));
    }
}
