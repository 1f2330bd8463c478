//! Chromium DevTools Protocol plumbing for statgrab.
//!
//! The crate owns everything needed to drive one short-lived Chromium: executable discovery,
//! launch with an isolated profile, the raw command/event transport, and a [`PageSession`]
//! exposing the handful of page commands the renderer relies on.

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
    pub enum AdapterErrorKind {
        #[error("navigation timed out")]
        NavTimeout,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("browser launch failed")]
        LaunchFailed,
        #[error("target element not found")]
        TargetNotFound,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
        pub data: Option<serde_json::Value>,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
                data: None,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }

        pub fn with_data(mut self, data: serde_json::Value) -> Self {
            self.data = Some(data);
            self
        }
    }
}

pub mod config {
    use crate::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::path::PathBuf;

    /// Configuration for launching and talking to one browser instance.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CdpConfig {
        pub executable: PathBuf,
        pub headless: bool,
        /// Pass `--no-sandbox`; required in most containers.
        pub no_sandbox: bool,
        pub default_deadline_ms: u64,
        pub launch_timeout_ms: u64,
        pub extra_args: Vec<String>,
        /// Attach to an already running browser instead of launching one.
        pub websocket_url: Option<String>,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: detect_chrome_executable().unwrap_or_default(),
                headless: true,
                no_sandbox: true,
                default_deadline_ms: 30_000,
                launch_timeout_ms: 20_000,
                extra_args: Vec::new(),
                websocket_url: None,
            }
        }
    }
}

pub mod discovery;
pub mod metrics;
pub mod session;
pub mod transport;
pub mod util;

pub use config::CdpConfig;
pub use discovery::{detect_chrome_executable, discover_browser, BrowserDiscovery, DiscoverySource};
pub use error::{AdapterError, AdapterErrorKind};
pub use session::PageSession;
pub use transport::{ChromiumTransport, CdpTransport, CommandTarget, TransportEvent};
