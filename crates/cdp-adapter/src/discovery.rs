//! Chromium executable discovery.

use std::env;
use std::path::PathBuf;

use tracing::debug;

pub const CHROME_ENV: &str = "STATGRAB_CHROME";
/// Any non-blank value disables the well-known install locations (used by tests).
pub const SKIP_INSTALL_DIRS_ENV: &str = "STATGRAB_SKIP_OS_PATHS";

#[cfg(windows)]
const BINARY_NAMES: &[&str] = &["chrome.exe", "chromium.exe", "msedge.exe"];
#[cfg(not(windows))]
const BINARY_NAMES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome-stable",
    "google-chrome",
    "headless_shell",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscoverySource {
    Env,
    Path,
    InstallDir,
}

impl DiscoverySource {
    pub fn describe(self) -> &'static str {
        match self {
            DiscoverySource::Env => CHROME_ENV,
            DiscoverySource::Path => "PATH",
            DiscoverySource::InstallDir => "install directory",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrowserDiscovery {
    pub path: PathBuf,
    pub source: DiscoverySource,
}

/// First usable browser binary, checking the env override, `PATH`, then install directories.
pub fn discover_browser() -> Option<BrowserDiscovery> {
    let found = from_env()
        .map(|path| (path, DiscoverySource::Env))
        .or_else(|| from_path().map(|path| (path, DiscoverySource::Path)))
        .or_else(|| from_install_dirs().map(|path| (path, DiscoverySource::InstallDir)))
        .map(|(path, source)| BrowserDiscovery { path, source });

    match &found {
        Some(found) => debug!(
            target: "cdp-discovery",
            path = %found.path.display(),
            source = found.source.describe(),
            "browser executable located"
        ),
        None => debug!(target: "cdp-discovery", "no browser executable located"),
    }
    found
}

pub fn detect_chrome_executable() -> Option<PathBuf> {
    discover_browser().map(|found| found.path)
}

fn non_blank_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn from_env() -> Option<PathBuf> {
    non_blank_env(CHROME_ENV)
        .map(PathBuf::from)
        .filter(|path| path.exists())
}

fn from_path() -> Option<PathBuf> {
    BINARY_NAMES.iter().find_map(|name| which::which(name).ok())
}

fn from_install_dirs() -> Option<PathBuf> {
    if non_blank_env(SKIP_INSTALL_DIRS_ENV).is_some() {
        return None;
    }
    install_candidates().into_iter().find(|path| path.exists())
}

fn install_candidates() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        [
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    } else if cfg!(windows) {
        ["LOCALAPPDATA", "PROGRAMFILES", "PROGRAMFILES(X86)"]
            .iter()
            .filter_map(|key| non_blank_env(key))
            .flat_map(|root| {
                let root = PathBuf::from(root);
                [
                    root.join("Chromium/Application/chrome.exe"),
                    root.join("Google/Chrome/Application/chrome.exe"),
                ]
            })
            .collect()
    } else {
        [
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/snap/bin/chromium",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    }
}
