//! Init scripts that paper over the most common headless fingerprints.

use crate::config::StealthProfile;

const HIDE_WEBDRIVER: &str = r#"(() => {
  Object.defineProperty(Navigator.prototype, 'webdriver', { get: () => undefined, configurable: true });
})();"#;

const CHROME_RUNTIME: &str = r#"(() => {
  if (!window.chrome) {
    Object.defineProperty(window, 'chrome', { value: {}, writable: true, configurable: true });
  }
  if (!window.chrome.runtime) {
    window.chrome.runtime = { connect: () => {}, sendMessage: () => {}, id: undefined };
  }
  if (!window.chrome.app) {
    window.chrome.app = { isInstalled: false };
  }
})();"#;

const PLUGINS: &str = r#"(() => {
  const names = ['PDF Viewer', 'Chrome PDF Viewer', 'Chromium PDF Viewer', 'Microsoft Edge PDF Viewer', 'WebKit built-in PDF'];
  const plugins = names.map((name) => ({ name, filename: 'internal-pdf-viewer', description: 'Portable Document Format', length: 1 }));
  Object.defineProperty(Navigator.prototype, 'plugins', { get: () => plugins, configurable: true });
  Object.defineProperty(Navigator.prototype, 'mimeTypes', {
    get: () => [{ type: 'application/pdf', suffixes: 'pdf', description: 'Portable Document Format' }],
    configurable: true,
  });
})();"#;

const PERMISSIONS: &str = r#"(() => {
  const query = window.navigator.permissions && window.navigator.permissions.query;
  if (!query) return;
  window.navigator.permissions.query = (parameters) =>
    parameters && parameters.name === 'notifications'
      ? Promise.resolve({ state: Notification.permission, onchange: null })
      : query.call(window.navigator.permissions, parameters);
})();"#;

/// Scripts to register for `profile`, in injection order.
pub fn evasion_scripts(profile: &StealthProfile) -> Vec<String> {
    let evasions = &profile.evasions;
    let mut scripts = Vec::new();
    if evasions.webdriver {
        scripts.push(HIDE_WEBDRIVER.to_string());
    }
    if evasions.chrome_runtime {
        scripts.push(CHROME_RUNTIME.to_string());
    }
    if evasions.plugins {
        scripts.push(PLUGINS.to_string());
    }
    if evasions.languages {
        scripts.push(languages_script(&navigator_languages(profile)));
    }
    if evasions.permissions {
        scripts.push(PERMISSIONS.to_string());
    }
    scripts
}

/// `navigator.languages` derived from the profile locale, e.g. `en-US` becomes `["en-US", "en"]`.
pub fn navigator_languages(profile: &StealthProfile) -> Vec<String> {
    let locale = profile
        .locale
        .as_deref()
        .map(str::trim)
        .filter(|locale| !locale.is_empty())
        .unwrap_or("en-US");
    let mut languages = vec![locale.to_string()];
    if let Some((base, _)) = locale.split_once('-') {
        if !base.is_empty() {
            languages.push(base.to_string());
        }
    }
    languages
}

fn languages_script(languages: &[String]) -> String {
    let literal = serde_json::to_string(languages).unwrap_or_else(|_| "[\"en-US\"]".into());
    format!(
        "(() => {{ const langs = {literal}; Object.defineProperty(Navigator.prototype, 'languages', {{ get: () => langs.slice(), configurable: true }}); }})();"
    )
}
