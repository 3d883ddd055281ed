//! The persisted settings file: `<home>/settings.json`.
//!
//! Created on first run from a channel-specific remote template and never
//! overwritten afterwards — user edits survive every subsequent launch.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

const TEMPLATE_URL_BASE: &str =
    "https://raw.githubusercontent.com/switchboard-hub/switchboard/main/config/defaults";

/// Only the field the launcher itself reads; the hub owns the rest of the
/// document, so unknown keys pass through untouched.
#[derive(Debug, Deserialize)]
struct SettingsDoc {
    #[serde(default)]
    prereleases: bool,
}

pub fn template_url(channel: &str) -> String {
    format!("{TEMPLATE_URL_BASE}/settings-{channel}.json")
}

/// Create the settings file from the channel template if it does not exist.
///
/// Idempotent: an existing file short-circuits before any fetch. A directory
/// squatting on the path (seen after interrupted bind-mount experiments) is
/// removed first.
pub fn ensure_settings_file(path: &Path, channel: &str) -> anyhow::Result<()> {
    ensure_settings_file_with(path, channel, fetch_template)
}

pub(crate) fn ensure_settings_file_with<F>(
    path: &Path,
    channel: &str,
    fetch: F,
) -> anyhow::Result<()>
where
    F: FnOnce(&str) -> anyhow::Result<String>,
{
    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    }
    if path.exists() {
        debug!(path = %path.display(), "settings file present, keeping as-is");
        return Ok(());
    }

    let body = fetch(channel)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, body)?;
    eprintln!(
        "[switchboard] wrote default {} settings to {}",
        channel,
        path.display()
    );
    Ok(())
}

fn fetch_template(channel: &str) -> anyhow::Result<String> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(format!("switchboard-launcher/{}", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(10))
        .build()?;
    let response = client
        .get(template_url(channel))
        .send()?
        .error_for_status()?;
    Ok(response.text()?)
}

/// `Some("prerelease")` iff the document parses and marks prereleases
/// enabled. Missing file, unparseable JSON, and `false` all mean "no
/// preference" — the caller falls back to the default channel.
pub fn read_channel_preference(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let doc: SettingsDoc = serde_json::from_str(&raw).ok()?;
    doc.prereleases.then(|| "prerelease".to_string())
}
