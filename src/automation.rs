//! Editor state flush.
//!
//! Before a run, asks the annotating application (Skim by default) to save
//! every document with unsaved changes so the annotation files on disk are
//! current. Runs an AppleScript through `osascript`; on systems without it,
//! or when the application is not running, this is a no-op.
//!
//! Best-effort: failures are logged as warnings and never fail the run.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};

use crate::config::AutomationConfig;

/// AppleScript saving every modified document of `application`, if running.
pub fn flush_script(application: &str) -> String {
    let app = application.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        r#"tell application "System Events"
    set isRunning to (exists (process "{app}"))
end tell

if isRunning then
    tell application "{app}"
        repeat with doc in documents
            if modified of doc then
                save doc
            end if
        end repeat
    end tell
end if
"#
    )
}

/// Ask the configured application to save its modified documents.
pub fn flush_editor_state(config: &AutomationConfig) {
    if !config.enabled {
        tracing::debug!("editor automation disabled");
        return;
    }
    match run_osascript(&flush_script(&config.application)) {
        Ok(stdout) if !stdout.trim().is_empty() => {
            tracing::info!(application = %config.application, output = %stdout.trim(), "editor automation");
        }
        Ok(_) => tracing::debug!(application = %config.application, "editor state flushed"),
        Err(e) => tracing::warn!(application = %config.application, "editor automation failed: {:#}", e),
    }
}

fn run_osascript(script: &str) -> Result<String> {
    let mut child = Command::new("osascript")
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| "Failed to execute 'osascript'")?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(script.as_bytes())
            .with_context(|| "Failed to send script to osascript")?;
    }

    let output = child
        .wait_with_output()
        .with_context(|| "Failed to wait for osascript")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("osascript failed: {}", stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
