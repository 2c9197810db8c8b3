//! Accessibility permission handling on macOS.
//!
//! Reading another application's accessibility tree requires the
//! "Accessibility" privacy permission. The recorder only checks it; asking
//! the user is left to the CLI (`--check-permissions`) or the embedding app.

use std::process::Command;

const ACCESSIBILITY_PANE_URL: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility";

/// Check whether this process holds the accessibility permission, without prompting.
///
/// # Examples
///
/// ```no_run
/// use transcript_recorder::platform::macos::permissions::is_trusted;
///
/// if !is_trusted() {
///     eprintln!("Transcript capture needs the Accessibility permission");
/// }
/// ```
pub fn is_trusted() -> bool {
    macos_accessibility_client::accessibility::application_is_trusted()
}

/// Same as [`is_trusted`], but shows the system prompt when the permission
/// is missing.
///
/// The prompt is asynchronous: this returns `false` right away even if the
/// user grants access a moment later, and the process usually has to be
/// restarted before the grant takes effect.
pub fn is_trusted_with_prompt() -> bool {
    macos_accessibility_client::accessibility::application_is_trusted_with_prompt()
}

/// Open System Settings at Privacy & Security > Accessibility.
pub fn open_accessibility_preferences() -> std::io::Result<()> {
    Command::new("open").arg(ACCESSIBILITY_PANE_URL).spawn()?;
    Ok(())
}

/// Step-by-step instructions for granting the permission by hand.
pub fn get_permission_instructions() -> &'static str {
    r#"
To let the transcript recorder read captions:

1. Open System Settings (System Preferences before macOS Ventura)
2. Go to Privacy & Security > Accessibility
3. Click the lock icon if changes are locked
4. Enable the terminal or application running transcript-recorder
5. If it is not listed, click '+' and add it
6. Restart transcript-recorder

The permission only takes effect for newly started processes.
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // Permission checks
    // ============================================================================

    #[test]
    fn test_is_trusted_does_not_panic() {
        let _ = is_trusted();
    }

    // ============================================================================
    // Instructions
    // ============================================================================

    #[test]
    fn test_instructions_name_the_pane() {
        let instructions = get_permission_instructions();
        assert!(instructions.contains("Privacy & Security"));
        assert!(instructions.contains("Accessibility"));
    }

    #[test]
    fn test_instructions_mention_restart() {
        assert!(get_permission_instructions().to_lowercase().contains("restart"));
    }

    #[test]
    fn test_instructions_have_numbered_steps() {
        let instructions = get_permission_instructions();
        for step in ["1.", "2.", "3."] {
            assert!(instructions.contains(step));
        }
    }

    #[test]
    fn test_preferences_url_targets_accessibility_pane() {
        assert!(ACCESSIBILITY_PANE_URL.starts_with("x-apple.systempreferences:"));
        assert!(ACCESSIBILITY_PANE_URL.ends_with("Privacy_Accessibility"));
    }
}
