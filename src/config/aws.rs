//! Secret indirection through the shared AWS credentials file.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;

/// Read the credential pair for `profile` from `~/.aws/credentials`,
/// joined as `<access_key_id>:<secret_access_key>`.
pub fn read_credential(profile: &str) -> Result<String> {
    let path = credentials_path()?;
    let contents = fs::read_to_string(&path).with_context(|| {
        format!("No aws credentials found for profile '{profile}': unable to read {path:?}")
    })?;

    parse_profile(&contents, profile)
        .ok_or_else(|| anyhow!("No aws credentials found for profile '{profile}' in {path:?}"))
}

fn credentials_path() -> Result<PathBuf> {
    let base = directories::BaseDirs::new().context("Failed to locate home directory")?;
    Ok(base.home_dir().join(".aws").join("credentials"))
}

/// Scan the INI-like credentials file for `[profile]` and return the
/// joined key pair. Returns `None` when the section or either key is
/// missing.
fn parse_profile(contents: &str, profile: &str) -> Option<String> {
    let header = format!("[{profile}]");
    let mut in_section = false;
    let mut access_key_id = None;
    let mut secret_access_key = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_section = line == header;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                "aws_access_key_id" => access_key_id = Some(value.trim().to_string()),
                "aws_secret_access_key" => secret_access_key = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    Some(format!("{}:{}", access_key_id?, secret_access_key?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# shared credentials
[default]
aws_access_key_id = AKIADEFAULT
aws_secret_access_key = s3cr3t/default

[deploy]
aws_access_key_id=AKIADEPLOY
aws_secret_access_key=s3cr3t/deploy
region = us-east-1
";

    #[test]
    fn finds_named_profile() {
        let value = parse_profile(SAMPLE, "deploy").unwrap();
        assert_eq!(value, "AKIADEPLOY:s3cr3t/deploy");
    }

    #[test]
    fn finds_default_profile() {
        let value = parse_profile(SAMPLE, "default").unwrap();
        assert_eq!(value, "AKIADEFAULT:s3cr3t/default");
    }

    #[test]
    fn missing_profile_returns_none() {
        assert!(parse_profile(SAMPLE, "staging").is_none());
    }

    #[test]
    fn section_with_missing_key_returns_none() {
        let contents = "[partial]\naws_access_key_id = AKIA\n";
        assert!(parse_profile(contents, "partial").is_none());
    }

    #[test]
    fn keys_do_not_leak_across_sections() {
        let contents = "\
[first]
aws_access_key_id = AKIAFIRST

[second]
aws_secret_access_key = s3cr3t
";
        assert!(parse_profile(contents, "first").is_none());
        assert!(parse_profile(contents, "second").is_none());
    }
}
