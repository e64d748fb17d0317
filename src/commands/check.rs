use crate::config::Config;
use crate::ui;
use anyhow::Result;
use std::path::Path;

pub fn execute(config: &Config) -> Result<()> {
    // Structural invariants were checked at load; what remains are the
    // softer issues worth surfacing before a push fails mid-flight.
    let mut issues = Vec::new();

    for (name, script) in &config.scripts {
        let path = shellexpand::tilde(&script.path).into_owned();
        if !Path::new(&path).exists() {
            issues.push(format!("script '{name}': source file {path:?} does not exist"));
        }
    }

    if config.profiles.len() > 1 && !config.profiles.values().any(|p| p.default) {
        issues.push(
            "multiple profiles and none marked default; commands will require --profile"
                .to_string(),
        );
    }

    if issues.is_empty() {
        if config.profiles.is_empty() && config.scripts.is_empty() {
            ui::info("No config found to validate.");
        } else {
            ui::success(
                "Check",
                format!(
                    "Config OK: {} profile(s), {} script(s).",
                    config.profiles.len(),
                    config.scripts.len()
                ),
            );
        }
        Ok(())
    } else {
        for issue in &issues {
            ui::error(issue);
        }
        anyhow::bail!("Config validation failed ({} issue(s)).", issues.len());
    }
}
