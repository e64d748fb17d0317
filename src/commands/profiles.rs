use crate::config::Config;
use crate::ui;
use anyhow::Result;

pub fn execute(config: &Config) -> Result<()> {
    if config.profiles.is_empty() {
        ui::info("No profiles found. Add one to .edgeflare or set CF_ACCOUNT_ID/CF_API_TOKEN.");
        return Ok(());
    }

    for (name, profile) in &config.profiles {
        let detail = format!("{name} (account {})", profile.account_id);
        if profile.default {
            ui::success("Default", detail);
        } else {
            ui::status("Profile", detail);
        }
    }
    Ok(())
}
