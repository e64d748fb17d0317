use crate::api::{ApiClient, ScriptBinding};
use crate::config::{Binding, BindingContext, Config, ProfileOverrides};
use crate::ui;
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub fn execute(
    config: &Config,
    overrides: &ProfileOverrides,
    script: &str,
    name_override: Option<String>,
) -> Result<()> {
    let credentials = config.resolve_profile(overrides, Some(script))?;

    let (default_name, path, bindings) = match config.scripts.get(script) {
        Some(entry) => (script.to_string(), entry.path.clone(), entry.bindings.clone()),
        None => {
            // Not in config: treat as a path to a worker source file
            ui::warn(format!(
                "Script '{script}' is not declared in config; pushing file directly"
            ));
            let stem = Path::new(script)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| anyhow!("Unable to derive a script name from path '{script}'"))?;
            (stem.to_string(), script.to_string(), BTreeMap::new())
        }
    };
    let script_name = name_override.unwrap_or(default_name);

    let source_path = shellexpand::tilde(&path).into_owned();
    let source = fs::read_to_string(&source_path)
        .with_context(|| format!("Failed to read worker script {source_path:?}"))?;

    let cx = BindingContext::default();
    let mut script_bindings = Vec::with_capacity(bindings.len());
    for (name, binding) in &bindings {
        script_bindings.push(to_script_binding(name, binding, &cx)?);
    }

    let progress = ui::Progress::new(
        "Pushing",
        format!(
            "{script_name} to account {} (profile '{}')",
            credentials.account_id, credentials.profile_name
        ),
    );

    let client = ApiClient::new(&credentials.api_token)?;
    match client.put_script(
        &credentials.account_id,
        &script_name,
        source,
        &script_bindings,
    ) {
        Ok(()) => {
            let detail = if script_bindings.is_empty() {
                None
            } else {
                Some(format!("with {} binding(s)", script_bindings.len()))
            };
            progress.success("Pushed", detail);
            Ok(())
        }
        Err(err) => {
            progress.fail("Failed", &err);
            Err(err)
        }
    }
}

fn to_script_binding(name: &str, binding: &Binding, cx: &BindingContext) -> Result<ScriptBinding> {
    let text = binding.resolve(name, cx)?;
    Ok(match binding {
        Binding::Value(_) => ScriptBinding::PlainText {
            name: name.to_string(),
            text,
        },
        Binding::Secret(_) => ScriptBinding::SecretText {
            name: name.to_string(),
            text,
        },
    })
}
