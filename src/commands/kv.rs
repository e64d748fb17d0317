use crate::cli::KvAction;
use crate::config::{Config, ProfileOverrides};
use crate::kv::{ApiKvNamespace, KvNamespace};
use crate::{api::ApiClient, ui};
use anyhow::{bail, Context, Result};
use std::io::{self, Write};

pub fn execute(config: &Config, overrides: &ProfileOverrides, action: KvAction) -> Result<()> {
    let credentials = config.resolve_profile(overrides, None)?;
    let client = ApiClient::new(&credentials.api_token)?;

    match action {
        KvAction::Get { namespace, key } => {
            let namespace = ApiKvNamespace::new(client, credentials.account_id, namespace);
            match namespace.get(&key)? {
                Some(value) => {
                    io::stdout()
                        .write_all(&value)
                        .context("Failed to write value to stdout")?;
                    Ok(())
                }
                None => bail!("Key '{key}' not found in namespace"),
            }
        }

        KvAction::GetMeta { namespace, key } => {
            let namespace = ApiKvNamespace::new(client, credentials.account_id, namespace);
            match namespace.get_with_metadata(&key)? {
                Some((value, metadata)) => {
                    ui::status("Value", String::from_utf8_lossy(&value));
                    match metadata {
                        Some(metadata) => ui::status(
                            "Metadata",
                            serde_json::to_string_pretty(&metadata)
                                .context("Failed to render metadata")?,
                        ),
                        None => ui::info("No metadata for key"),
                    }
                    Ok(())
                }
                None => bail!("Key '{key}' not found in namespace"),
            }
        }

        KvAction::Put {
            namespace,
            key,
            value,
        } => {
            let namespace = ApiKvNamespace::new(client, credentials.account_id, namespace);
            namespace.put(&key, value.as_bytes())
        }

        KvAction::Delete { namespace, key } => {
            let namespace = ApiKvNamespace::new(client, credentials.account_id, namespace);
            namespace.delete(&key)
        }
    }
}
