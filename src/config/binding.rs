use anyhow::{anyhow, Result};
use serde::Deserialize;

use super::aws;

/// Placeholder substituted into text bindings when a local port is in
/// effect (e.g. while the tail UI or a local preview server is running).
pub const LOCAL_PORT_VAR: &str = "${localPort}";

/// Prefix selecting AWS credential indirection for secret bindings.
const AWS_SECRET_PREFIX: &str = "aws:";

/// A named value supplied to a worker script at runtime.
///
/// Serialized form matches the config file: `{ "value": "..." }` for
/// literal text, `{ "secret": "..." }` for secrets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Binding {
    /// Literal text; `${localPort}` is substituted when a port is known.
    Value(String),
    /// Secret literal, or `aws:<profile>` indirection through the
    /// `~/.aws/credentials` file.
    Secret(String),
}

/// Values available for placeholder substitution while resolving
/// bindings for a single command invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindingContext {
    pub local_port: Option<u16>,
}

impl Binding {
    /// Resolve the binding to its final runtime value.
    pub fn resolve(&self, name: &str, cx: &BindingContext) -> Result<String> {
        match self {
            Binding::Value(raw) => substitute(name, raw, cx),
            Binding::Secret(raw) => match raw.strip_prefix(AWS_SECRET_PREFIX) {
                Some(profile) => aws::read_credential(profile),
                None => Ok(raw.clone()),
            },
        }
    }
}

fn substitute(name: &str, raw: &str, cx: &BindingContext) -> Result<String> {
    if !raw.contains(LOCAL_PORT_VAR) {
        return Ok(raw.to_string());
    }

    let port = cx.local_port.ok_or_else(|| {
        anyhow!("Binding '{name}' uses {LOCAL_PORT_VAR} but no local port is in effect")
    })?;

    Ok(raw.replace(LOCAL_PORT_VAR, &port.to_string()))
}
