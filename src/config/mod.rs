pub mod aws;
pub mod binding;
mod jsonc;

pub use binding::{Binding, BindingContext};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// File name discovered by walking parent directories.
pub const CONFIG_FILE_NAME: &str = ".edgeflare";

/// Profile name synthesized from environment credentials.
const ENV_PROFILE_NAME: &str = "env";
/// Profile name used for explicit --account-id/--api-token pairs.
const OPTIONS_PROFILE_NAME: &str = "options";

const ENV_ACCOUNT_ID: &str = "CF_ACCOUNT_ID";
const ENV_API_TOKEN: &str = "CF_API_TOKEN";

/// Validation and resolution failures, distinguished by message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unable to find profile '{0}' in config")]
    ProfileNotFound(String),

    #[error("Bad profile name '{0}': names start with a lowercase letter and use lowercase letters, digits, '-' or '_'")]
    BadProfileName(String),

    #[error("Bad script name '{0}': names start with a lowercase letter and use lowercase letters, digits, '-' or '_'")]
    BadScriptName(String),

    #[error("Script '{script}' references profile '{profile}' which is not in config")]
    UnknownScriptProfile { script: String, profile: String },

    #[error("Multiple profiles are marked default")]
    MultipleDefaults,

    #[error("Multiple profiles in config and none marked default; pass --profile or mark one default")]
    NoDefaultProfile,

    #[error("No profiles in config and {ENV_ACCOUNT_ID}/{ENV_API_TOKEN} are not set")]
    NoProfiles,

    #[error("--account-id and --api-token must be provided together")]
    IncompleteOverride,
}

/// A credential pair used to authenticate API calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Profile {
    pub account_id: String,
    pub api_token: String,
    #[serde(default)]
    pub default: bool,
}

/// A named worker script declared in the config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Script {
    /// Path to the worker source file; `~` is expanded.
    pub path: String,
    /// Values injected into the script's runtime environment.
    #[serde(default)]
    pub bindings: BTreeMap<String, Binding>,
    /// Profile used when none is selected explicitly.
    pub profile: Option<String>,
}

/// Loaded configuration. Read-only for the duration of a command.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
    #[serde(default)]
    pub scripts: BTreeMap<String, Script>,
}

/// Profile selection supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ProfileOverrides {
    pub profile: Option<String>,
    pub account_id: Option<String>,
    pub api_token: Option<String>,
}

/// Credentials resolved for a single command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub profile_name: String,
    pub account_id: String,
    pub api_token: String,
}

impl Credentials {
    fn of(name: &str, profile: &Profile) -> Self {
        Self {
            profile_name: name.to_string(),
            account_id: profile.account_id.clone(),
            api_token: profile.api_token.clone(),
        }
    }
}

impl Config {
    /// Load the config for this invocation.
    ///
    /// With no explicit path, walks parent directories from the working
    /// directory and uses the nearest `.edgeflare` file. A missing file
    /// is an empty config; an unreadable file (permissions) is treated
    /// as absent with a warning. When the loaded config has no
    /// profiles, `CF_ACCOUNT_ID`/`CF_API_TOKEN` synthesize one.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let cwd = env::current_dir().context("Failed to determine working directory")?;
                discover(&cwd)
            }
        };

        let mut config = match &path {
            Some(path) => match read_config_file(path)? {
                Some(contents) => {
                    debug!("loading config from {:?}", path);
                    serde_json::from_str(&jsonc::strip_comments(&contents))
                        .with_context(|| format!("Failed to parse config file {:?}", path))?
                }
                None => Config::default(),
            },
            None => {
                debug!("no {CONFIG_FILE_NAME} file found, using empty config");
                Config::default()
            }
        };

        config.validate()?;

        if config.profiles.is_empty() {
            if let Some(profile) = env_profile() {
                debug!("synthesizing profile '{ENV_PROFILE_NAME}' from {ENV_ACCOUNT_ID}/{ENV_API_TOKEN}");
                config.profiles.insert(ENV_PROFILE_NAME.to_string(), profile);
            }
        }

        Ok(config)
    }

    /// Check the config invariants: name validity, at most one default
    /// profile, and no dangling script -> profile references.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in self.profiles.keys() {
            if !is_valid_name(name) {
                return Err(ConfigError::BadProfileName(name.clone()));
            }
        }

        for (name, script) in &self.scripts {
            if !is_valid_name(name) {
                return Err(ConfigError::BadScriptName(name.clone()));
            }
            if let Some(profile) = &script.profile {
                if !self.profiles.contains_key(profile) {
                    return Err(ConfigError::UnknownScriptProfile {
                        script: name.clone(),
                        profile: profile.clone(),
                    });
                }
            }
        }

        if self.profiles.values().filter(|p| p.default).count() > 1 {
            return Err(ConfigError::MultipleDefaults);
        }

        Ok(())
    }

    /// Select the credentials for this invocation.
    ///
    /// Precedence, highest first: explicit --account-id/--api-token
    /// pair, --profile by name, the profile declared by `script`, then
    /// the config's single or default profile.
    pub fn resolve_profile(
        &self,
        overrides: &ProfileOverrides,
        script: Option<&str>,
    ) -> Result<Credentials, ConfigError> {
        match (&overrides.account_id, &overrides.api_token) {
            (Some(account_id), Some(api_token)) => {
                return Ok(Credentials {
                    profile_name: OPTIONS_PROFILE_NAME.to_string(),
                    account_id: account_id.clone(),
                    api_token: api_token.clone(),
                });
            }
            (None, None) => {}
            _ => return Err(ConfigError::IncompleteOverride),
        }

        if let Some(name) = &overrides.profile {
            return self.named_profile(name);
        }

        if let Some(script) = script.and_then(|name| self.scripts.get(name)) {
            if let Some(name) = &script.profile {
                return self.named_profile(name);
            }
        }

        if self.profiles.is_empty() {
            return Err(ConfigError::NoProfiles);
        }

        if self.profiles.len() == 1 {
            if let Some((name, profile)) = self.profiles.iter().next() {
                return Ok(Credentials::of(name, profile));
            }
        }

        let mut defaults = self.profiles.iter().filter(|(_, p)| p.default);
        match (defaults.next(), defaults.next()) {
            (Some((name, profile)), None) => Ok(Credentials::of(name, profile)),
            (Some(_), Some(_)) => Err(ConfigError::MultipleDefaults),
            (None, _) => Err(ConfigError::NoDefaultProfile),
        }
    }

    fn named_profile(&self, name: &str) -> Result<Credentials, ConfigError> {
        self.profiles
            .get(name)
            .map(|profile| Credentials::of(name, profile))
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))
    }
}

/// Walk `start` and its ancestors; the nearest config file wins.
fn discover(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

fn read_config_file(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            debug!("Permission denied reading config file {:?}, treating as absent", path);
            Ok(None)
        }
        Err(err) => {
            Err(err).with_context(|| format!("Failed to read config file {:?}", path))
        }
    }
}

fn env_profile() -> Option<Profile> {
    let account_id = env_var(ENV_ACCOUNT_ID)?;
    let api_token = env_var(ENV_API_TOKEN)?;
    Some(Profile {
        account_id,
        api_token,
        default: false,
    })
}

fn env_var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        Ok(_) => None,
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            debug!("ignoring {name}: {err}");
            None
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    static NAME_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = NAME_PATTERN
        .get_or_init(|| Regex::new("^[a-z][a-z0-9_-]{0,36}$").expect("valid name pattern"));
    pattern.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Lock to ensure tests don't interfere with each other's env vars
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn profile(account_id: &str, default: bool) -> Profile {
        Profile {
            account_id: account_id.to_string(),
            api_token: format!("token-{account_id}"),
            default,
        }
    }

    fn config_with_profiles(entries: &[(&str, Profile)]) -> Config {
        let mut config = Config::default();
        for (name, profile) in entries {
            config.profiles.insert(name.to_string(), profile.clone());
        }
        config
    }

    #[test]
    fn parses_full_config_with_comments() {
        let contents = r#"
        {
            // credentials per environment
            "profiles": {
                "staging": { "accountId": "acct-1", "apiToken": "tok-1" },
                "prod": { "accountId": "acct-2", "apiToken": "tok-2", "default": true }
            },
            "scripts": {
                "hello-worker": {
                    "path": "worker/hello.js",
                    "profile": "staging",
                    "bindings": {
                        "origin": { "value": "http://localhost:${localPort}" },
                        "token": { "secret": "aws:deploy" }
                    }
                }
            }
        }
        "#;

        let config: Config = serde_json::from_str(&jsonc::strip_comments(contents)).unwrap();
        config.validate().unwrap();

        assert_eq!(config.profiles.len(), 2);
        assert!(config.profiles["prod"].default);

        let script = &config.scripts["hello-worker"];
        assert_eq!(script.path, "worker/hello.js");
        assert_eq!(script.profile.as_deref(), Some("staging"));
        assert_eq!(script.bindings.len(), 2);
    }

    #[test]
    fn single_profile_without_default_flag_resolves() {
        let config = config_with_profiles(&[("solo", profile("acct-1", false))]);
        let credentials = config
            .resolve_profile(&ProfileOverrides::default(), None)
            .unwrap();
        assert_eq!(credentials.profile_name, "solo");
        assert_eq!(credentials.account_id, "acct-1");
    }

    #[test]
    fn two_profiles_without_default_fails() {
        let config = config_with_profiles(&[
            ("one", profile("acct-1", false)),
            ("two", profile("acct-2", false)),
        ]);
        let error = config
            .resolve_profile(&ProfileOverrides::default(), None)
            .unwrap_err();
        assert_eq!(error, ConfigError::NoDefaultProfile);
    }

    #[test]
    fn default_flag_wins_among_several() {
        let config = config_with_profiles(&[
            ("one", profile("acct-1", false)),
            ("two", profile("acct-2", true)),
        ]);
        let credentials = config
            .resolve_profile(&ProfileOverrides::default(), None)
            .unwrap();
        assert_eq!(credentials.profile_name, "two");
    }

    #[test]
    fn named_profile_overrides_default() {
        let config = config_with_profiles(&[
            ("one", profile("acct-1", false)),
            ("two", profile("acct-2", true)),
        ]);
        let overrides = ProfileOverrides {
            profile: Some("one".to_string()),
            ..Default::default()
        };
        let credentials = config.resolve_profile(&overrides, None).unwrap();
        assert_eq!(credentials.profile_name, "one");
    }

    #[test]
    fn unknown_named_profile_fails() {
        let config = config_with_profiles(&[("one", profile("acct-1", false))]);
        let overrides = ProfileOverrides {
            profile: Some("missing".to_string()),
            ..Default::default()
        };
        let error = config.resolve_profile(&overrides, None).unwrap_err();
        assert_eq!(error, ConfigError::ProfileNotFound("missing".to_string()));
        assert!(error.to_string().contains("Unable to find profile"));
    }

    #[test]
    fn script_declared_profile_is_used() {
        let mut config = config_with_profiles(&[
            ("one", profile("acct-1", true)),
            ("two", profile("acct-2", false)),
        ]);
        config.scripts.insert(
            "worker".to_string(),
            Script {
                path: "worker.js".to_string(),
                bindings: BTreeMap::new(),
                profile: Some("two".to_string()),
            },
        );

        let credentials = config
            .resolve_profile(&ProfileOverrides::default(), Some("worker"))
            .unwrap();
        assert_eq!(credentials.profile_name, "two");
    }

    #[test]
    fn explicit_pair_beats_everything() {
        let config = config_with_profiles(&[("one", profile("acct-1", true))]);
        let overrides = ProfileOverrides {
            profile: Some("one".to_string()),
            account_id: Some("explicit-acct".to_string()),
            api_token: Some("explicit-token".to_string()),
        };
        let credentials = config.resolve_profile(&overrides, None).unwrap();
        assert_eq!(credentials.profile_name, "options");
        assert_eq!(credentials.account_id, "explicit-acct");
    }

    #[test]
    fn lone_account_id_override_fails() {
        let config = Config::default();
        let overrides = ProfileOverrides {
            account_id: Some("acct".to_string()),
            ..Default::default()
        };
        let error = config.resolve_profile(&overrides, None).unwrap_err();
        assert_eq!(error, ConfigError::IncompleteOverride);
    }

    #[test]
    fn empty_config_resolution_fails() {
        let config = Config::default();
        let error = config
            .resolve_profile(&ProfileOverrides::default(), None)
            .unwrap_err();
        assert_eq!(error, ConfigError::NoProfiles);
    }

    #[test]
    fn validate_rejects_bad_profile_name() {
        let config = config_with_profiles(&[("Bad-Name", profile("acct", false))]);
        let error = config.validate().unwrap_err();
        assert_eq!(error, ConfigError::BadProfileName("Bad-Name".to_string()));
        assert!(error.to_string().contains("Bad profile name"));
    }

    #[test]
    fn validate_rejects_multiple_defaults() {
        let config = config_with_profiles(&[
            ("one", profile("acct-1", true)),
            ("two", profile("acct-2", true)),
        ]);
        assert_eq!(config.validate().unwrap_err(), ConfigError::MultipleDefaults);
    }

    #[test]
    fn validate_rejects_dangling_script_profile() {
        let mut config = config_with_profiles(&[("one", profile("acct-1", false))]);
        config.scripts.insert(
            "worker".to_string(),
            Script {
                path: "worker.js".to_string(),
                bindings: BTreeMap::new(),
                profile: Some("missing".to_string()),
            },
        );
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::UnknownScriptProfile {
                script: "worker".to_string(),
                profile: "missing".to_string(),
            }
        );
    }

    #[test]
    fn name_pattern() {
        assert!(is_valid_name("prod"));
        assert!(is_valid_name("prod-1"));
        assert!(is_valid_name("my_profile"));
        assert!(is_valid_name("a"));
        assert!(!is_valid_name("Prod"));
        assert!(!is_valid_name("1a"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("-leading"));
        assert!(!is_valid_name(&"a".repeat(40)));
    }

    #[test]
    fn discover_finds_nearest_config() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let nested = root.join("projects").join("worker");
        fs::create_dir_all(&nested).unwrap();

        fs::write(root.join(CONFIG_FILE_NAME), "{}").unwrap();
        assert_eq!(
            discover(&nested),
            Some(root.join(CONFIG_FILE_NAME)),
            "walks up to the root config"
        );

        let mid = root.join("projects");
        fs::write(mid.join(CONFIG_FILE_NAME), "{}").unwrap();
        assert_eq!(
            discover(&nested),
            Some(mid.join(CONFIG_FILE_NAME)),
            "nearest config wins"
        );
    }

    #[test]
    fn discover_returns_none_without_config() {
        let temp = TempDir::new().unwrap();
        assert_eq!(discover(temp.path()), None);
    }

    #[test]
    fn load_explicit_path_parses_jsonc() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.jsonc");
        fs::write(
            &path,
            r#"{
                // one profile
                "profiles": { "solo": { "accountId": "a", "apiToken": "t" } }
            }"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.profiles.len(), 1);
    }

    #[test]
    fn load_explicit_missing_path_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nope");
        let error = Config::load(Some(&path)).unwrap_err();
        assert!(format!("{error:#}").contains("Failed to read config file"));
    }

    #[test]
    fn env_credentials_synthesize_profile_when_config_empty() {
        let _lock = TEST_LOCK.lock().unwrap();
        std::env::set_var(ENV_ACCOUNT_ID, "env-acct");
        std::env::set_var(ENV_API_TOKEN, "env-token");

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.jsonc");
        fs::write(&path, "{}").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        let credentials = config
            .resolve_profile(&ProfileOverrides::default(), None)
            .unwrap();
        assert_eq!(credentials.profile_name, ENV_PROFILE_NAME);
        assert_eq!(credentials.account_id, "env-acct");

        std::env::remove_var(ENV_ACCOUNT_ID);
        std::env::remove_var(ENV_API_TOKEN);
    }

    #[test]
    fn env_credentials_ignored_when_profiles_exist() {
        let _lock = TEST_LOCK.lock().unwrap();
        std::env::set_var(ENV_ACCOUNT_ID, "env-acct");
        std::env::set_var(ENV_API_TOKEN, "env-token");

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.jsonc");
        fs::write(
            &path,
            r#"{ "profiles": { "solo": { "accountId": "file-acct", "apiToken": "t" } } }"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.profiles.len(), 1);
        let credentials = config
            .resolve_profile(&ProfileOverrides::default(), None)
            .unwrap();
        assert_eq!(credentials.account_id, "file-acct");

        std::env::remove_var(ENV_ACCOUNT_ID);
        std::env::remove_var(ENV_API_TOKEN);
    }
}
