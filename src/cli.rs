use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Edgeflare - deploy and observe edge worker scripts
///
/// edgeflare reads credential profiles from a `.edgeflare` config file
/// discovered by walking parent directories from the working directory,
/// pushes worker scripts to the Cloudflare API, reads remote KV
/// namespaces, and serves a small local web UI for streaming worker
/// logs ("tail").
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (skips discovery)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Name of the profile to use from the config
    #[arg(long, global = true, value_name = "PROFILE")]
    pub profile: Option<String>,

    /// Explicit account id (must be paired with --api-token)
    #[arg(long, global = true, value_name = "ACCOUNT_ID")]
    pub account_id: Option<String>,

    /// Explicit API token (must be paired with --account-id)
    #[arg(long, global = true, value_name = "API_TOKEN")]
    pub api_token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a worker script to the Workers API
    ///
    /// SCRIPT is a script name from the config, or a path to a worker
    /// source file. Bindings declared for the script are resolved and
    /// uploaded alongside it.
    Push {
        /// Script name from config, or path to a worker source file
        #[arg(value_name = "SCRIPT")]
        script: String,

        /// Override the script name used on the API
        #[arg(short, long, value_name = "NAME")]
        name: Option<String>,
    },

    /// Serve the local tail web UI
    ///
    /// Serves the log viewer page on 127.0.0.1 and proxies its API
    /// calls to the Cloudflare API.
    Tail {
        /// Port to bind on 127.0.0.1
        #[arg(short, long, value_name = "PORT", default_value_t = 3030)]
        port: u16,
    },

    /// Remote KV namespace operations
    #[command(subcommand)]
    Kv(KvAction),

    /// List profiles in the resolved config
    Profiles,

    /// Validate the config file
    Check,
}

#[derive(Subcommand, Debug)]
pub enum KvAction {
    /// Read the value for a key, writing it to stdout
    #[command(name = "get")]
    Get {
        /// Namespace identifier
        #[arg(value_name = "NAMESPACE_ID")]
        namespace: String,

        /// Key to read
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Read the value and metadata for a key
    #[command(name = "get-meta")]
    GetMeta {
        /// Namespace identifier
        #[arg(value_name = "NAMESPACE_ID")]
        namespace: String,

        /// Key to read
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Write a value (not supported by the remote adapter)
    #[command(name = "put")]
    Put {
        /// Namespace identifier
        #[arg(value_name = "NAMESPACE_ID")]
        namespace: String,

        /// Key to write
        #[arg(value_name = "KEY")]
        key: String,

        /// Value to store
        #[arg(value_name = "VALUE")]
        value: String,
    },

    /// Delete a key (not supported by the remote adapter)
    #[command(name = "delete")]
    Delete {
        /// Namespace identifier
        #[arg(value_name = "NAMESPACE_ID")]
        namespace: String,

        /// Key to delete
        #[arg(value_name = "KEY")]
        key: String,
    },
}
