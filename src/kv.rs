use anyhow::{bail, Result};
use serde_json::Value;

use crate::api::ApiClient;

/// Abstract key-value namespace operations.
///
/// Mirrors the worker runtime surface: reads return `None` for absent
/// keys, and metadata is an arbitrary JSON value.
pub trait KvNamespace {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn get_with_metadata(&self, key: &str) -> Result<Option<(Vec<u8>, Option<Value>)>>;
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Namespace adapter that forwards reads to the remote API.
///
/// Writes are not forwarded; `put` and `delete` report the unsupported
/// operation instead.
pub struct ApiKvNamespace {
    client: ApiClient,
    account_id: String,
    namespace_id: String,
}

impl ApiKvNamespace {
    pub fn new(
        client: ApiClient,
        account_id: impl Into<String>,
        namespace_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            account_id: account_id.into(),
            namespace_id: namespace_id.into(),
        }
    }
}

impl KvNamespace for ApiKvNamespace {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.client
            .get_kv_value(&self.account_id, &self.namespace_id, key)
    }

    fn get_with_metadata(&self, key: &str) -> Result<Option<(Vec<u8>, Option<Value>)>> {
        let Some(value) = self
            .client
            .get_kv_value(&self.account_id, &self.namespace_id, key)?
        else {
            return Ok(None);
        };

        let metadata = self
            .client
            .get_kv_metadata(&self.account_id, &self.namespace_id, key)?;

        Ok(Some((value, metadata)))
    }

    fn put(&self, key: &str, _value: &[u8]) -> Result<()> {
        bail!("put is not supported by the remote namespace adapter (key '{key}')");
    }

    fn delete(&self, key: &str) -> Result<()> {
        bail!("delete is not supported by the remote namespace adapter (key '{key}')");
    }
}
