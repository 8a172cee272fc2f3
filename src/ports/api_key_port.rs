//! API key lookup port trait.

use crate::domain::error::FlatlandError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyRecord {
    pub key: String,
    pub role: String,
    pub description: String,
}

pub trait ApiKeyPort {
    fn lookup(&self, key: &str) -> Result<Option<ApiKeyRecord>, FlatlandError>;
}

/// Fixed set of keys, typically the single key from `[auth] api_key`.
pub struct StaticApiKeys {
    keys: Vec<ApiKeyRecord>,
}

impl StaticApiKeys {
    pub fn new(keys: Vec<ApiKeyRecord>) -> Self {
        Self { keys }
    }

    pub fn single_free(key: impl Into<String>) -> Self {
        Self::new(vec![ApiKeyRecord {
            key: key.into(),
            role: "free".to_string(),
            description: "Default free access key".to_string(),
        }])
    }
}

impl ApiKeyPort for StaticApiKeys {
    fn lookup(&self, key: &str) -> Result<Option<ApiKeyRecord>, FlatlandError> {
        Ok(self.keys.iter().find(|k| k.key == key).cloned())
    }
}
