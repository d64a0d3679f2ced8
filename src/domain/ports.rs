use super::gateway::{EndpointKind, FormFields, TransactionMode};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Per-caller key/value storage that survives between the registration call
/// and the issuer callback. Implementations must isolate session ids from one
/// another; the core performs no locking of its own.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>>;
    async fn set(&self, session_id: &str, key: &str, value: String) -> Result<()>;
    async fn delete(&self, session_id: &str, key: &str) -> Result<()>;
}

/// One form-encoded POST to the gateway, returning the raw response body.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn send(
        &self,
        endpoint: EndpointKind,
        mode: TransactionMode,
        fields: &FormFields,
    ) -> Result<String>;
}

/// Column name to value, ready for a persistence collaborator.
pub type TransactionLogEntry = BTreeMap<String, String>;

#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn record(&self, entry: TransactionLogEntry) -> Result<()>;
}

pub type SessionStoreBox = Box<dyn SessionStore>;
pub type GatewayTransportBox = Box<dyn GatewayTransport>;
pub type TransactionLogBox = Box<dyn TransactionLog>;
