use crate::host::DocId;
use thiserror::Error;

/// Errors raised inside the synchronization core.
///
/// None of these cross the public [`Bridge`](crate::Bridge) surface: every operation
/// logs them and skips the pass.
#[derive(Debug, Error)]
pub enum Error {
    /// Proxy documents (widgets, previews) are never bound.
    #[error("document {0} is a proxy view")]
    ProxyDocument(DocId),

    #[error("cannot bind document {doc}: limit of {limit} bindings reached")]
    RegistryFull { doc: DocId, limit: usize },

    #[error("document {0} has no engine buffer")]
    NoBuffer(DocId),

    #[error("key queue for document {doc} is full ({capacity} keys)")]
    KeyQueueFull { doc: DocId, capacity: usize },

    /// The engine call failed; the engine is left as it was.
    #[error("engine call failed: {0:#}")]
    Engine(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
