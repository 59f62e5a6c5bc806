//! Value sources: small externally-updated text cells addressed by key.

mod http;
mod memory;

pub use http::HttpValueSource;
pub use memory::MemoryValueSource;

use crate::error::Result;
use async_trait::async_trait;

/// Reads the current text of a named value.
///
/// Implementations return the whole value verbatim. Any error is a transient
/// read failure from the caller's point of view.
#[async_trait]
pub trait ValueSource: Send + Sync {
    async fn read(&self, key: &str) -> Result<String>;
}
