pub mod file;
pub mod memory;
pub mod traits;

use crate::{config::Config, error::Result};
use std::sync::Arc;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use traits::KeyValueStorage;

/// Picks the backend described by `config`: in-memory when ephemeral,
/// otherwise files under the resolved data directory.
pub async fn open(config: &Config) -> Result<Arc<dyn KeyValueStorage>> {
    if config.ephemeral {
        log::info!("Using in-memory history storage");
        return Ok(Arc::new(MemoryStorage::new()));
    }
    let dir = config.resolve_data_dir()?;
    Ok(Arc::new(FileStorage::new(dir).await?))
}
