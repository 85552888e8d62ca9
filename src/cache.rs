/// Host cache invalidation.
use crate::db::StoreError;

/// Something that can drop cached copies of host data after a write.
pub trait CacheFlusher {
    /// Flush the cache, returning how many entries were dropped.
    fn flush(&self) -> Result<usize, StoreError>;
}
