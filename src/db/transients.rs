//! WordPress transient cache, stored as `_transient_*` rows in the options table.
use super::{Db, StoreError};
use crate::cache::CacheFlusher;

impl Db {
    /// Delete every transient (and its timeout row) from the options table.
    pub fn flush_transients(&self) -> Result<usize, StoreError> {
        let sql = format!(
            r"DELETE FROM {} WHERE option_name LIKE '\_transient\_%' ESCAPE '\'
               OR option_name LIKE '\_site\_transient\_%' ESCAPE '\'",
            self.options_table
        );
        let rows = self.conn.execute(&sql, [])?;
        Ok(rows)
    }
}

impl CacheFlusher for Db {
    fn flush(&self) -> Result<usize, StoreError> {
        self.flush_transients()
    }
}
