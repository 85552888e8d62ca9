use super::{Db, SnippetStore, StoreError};
use rusqlite::{OptionalExtension, params};

impl SnippetStore for Db {
    fn fetch_code(&self, id: i64) -> Result<Option<String>, StoreError> {
        let sql = format!("SELECT code FROM {} WHERE id = ?", self.snippets_table);
        let code = self
            .conn
            .query_row(&sql, params![id], |row| row.get(0))
            .optional()?;
        Ok(code)
    }

    fn update_code(&self, id: i64, code: &str) -> Result<usize, StoreError> {
        let sql = format!("UPDATE {} SET code = ? WHERE id = ?", self.snippets_table);
        let rows = self.conn.execute(&sql, params![code, id])?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(db: &Db, id: i64, code: &str) {
        db.conn
            .execute(
                "INSERT INTO wp_wpcode_snippets (id, title, code) VALUES (?, 'Chatbot', ?)",
                params![id, code],
            )
            .unwrap();
    }

    #[test]
    fn test_fetch_and_update() {
        let db = Db::open_in_memory("wp_").unwrap();
        seed(&db, 449, "let a = 1;");

        assert_eq!(db.fetch_code(449).unwrap().as_deref(), Some("let a = 1;"));

        let rows = db.update_code(449, "let a = 2;").unwrap();
        assert_eq!(rows, 1);
        assert_eq!(db.fetch_code(449).unwrap().as_deref(), Some("let a = 2;"));
    }

    #[test]
    fn test_fetch_missing() {
        let db = Db::open_in_memory("wp_").unwrap();
        assert!(db.fetch_code(449).unwrap().is_none());
    }

    #[test]
    fn test_update_leaves_other_rows() {
        let db = Db::open_in_memory("wp_").unwrap();
        seed(&db, 1, "one");
        seed(&db, 2, "two");

        db.update_code(2, "TWO").unwrap();
        assert_eq!(db.fetch_code(1).unwrap().as_deref(), Some("one"));
        assert_eq!(db.fetch_code(2).unwrap().as_deref(), Some("TWO"));
    }

    #[test]
    fn test_values_are_bound_not_interpolated() {
        let db = Db::open_in_memory("wp_").unwrap();
        seed(&db, 3, "x");

        let hostile = "'); DROP TABLE wp_wpcode_snippets; --";
        db.update_code(3, hostile).unwrap();
        assert_eq!(db.fetch_code(3).unwrap().as_deref(), Some(hostile));
    }

    #[test]
    fn test_missing_table_reports_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        rusqlite::Connection::open(&path).unwrap();
        let db = Db::open(&path, "wp_").unwrap();
        let err = db.update_code(449, "x").unwrap_err();
        assert!(err.to_string().contains("no such table"), "got: {err}");
    }
}
