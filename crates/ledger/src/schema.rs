//! Ledger schema definition and migration.

use rusqlite::Connection;

/// Initialize tables and indexes.
///
/// Safe to call on an existing database: table creation is `IF NOT EXISTS`
/// and the `run_id` columns are added only when missing, so databases written
/// before run scoping existed keep their rows.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            buyer_id TEXT NOT NULL,
            seller_id TEXT NOT NULL,
            asset TEXT NOT NULL,
            price INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            run_id TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_buyer ON transactions(buyer_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_seller ON transactions(seller_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS interactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            agent_id TEXT NOT NULL,
            counterparty_id TEXT,
            action TEXT NOT NULL,
            asset TEXT NOT NULL,
            price INTEGER NOT NULL,
            details TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            run_id TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_interactions_agent ON interactions(agent_id)",
        [],
    )?;

    ensure_run_id_column(conn, "transactions")?;
    ensure_run_id_column(conn, "interactions")?;

    Ok(())
}

/// Add the `run_id` column to a pre-existing table that lacks it.
///
/// Idempotent and non-destructive: probes `PRAGMA table_info` first and only
/// alters when the column is absent. Existing rows keep a NULL run_id.
fn ensure_run_id_column(conn: &Connection, table: &str) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<_>>()?;

    if !columns.iter().any(|c| c == "run_id") {
        conn.execute(&format!("ALTER TABLE {} ADD COLUMN run_id TEXT", table), [])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_creation() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(tables.contains(&"transactions".to_string()));
        assert!(tables.contains(&"interactions".to_string()));
    }

    #[test]
    fn test_schema_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn test_run_id_migration_preserves_rows() {
        let conn = Connection::open_in_memory().unwrap();

        // A database written before run scoping existed
        conn.execute(
            "CREATE TABLE transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                buyer_id TEXT NOT NULL,
                seller_id TEXT NOT NULL,
                asset TEXT NOT NULL,
                price INTEGER NOT NULL,
                timestamp INTEGER NOT NULL
            )",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO transactions (buyer_id, seller_id, asset, price, timestamp)
             VALUES ('b', 's', 'AAPL', 100000, 1)",
            [],
        )
        .unwrap();

        init_schema(&conn).unwrap();

        let (count, run_id): (i64, Option<String>) = conn
            .query_row(
                "SELECT COUNT(*), MAX(run_id) FROM transactions",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(run_id, None);
    }
}
