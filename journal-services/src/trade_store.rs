//! Trade Store
//!
//! SQLite-based storage for ingested trades. The composite primary key
//! (broker, account_id, order_id, creation_timestamp) is the dedup key: the
//! uniqueness constraint is the linearization point for concurrent persist
//! calls, so inserts use `INSERT OR IGNORE` and a conflict counts as a skip
//! rather than an error. Rows are never updated, only inserted and cleared.

use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use journal_core::{JournalError, JournalResult, Trade, TradeSide};

/// Outcome of a batched persist
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Trades actually written by this batch, in input order. The caller
    /// publishes these after the transaction has committed.
    pub inserted: Vec<Trade>,
    /// Records that collided with an existing row
    pub skipped: usize,
}

/// Trade storage service using SQLite
pub struct TradeStore {
    conn: Mutex<Connection>,
}

impl TradeStore {
    /// Create a new TradeStore instance
    ///
    /// Creates the database file and tables if they don't exist.
    pub fn new<P: AsRef<Path>>(db_path: P) -> JournalResult<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                JournalError::persist(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| JournalError::persist(format!("Failed to open database: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Create an in-memory TradeStore (useful for testing)
    pub fn new_in_memory() -> JournalResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| JournalError::persist(format!("Failed to open database: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> JournalResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                broker TEXT NOT NULL,
                account_id INTEGER NOT NULL,
                contract_id TEXT NOT NULL,
                creation_timestamp TEXT NOT NULL,
                price TEXT NOT NULL,
                profit_and_loss TEXT NOT NULL,
                fees TEXT NOT NULL,
                side TEXT NOT NULL,
                size TEXT NOT NULL,
                order_id INTEGER NOT NULL,
                PRIMARY KEY (broker, account_id, order_id, creation_timestamp)
            );

            CREATE INDEX IF NOT EXISTS idx_trades_timestamp
            ON trades(creation_timestamp);
            "#,
        )
        .map_err(|e| JournalError::persist(format!("Failed to create schema: {}", e)))?;

        Ok(())
    }

    fn lock(&self) -> JournalResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| JournalError::persist("Storage lock poisoned"))
    }

    /// Persist a single trade, returning whether a row was written
    ///
    /// A primary-key collision is not an error: the insert is ignored and
    /// `Ok(false)` is returned.
    pub fn persist(&self, trade: &Trade) -> JournalResult<bool> {
        let conn = self.lock()?;
        let changed = Self::insert_one(&conn, trade)?;
        Ok(changed)
    }

    /// Persist a batch of trades inside one transaction
    ///
    /// Records are applied in input order. Duplicates are counted as
    /// skipped; any other insert failure rolls the entire batch back and
    /// surfaces as a persist error, so partial batches are never committed.
    pub fn persist_batch(&self, trades: &[Trade]) -> JournalResult<BatchOutcome> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| JournalError::persist(format!("Failed to begin transaction: {}", e)))?;

        let mut outcome = BatchOutcome::default();
        for trade in trades {
            if Self::insert_one(&tx, trade)? {
                outcome.inserted.push(trade.clone());
            } else {
                outcome.skipped += 1;
            }
        }

        tx.commit()
            .map_err(|e| JournalError::persist(format!("Failed to commit batch: {}", e)))?;

        Ok(outcome)
    }

    fn insert_one(conn: &Connection, trade: &Trade) -> JournalResult<bool> {
        let changed = conn
            .execute(
                r#"
                INSERT OR IGNORE INTO trades
                    (broker, account_id, contract_id, creation_timestamp,
                     price, profit_and_loss, fees, side, size, order_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    trade.broker,
                    trade.account_id,
                    trade.contract_id,
                    trade.timestamp_key(),
                    trade.price.to_string(),
                    trade.profit_and_loss.to_string(),
                    trade.fees.to_string(),
                    trade.side.to_string(),
                    trade.size.to_string(),
                    trade.order_id,
                ],
            )
            .map_err(|e| JournalError::persist(format!("Failed to insert trade: {}", e)))?;

        Ok(changed == 1)
    }

    /// All stored trades, newest first
    pub fn list_all(&self) -> JournalResult<Vec<Trade>> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT broker, account_id, contract_id, creation_timestamp,
                       price, profit_and_loss, fees, side, size, order_id
                FROM trades
                ORDER BY creation_timestamp DESC
                "#,
            )
            .map_err(|e| JournalError::persist(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], Self::row_to_trade)
            .map_err(|e| JournalError::persist(format!("Failed to query trades: {}", e)))?;

        let mut trades = Vec::new();
        for row in rows {
            trades
                .push(row.map_err(|e| JournalError::persist(format!("Failed to read row: {}", e)))?);
        }

        Ok(trades)
    }

    /// Delete every row, returning how many were removed
    ///
    /// Invoked at process startup (backfill re-derives the current month)
    /// and by the administrative clear operation.
    pub fn clear_all(&self) -> JournalResult<usize> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM trades", [])
            .map_err(|e| JournalError::persist(format!("Failed to clear trades: {}", e)))
    }

    /// Number of stored rows
    pub fn count(&self) -> JournalResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM trades", [], |row| row.get(0))
            .map_err(|e| JournalError::persist(format!("Failed to count trades: {}", e)))?;
        Ok(count as usize)
    }

    fn row_to_trade(row: &rusqlite::Row<'_>) -> rusqlite::Result<Trade> {
        let timestamp: String = row.get(3)?;
        let price: String = row.get(4)?;
        let profit_and_loss: String = row.get(5)?;
        let fees: String = row.get(6)?;
        let side: String = row.get(7)?;
        let size: String = row.get(8)?;

        Ok(Trade {
            broker: row.get(0)?,
            account_id: row.get(1)?,
            contract_id: row.get(2)?,
            creation_timestamp: parse_timestamp(3, &timestamp)?,
            price: parse_decimal(4, &price)?,
            profit_and_loss: parse_decimal(5, &profit_and_loss)?,
            fees: parse_decimal(6, &fees)?,
            side: parse_side(7, &side)?,
            size: parse_decimal(8, &size)?,
            order_id: row.get(9)?,
        })
    }

    /// Execute arbitrary SQL against the underlying connection
    #[cfg(test)]
    pub(crate) fn run_sql(&self, sql: &str) -> JournalResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| JournalError::persist(e.to_string()))
    }
}

// Rows are only ever written canonically, so a parse failure here means the
// database was modified from outside. It surfaces as a row-read error rather
// than fabricating a value.
fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_failure(idx, e))
}

fn parse_decimal(idx: usize, raw: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| conversion_failure(idx, e))
}

fn parse_side(idx: usize, raw: &str) -> rusqlite::Result<TradeSide> {
    raw.parse().map_err(|e: String| conversion_failure(idx, e))
}

fn conversion_failure(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, err.into())
}

impl std::fmt::Debug for TradeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn test_trade(order_id: i64, second: u32) -> Trade {
        Trade {
            broker: "projectx".to_string(),
            account_id: 77,
            contract_id: "CON.F.US.ENQ.H25".to_string(),
            creation_timestamp: Utc.with_ymd_and_hms(2025, 3, 4, 15, 30, second).unwrap(),
            price: dec!(18250.25),
            profit_and_loss: dec!(12.5),
            fees: dec!(5.00),
            side: TradeSide::Buy,
            size: dec!(1),
            order_id,
        }
    }

    #[test]
    fn test_persist_and_list_round_trip() {
        let store = TradeStore::new_in_memory().unwrap();

        let trade = test_trade(1, 0);
        assert!(store.persist(&trade).unwrap());

        let trades = store.list_all().unwrap();
        assert_eq!(trades, vec![trade]);
    }

    #[test]
    fn test_duplicate_key_is_skipped() {
        let store = TradeStore::new_in_memory().unwrap();

        let trade = test_trade(1, 0);
        assert!(store.persist(&trade).unwrap());
        assert!(!store.persist(&trade).unwrap());

        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_list_is_newest_first() {
        let store = TradeStore::new_in_memory().unwrap();

        store.persist(&test_trade(1, 10)).unwrap();
        store.persist(&test_trade(2, 30)).unwrap();
        store.persist(&test_trade(3, 20)).unwrap();

        let order_ids: Vec<i64> = store
            .list_all()
            .unwrap()
            .iter()
            .map(|t| t.order_id)
            .collect();
        assert_eq!(order_ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_batch_counts_inserted_and_skipped() {
        let store = TradeStore::new_in_memory().unwrap();
        store.persist(&test_trade(1, 0)).unwrap();

        let outcome = store
            .persist_batch(&[test_trade(1, 0), test_trade(2, 1), test_trade(3, 2)])
            .unwrap();

        assert_eq!(outcome.skipped, 1);
        let inserted_ids: Vec<i64> = outcome.inserted.iter().map(|t| t.order_id).collect();
        assert_eq!(inserted_ids, vec![2, 3]);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_batch_rolls_back_on_storage_failure() {
        let store = TradeStore::new_in_memory().unwrap();

        // Reject one specific order id mid-batch.
        store
            .run_sql(
                r#"
                CREATE TRIGGER reject_999 BEFORE INSERT ON trades
                WHEN NEW.order_id = 999
                BEGIN
                    SELECT RAISE(ABORT, 'injected failure');
                END;
                "#,
            )
            .unwrap();

        let result = store.persist_batch(&[test_trade(1, 0), test_trade(999, 1)]);
        assert!(matches!(result, Err(JournalError::Persist(_))));

        // The earlier insert in the same batch must not survive.
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_clear_all_empties_the_table() {
        let store = TradeStore::new_in_memory().unwrap();
        store.persist(&test_trade(1, 0)).unwrap();
        store.persist(&test_trade(2, 1)).unwrap();

        assert_eq!(store.clear_all().unwrap(), 2);
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_decimals_survive_storage_exactly() {
        let store = TradeStore::new_in_memory().unwrap();

        let mut trade = test_trade(1, 0);
        trade.price = dec!(0.1);
        trade.fees = dec!(5.00);
        store.persist(&trade).unwrap();

        let stored = &store.list_all().unwrap()[0];
        assert_eq!(stored.price, dec!(0.1));
        assert_eq!(stored.fees, dec!(5.00));
    }

    #[test]
    fn test_corrupt_row_surfaces_a_persist_error() {
        let store = TradeStore::new_in_memory().unwrap();
        store.persist(&test_trade(1, 0)).unwrap();

        store.run_sql("UPDATE trades SET price = 'not-a-number'").unwrap();
        assert!(matches!(store.list_all(), Err(JournalError::Persist(_))));

        store
            .run_sql("UPDATE trades SET price = '1', creation_timestamp = 'yesterday'")
            .unwrap();
        assert!(matches!(store.list_all(), Err(JournalError::Persist(_))));
    }
}
