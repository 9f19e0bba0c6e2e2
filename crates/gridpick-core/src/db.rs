// SQLite persistence layer for draft instances, picks, rosters and the
// driver catalog.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::draft::instance::{DraftInstance, DraftStatus};
use crate::draft::pick::{DraftPick, RosterRecord};
use crate::error::DraftError;
use crate::store::{DraftStore, DraftView, LockedDraft};

/// SQLite-backed implementation of [`DraftStore`], plus the key-value meta
/// store that tracks the current race week.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS draft_instances (
                period            INTEGER PRIMARY KEY,
                participant_order TEXT NOT NULL,
                current_round     INTEGER NOT NULL,
                current_index     INTEGER NOT NULL,
                rounds_total      INTEGER NOT NULL,
                status            TEXT NOT NULL,
                created_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS draft_picks (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                period      INTEGER NOT NULL REFERENCES draft_instances(period),
                round       INTEGER NOT NULL,
                participant TEXT NOT NULL,
                item        TEXT NOT NULL,
                picked_at   TEXT NOT NULL,
                UNIQUE(period, item),
                UNIQUE(period, participant, round)
            );

            CREATE TABLE IF NOT EXISTS roster_records (
                participant TEXT NOT NULL,
                period      INTEGER NOT NULL,
                items       TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (participant, period)
            );

            CREATE TABLE IF NOT EXISTS catalog_items (
                name     TEXT PRIMARY KEY,
                custom   INTEGER NOT NULL DEFAULT 0,
                added_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS draft_meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection. A poisoned mutex is reported as a
    /// storage failure rather than a panic.
    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    // ------------------------------------------------------------------
    // Key-value meta store
    // ------------------------------------------------------------------

    /// Persist an arbitrary JSON value under `key`. Uses INSERT OR REPLACE so
    /// repeated saves overwrite the previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn()?;
        let json_str =
            serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO draft_meta (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`. Returns `None` if the key
    /// does not exist.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn()?;
        load_state_in(&conn, key)
    }

    /// Key under which the current race week is stored.
    const CURRENT_PERIOD_KEY: &'static str = "current_period";

    /// The race week new commands default to. Starts at 1.
    pub fn current_period(&self) -> Result<u32> {
        period_from_state(self.load_state(Self::CURRENT_PERIOD_KEY)?)
    }

    pub fn set_current_period(&self, period: u32) -> Result<()> {
        self.save_state(Self::CURRENT_PERIOD_KEY, &serde_json::json!(period))?;
        info!("Current week set to {}", period);
        Ok(())
    }

    /// Move the current race week forward by one and return the new week.
    pub fn advance_period(&self) -> Result<u32> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin advance_period transaction")?;
        let next = period_from_state(load_state_in(&tx, Self::CURRENT_PERIOD_KEY)?)?
            .checked_add(1)
            .context("current week overflowed")?;
        tx.execute(
            "INSERT OR REPLACE INTO draft_meta (key, value) VALUES (?1, ?2)",
            params![Self::CURRENT_PERIOD_KEY, next.to_string()],
        )
        .context("failed to save current week")?;
        tx.commit().context("failed to commit advance_period")?;
        info!("Advanced to week {}", next);
        Ok(next)
    }

    // ------------------------------------------------------------------
    // Catalog import
    // ------------------------------------------------------------------

    /// Add every name in `names` to the catalog in one transaction. Names
    /// already present are left untouched. Returns how many were new.
    pub fn import_catalog(&self, names: &[String]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .context("failed to begin catalog import transaction")?;
        let mut added = 0;
        {
            let mut stmt = tx
                .prepare("INSERT OR IGNORE INTO catalog_items (name, custom) VALUES (?1, 0)")
                .context("failed to prepare catalog insert")?;
            for name in names {
                added += stmt
                    .execute(params![name])
                    .with_context(|| format!("failed to import driver {name}"))?;
            }
        }
        tx.commit().context("failed to commit catalog import")?;
        debug!("Imported {} of {} catalog drivers", added, names.len());
        Ok(added)
    }
}

// ----------------------------------------------------------------------
// Row helpers shared by plain connections and transactions
// ----------------------------------------------------------------------

fn load_state_in(conn: &Connection, key: &str) -> Result<Option<serde_json::Value>> {
    let json_str: Option<String> = conn
        .query_row(
            "SELECT value FROM draft_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .context("failed to query draft meta")?;

    json_str
        .map(|s| serde_json::from_str(&s).context("failed to deserialize state value"))
        .transpose()
}

/// Interpret a stored current-week value; an absent key means week 1.
fn period_from_state(stored: Option<serde_json::Value>) -> Result<u32> {
    match stored {
        Some(value) => {
            let period = value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .with_context(|| format!("stored current week is not a week number: {value}"))?;
            Ok(period)
        }
        None => Ok(1),
    }
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn read_instance(conn: &Connection, period: u32) -> Result<Option<DraftInstance>> {
    conn.query_row(
        "SELECT period, participant_order, current_round, current_index, rounds_total, status
         FROM draft_instances WHERE period = ?1",
        params![period],
        |row| {
            let order_json: String = row.get(1)?;
            let order: Vec<String> =
                serde_json::from_str(&order_json).map_err(|e| conversion_error(1, e))?;
            let status_str: String = row.get(5)?;
            let status = DraftStatus::from_str_status(&status_str)
                .ok_or_else(|| conversion_error(5, format!("unknown draft status {status_str}")))?;
            let current_index: i64 = row.get(3)?;
            Ok(DraftInstance {
                period: row.get(0)?,
                order,
                current_round: row.get(2)?,
                current_index: current_index as usize,
                rounds_total: row.get(4)?,
                status,
            })
        },
    )
    .optional()
    .with_context(|| format!("failed to load draft instance for week {period}"))
}

fn read_picks(conn: &Connection, period: u32, participant: Option<&str>) -> Result<Vec<DraftPick>> {
    let mut stmt = conn
        .prepare(
            "SELECT seq, period, round, participant, item, picked_at
             FROM draft_picks
             WHERE period = ?1 AND (?2 IS NULL OR participant = ?2)
             ORDER BY seq",
        )
        .context("failed to prepare list_picks query")?;

    let picks = stmt
        .query_map(params![period, participant], |row| {
            let stamp: String = row.get(5)?;
            let picked_at = DateTime::parse_from_rfc3339(&stamp)
                .map_err(|e| conversion_error(5, e))?
                .with_timezone(&Utc);
            Ok(DraftPick {
                seq: row.get(0)?,
                period: row.get(1)?,
                round: row.get(2)?,
                participant: row.get(3)?,
                item: row.get(4)?,
                picked_at,
            })
        })
        .context("failed to query draft picks")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map draft pick rows")?;

    Ok(picks)
}

fn read_catalog(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM catalog_items ORDER BY name")
        .context("failed to prepare catalog query")?;
    let names = stmt
        .query_map([], |row| row.get(0))
        .context("failed to query catalog")?
        .collect::<std::result::Result<Vec<String>, _>>()
        .context("failed to map catalog rows")?;
    Ok(names)
}

fn read_rosters(
    conn: &Connection,
    period: u32,
    participant: Option<&str>,
) -> Result<Vec<RosterRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT participant, period, items FROM roster_records
             WHERE period = ?1 AND (?2 IS NULL OR participant = ?2)
             ORDER BY participant",
        )
        .context("failed to prepare roster query")?;

    let rosters = stmt
        .query_map(params![period, participant], |row| {
            let items_json: String = row.get(2)?;
            let items: Vec<String> =
                serde_json::from_str(&items_json).map_err(|e| conversion_error(2, e))?;
            Ok(RosterRecord {
                participant: row.get(0)?,
                period: row.get(1)?,
                items,
            })
        })
        .context("failed to query roster records")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map roster rows")?;

    Ok(rosters)
}

fn write_position(conn: &Connection, instance: &DraftInstance) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE draft_instances
             SET current_round = ?2, current_index = ?3, status = ?4
             WHERE period = ?1",
            params![
                instance.period,
                instance.current_round,
                instance.current_index as i64,
                instance.status.as_str(),
            ],
        )
        .context("failed to save draft position")?;
    if updated != 1 {
        return Err(anyhow!(
            "draft instance for week {} disappeared during update",
            instance.period
        ));
    }
    Ok(())
}

// ----------------------------------------------------------------------
// Exclusive per-week view
// ----------------------------------------------------------------------

/// A draft week held under an IMMEDIATE transaction. Dropping it without
/// committing rolls every write back.
struct SqliteLockedDraft<'conn> {
    tx: Transaction<'conn>,
    instance: DraftInstance,
}

impl LockedDraft for SqliteLockedDraft<'_> {
    fn instance(&self) -> &DraftInstance {
        &self.instance
    }

    fn picks(&self) -> Result<Vec<DraftPick>> {
        read_picks(&self.tx, self.instance.period, None)
    }

    fn catalog(&self) -> Result<Vec<String>> {
        read_catalog(&self.tx)
    }

    fn append_pick(&mut self, round: u32, participant: &str, item: &str) -> Result<DraftPick> {
        let picked_at = Utc::now().trunc_subsecs(6);
        let stamp = picked_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        let period = self.instance.period;

        let seq: i64 = self
            .tx
            .query_row(
                "INSERT INTO draft_picks (period, round, participant, item, picked_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING seq",
                params![period, round, participant, item, stamp],
                |row| row.get(0),
            )
            .context("failed to append draft pick")?;

        Ok(DraftPick {
            seq,
            period,
            round,
            participant: participant.to_string(),
            item: item.to_string(),
            picked_at,
        })
    }

    fn save_instance(&mut self, instance: &DraftInstance) -> Result<()> {
        write_position(&self.tx, instance)?;
        self.instance = instance.clone();
        Ok(())
    }
}

// ----------------------------------------------------------------------
// DraftStore
// ----------------------------------------------------------------------

impl DraftStore for Database {
    fn load_instance(&self, period: u32) -> Result<Option<DraftInstance>> {
        let conn = self.conn()?;
        read_instance(&conn, period)
    }

    /// Replaces the week's instance and discards its picks and rosters in a
    /// single transaction.
    fn create_instance(&self, instance: &DraftInstance) -> Result<()> {
        let order_json =
            serde_json::to_string(&instance.order).context("failed to serialize draft order")?;

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin create_instance transaction")?;

        let discarded = tx
            .execute(
                "DELETE FROM draft_picks WHERE period = ?1",
                params![instance.period],
            )
            .context("failed to discard previous picks")?;
        tx.execute(
            "DELETE FROM roster_records WHERE period = ?1",
            params![instance.period],
        )
        .context("failed to discard previous rosters")?;
        tx.execute(
            "DELETE FROM draft_instances WHERE period = ?1",
            params![instance.period],
        )
        .context("failed to discard previous draft instance")?;

        tx.execute(
            "INSERT INTO draft_instances
                (period, participant_order, current_round, current_index, rounds_total, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                instance.period,
                order_json,
                instance.current_round,
                instance.current_index as i64,
                instance.rounds_total,
                instance.status.as_str(),
            ],
        )
        .context("failed to insert draft instance")?;

        tx.commit().context("failed to commit create_instance")?;

        if discarded > 0 {
            info!(
                "Reset week {}: discarded {} previous picks",
                instance.period, discarded
            );
        }
        Ok(())
    }

    fn with_exclusive_instance_lock<T, F>(&self, period: u32, f: F) -> Result<T, DraftError>
    where
        F: FnOnce(&mut dyn LockedDraft) -> Result<T, DraftError>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin draft transaction")?;

        let instance =
            read_instance(&tx, period)?.ok_or(DraftError::DraftNotFound { period })?;
        let mut locked = SqliteLockedDraft { tx, instance };

        let value = f(&mut locked)?;

        locked
            .tx
            .commit()
            .context("failed to commit draft transaction")?;
        Ok(value)
    }

    fn read_snapshot(&self, period: u32) -> Result<Option<DraftView>> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .context("failed to begin snapshot transaction")?;

        let view = match read_instance(&tx, period)? {
            Some(instance) => {
                let picks = read_picks(&tx, period, None)?;
                let catalog = read_catalog(&tx)?;
                Some(DraftView {
                    instance,
                    picks,
                    catalog,
                })
            }
            None => None,
        };

        tx.commit().context("failed to finish snapshot transaction")?;
        Ok(view)
    }

    fn list_picks(&self, period: u32) -> Result<Vec<DraftPick>> {
        let conn = self.conn()?;
        read_picks(&conn, period, None)
    }

    fn list_picks_for(&self, period: u32, participant: &str) -> Result<Vec<DraftPick>> {
        let conn = self.conn()?;
        read_picks(&conn, period, Some(participant))
    }

    /// The catalog is shared by every week; `period` does not narrow it.
    fn item_catalog(&self, _period: u32) -> Result<Vec<String>> {
        let conn = self.conn()?;
        read_catalog(&conn)
    }

    fn register_item(&self, name: &str, custom: bool) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO catalog_items (name, custom) VALUES (?1, ?2)",
                params![name, custom],
            )
            .with_context(|| format!("failed to register driver {name}"))?;
        Ok(inserted == 1)
    }

    fn upsert_roster_record(&self, record: &RosterRecord) -> Result<bool> {
        let items_json =
            serde_json::to_string(&record.items).context("failed to serialize roster items")?;
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO roster_records (participant, period, items)
                 VALUES (?1, ?2, ?3)",
                params![record.participant, record.period, items_json],
            )
            .context("failed to write roster record")?;
        Ok(inserted == 1)
    }

    fn roster_record(&self, participant: &str, period: u32) -> Result<Option<RosterRecord>> {
        let conn = self.conn()?;
        Ok(read_rosters(&conn, period, Some(participant))?.pop())
    }

    fn roster_records(&self, period: u32) -> Result<Vec<RosterRecord>> {
        let conn = self.conn()?;
        read_rosters(&conn, period, None)
    }
}
