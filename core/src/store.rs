//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The engine and the runner call store methods — they never execute SQL
//! directly. The undo history is session-scoped: an in-memory bounded
//! stack, not persisted, matching the original depot behavior.

use crate::{
    error::TrackResult,
    event::EventLogEntry,
    types::{RunId, TimeMs},
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Maximum depth of the undo stack. Older entries fall off the bottom.
pub const UNDO_HISTORY_DEPTH: usize = 32;

pub mod status {
    pub const BOOKED: &str = "Booked";
    pub const IN_TRANSIT: &str = "In Transit";
    pub const OUT_FOR_DELIVERY: &str = "Out for Delivery";
    pub const DELIVERED: &str = "Delivered";
    pub const CANCELLED: &str = "Cancelled";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelRecord {
    pub parcel_id: String,
    pub sender: String,
    pub receiver: String,
    pub weight_kg: f64,
    pub priority: i64,
    pub status: String,
    pub booked_date: String,
}

/// One reversible store operation, pushed when the operation happens.
#[derive(Debug, Clone, PartialEq, Eq)]
enum UndoEntry {
    /// A parcel was added; undo removes it.
    Add { parcel_id: String },
    /// A parcel's status changed; undo restores the previous status.
    Status { parcel_id: String, previous: String },
}

/// What an undo actually did, for user-facing reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    RemovedParcel { parcel_id: String },
    RevertedStatus { parcel_id: String, status: String },
}

/// Depot dashboard aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParcelStats {
    pub total: i64,
    pub booked: i64,
    /// "In Transit" plus "Out for Delivery".
    pub in_transit: i64,
    pub delivered: i64,
    pub cancelled: i64,
}

/// Normalize a user-supplied parcel id: trim, then uppercase.
pub fn normalize_parcel_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub struct ParcelStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
    history: Vec<UndoEntry>,
}

impl ParcelStore {
    pub fn open(path: &str) -> TrackResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
            history: Vec::new(),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> TrackResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: None,
            history: Vec::new(),
        })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> TrackResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    pub fn db_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    // ── Parcel records ─────────────────────────────────────────

    /// Insert a parcel. Returns false when the id is already taken
    /// (the record is left untouched and nothing is pushed to history).
    pub fn add_parcel(&mut self, parcel: &ParcelRecord) -> TrackResult<bool> {
        let id = normalize_parcel_id(&parcel.parcel_id);
        if self.get_parcel(&id)?.is_some() {
            return Ok(false);
        }
        self.conn.execute(
            "INSERT INTO parcel (parcel_id, sender, receiver, weight_kg, priority, status, booked_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                parcel.sender,
                parcel.receiver,
                parcel.weight_kg,
                parcel.priority,
                parcel.status,
                parcel.booked_date,
            ],
        )?;
        self.push_history(UndoEntry::Add { parcel_id: id });
        Ok(true)
    }

    /// Exact-match lookup after trim+uppercase normalization of the id.
    pub fn get_parcel(&self, raw_id: &str) -> TrackResult<Option<ParcelRecord>> {
        let id = normalize_parcel_id(raw_id);
        let record = self
            .conn
            .query_row(
                "SELECT parcel_id, sender, receiver, weight_kg, priority, status, booked_date
                 FROM parcel WHERE parcel_id = ?1",
                params![id],
                parcel_row_mapper,
            )
            .optional()?;
        Ok(record)
    }

    /// All parcels in insertion order (the inventory listing).
    pub fn all_parcels(&self) -> TrackResult<Vec<ParcelRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT parcel_id, sender, receiver, weight_kg, priority, status, booked_date
             FROM parcel ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map([], parcel_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Mark a parcel cancelled, remembering its prior status for undo.
    /// Returns false when the id is unknown.
    pub fn cancel_parcel(&mut self, raw_id: &str) -> TrackResult<bool> {
        let id = normalize_parcel_id(raw_id);
        let Some(parcel) = self.get_parcel(&id)? else {
            return Ok(false);
        };
        self.conn.execute(
            "UPDATE parcel SET status = ?1 WHERE parcel_id = ?2",
            params![status::CANCELLED, id],
        )?;
        self.push_history(UndoEntry::Status {
            parcel_id: id,
            previous: parcel.status,
        });
        Ok(true)
    }

    /// Dispatch the warehouse: the first "Booked" parcel (insertion
    /// order) moves to "In Transit". Returns the dispatched parcel, or
    /// None when nothing is waiting.
    pub fn process_next(&mut self) -> TrackResult<Option<ParcelRecord>> {
        let next = self
            .conn
            .query_row(
                "SELECT parcel_id, sender, receiver, weight_kg, priority, status, booked_date
                 FROM parcel WHERE status = ?1 ORDER BY rowid ASC LIMIT 1",
                params![status::BOOKED],
                parcel_row_mapper,
            )
            .optional()?;
        let Some(mut parcel) = next else {
            return Ok(None);
        };
        self.conn.execute(
            "UPDATE parcel SET status = ?1 WHERE parcel_id = ?2",
            params![status::IN_TRANSIT, parcel.parcel_id],
        )?;
        self.push_history(UndoEntry::Status {
            parcel_id: parcel.parcel_id.clone(),
            previous: status::BOOKED.to_string(),
        });
        parcel.status = status::IN_TRANSIT.to_string();
        Ok(Some(parcel))
    }

    /// Revert the most recent reversible operation. Returns None when
    /// the history is empty.
    pub fn undo_last(&mut self) -> TrackResult<Option<UndoOutcome>> {
        let Some(entry) = self.history.pop() else {
            return Ok(None);
        };
        match entry {
            UndoEntry::Add { parcel_id } => {
                self.conn.execute(
                    "DELETE FROM parcel WHERE parcel_id = ?1",
                    params![parcel_id],
                )?;
                Ok(Some(UndoOutcome::RemovedParcel { parcel_id }))
            }
            UndoEntry::Status { parcel_id, previous } => {
                self.conn.execute(
                    "UPDATE parcel SET status = ?1 WHERE parcel_id = ?2",
                    params![previous, parcel_id],
                )?;
                Ok(Some(UndoOutcome::RevertedStatus {
                    parcel_id,
                    status: previous,
                }))
            }
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn push_history(&mut self, entry: UndoEntry) {
        if self.history.len() == UNDO_HISTORY_DEPTH {
            self.history.remove(0);
        }
        self.history.push(entry);
    }

    // ── Dashboard aggregates ───────────────────────────────────

    pub fn stats(&self) -> TrackResult<ParcelStats> {
        let count = |sql: &str| -> TrackResult<i64> {
            self.conn
                .query_row(sql, [], |row| row.get(0))
                .map_err(Into::into)
        };
        Ok(ParcelStats {
            total: count("SELECT COUNT(*) FROM parcel")?,
            booked: count("SELECT COUNT(*) FROM parcel WHERE status = 'Booked'")?,
            in_transit: count(
                "SELECT COUNT(*) FROM parcel
                 WHERE status IN ('In Transit', 'Out for Delivery')",
            )?,
            delivered: count("SELECT COUNT(*) FROM parcel WHERE status = 'Delivered'")?,
            cancelled: count("SELECT COUNT(*) FROM parcel WHERE status = 'Cancelled'")?,
        })
    }

    // ── Simulation runs ────────────────────────────────────────

    pub fn insert_sim_run(
        &self,
        run_id: &str,
        start: &str,
        end: &str,
        path: &[String],
        started_ms: TimeMs,
    ) -> TrackResult<()> {
        self.conn.execute(
            "INSERT INTO sim_run (run_id, start_city, end_city, path, started_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                start,
                end,
                serde_json::to_string(path)?,
                started_ms as i64,
            ],
        )?;
        Ok(())
    }

    pub fn mark_sim_run_arrived(&self, run_id: &str, arrived_ms: TimeMs) -> TrackResult<()> {
        self.conn.execute(
            "UPDATE sim_run SET arrived_ms = ?1 WHERE run_id = ?2",
            params![arrived_ms as i64, run_id],
        )?;
        Ok(())
    }

    pub fn get_sim_run(&self, run_id: &str) -> TrackResult<Option<SimRunRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT run_id, start_city, end_city, path, started_ms, arrived_ms
                 FROM sim_run WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                    ))
                },
            )
            .optional()?;
        let Some((run_id, start_city, end_city, path_json, started, arrived)) = record else {
            return Ok(None);
        };
        Ok(Some(SimRunRecord {
            run_id,
            start_city,
            end_city,
            path: serde_json::from_str(&path_json)?,
            started_ms: started as u64,
            arrived_ms: arrived.map(|a| a as u64),
        }))
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> TrackResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (time_ms, generation, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.time_ms as i64,
                entry.generation as i64,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    /// The full event log in append order.
    pub fn all_events(&self) -> TrackResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, time_ms, generation, event_type, payload
             FROM event_log ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    time_ms: row.get::<_, i64>(1)? as u64,
                    generation: row.get::<_, i64>(2)? as u64,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, event_type: &str) -> TrackResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM event_log WHERE event_type = ?1",
                params![event_type],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // ── Demo seed data ─────────────────────────────────────────

    /// Load the four demo parcels if the table is empty. Seeding is not
    /// an undoable user action, so it bypasses the history stack.
    pub fn seed_demo_data(&self) -> TrackResult<()> {
        let existing: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM parcel", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(());
        }
        let seed = [
            ("SW1001", "Karachi", "Lahore", 5.0, 1, status::IN_TRANSIT, "Jan 15, 2025"),
            ("SW1002", "Hyderabad", "Islamabad", 2.0, 2, status::DELIVERED, "Jan 10, 2025"),
            ("SW1003", "Multan", "Sukkur", 12.0, 3, status::BOOKED, "Jan 20, 2025"),
            ("SW1004", "Islamabad", "Karachi", 1.0, 1, status::OUT_FOR_DELIVERY, "Jan 12, 2025"),
        ];
        for (id, sender, receiver, weight, priority, parcel_status, date) in seed {
            self.conn.execute(
                "INSERT INTO parcel (parcel_id, sender, receiver, weight_kg, priority, status, booked_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, sender, receiver, weight, priority, parcel_status, date],
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimRunRecord {
    pub run_id: RunId,
    pub start_city: String,
    pub end_city: String,
    pub path: Vec<String>,
    pub started_ms: TimeMs,
    pub arrived_ms: Option<TimeMs>,
}

/// Today's date in the depot's booking format, e.g. "Jan 15, 2025".
pub fn booked_date_today() -> String {
    chrono::Local::now().format("%b %-d, %Y").to_string()
}

fn parcel_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<ParcelRecord> {
    Ok(ParcelRecord {
        parcel_id: row.get(0)?,
        sender: row.get(1)?,
        receiver: row.get(2)?,
        weight_kg: row.get(3)?,
        priority: row.get(4)?,
        status: row.get(5)?,
        booked_date: row.get(6)?,
    })
}
