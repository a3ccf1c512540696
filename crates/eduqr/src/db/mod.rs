/// Database module for rooms, courses and attendance records
pub mod audit;
pub mod catalog;
pub mod courses;
pub mod presences;
mod types;

pub use types::{
    AuditRecord, Course, NewRoom, Presence, PresenceStatus, Role, Room, RoomBooking, User,
};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Mutex, MutexGuard, PoisonError};

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_schedule.sql");

/// Owns the SQLite connection.
///
/// All access goes through one connection behind a mutex, so a closure passed
/// to [`ScheduleDb::transaction`] sees no interleaved writers: a conflict check
/// and the insert that depends on it commit together or not at all.
pub struct ScheduleDb {
    db: Mutex<Connection>,
}

impl ScheduleDb {
    /// Opens the database at `db_path` and applies the schema
    pub fn open(db_path: &str) -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open(db_path)?)
    }

    /// Opens a private in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Runs read-only or single-statement work against the connection
    pub fn read<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E> {
        let db = self.lock();
        f(&db)
    }

    /// Runs `f` inside an IMMEDIATE transaction, committing only if it succeeds
    pub fn transaction<T, E>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let mut db = self.lock();
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves no open transaction behind:
        // the Transaction guard rolls back on drop.
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(column: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(column, ms))
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Seed helpers shared by the unit tests of every module.

    use super::*;
    use chrono::TimeZone;

    pub struct Campus {
        pub subject: i64,
        pub teacher: i64,
        pub student: i64,
        pub admin: i64,
        pub standalone: i64,
        pub hall: i64,
        pub hall_a: i64,
        pub hall_b: i64,
    }

    pub fn campus(db: &ScheduleDb) -> Campus {
        db.transaction(|tx| -> rusqlite::Result<Campus> {
            let subject = catalog::insert_subject(tx, "Mathematics", "MATH")?;
            let teacher = catalog::insert_user(tx, "prof@school.test", "Ada", "Lovelace", Role::Teacher)?;
            let student = catalog::insert_user(tx, "kid@school.test", "Sam", "Doe", Role::Student)?;
            let admin = catalog::insert_user(tx, "admin@school.test", "Root", "Admin", Role::Admin)?;
            let standalone = catalog::insert_room(
                tx,
                &NewRoom {
                    name: "B12".to_string(),
                    ..NewRoom::default()
                },
            )?;
            let (hall, subs) = catalog::insert_modular_room(
                tx,
                &NewRoom {
                    name: "Amphi".to_string(),
                    building: Some("Main".to_string()),
                    ..NewRoom::default()
                },
                2,
            )?;
            Ok(Campus {
                subject,
                teacher,
                student,
                admin,
                standalone,
                hall,
                hall_a: subs[0],
                hall_b: subs[1],
            })
        })
        .unwrap()
    }

    pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_transaction_rolls_back() {
        let db = ScheduleDb::open_in_memory().unwrap();
        let result: Result<(), rusqlite::Error> = db.transaction(|tx| {
            catalog::insert_subject(tx, "History", "HIST")?;
            Err(rusqlite::Error::QueryReturnedNoRows)
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|c| c.query_row("SELECT COUNT(*) FROM subjects", [], |row| row.get(0)))
            .unwrap();
        assert_eq!(count, 0);
    }
}
