//! # Reminder Store
//!
//! SQLite persistence for reminder records. The store is the single source of
//! truth; timer registrations are derived from it.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Stats, purge of completed records, alarm id lookups
//! - 1.1.0: Explicit-id inserts for imports
//! - 1.0.0: Initial schema and CRUD

use crate::core::error::ReminderResult;
use crate::features::reminders::model::{Reminder, StoreStats};
use log::{debug, info};
use sqlite::{ConnectionWithFullMutex, State, Statement};
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        message TEXT NOT NULL,
        fire_at INTEGER NOT NULL,
        alarm_id INTEGER NOT NULL,
        is_scheduled INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_reminders_pending ON reminders (is_scheduled, fire_at);
    CREATE INDEX IF NOT EXISTS idx_reminders_alarm ON reminders (alarm_id);
";

const SELECT_COLUMNS: &str = "SELECT id, message, fire_at, alarm_id, is_scheduled, created_at FROM reminders";

/// Cloneable handle to the reminder store
#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<ConnectionWithFullMutex>>,
}

impl Database {
    /// Open (or create) the store at `path` and apply the schema
    pub async fn new(path: &str) -> ReminderResult<Self> {
        let connection = sqlite::Connection::open_with_full_mutex(path)?;
        // Durable before returning: every committed write is fsynced
        connection.execute("PRAGMA synchronous = FULL;")?;
        connection.execute(SCHEMA)?;

        info!("Reminder store opened at {}", path);

        Ok(Database {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Open a private in-memory store
    pub async fn in_memory() -> ReminderResult<Self> {
        Self::new(":memory:").await
    }

    /// Insert a reminder and return its id.
    ///
    /// A zero `id` lets the store assign the next one; a positive `id`
    /// replaces any record with that id.
    pub async fn insert(&self, reminder: &Reminder) -> ReminderResult<i64> {
        let conn = self.connection.lock().await;

        if reminder.id > 0 {
            let mut statement = conn.prepare(
                "INSERT OR REPLACE INTO reminders (id, message, fire_at, alarm_id, is_scheduled, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )?;
            statement.bind((1, reminder.id))?;
            statement.bind((2, reminder.message.as_str()))?;
            statement.bind((3, reminder.fire_at_epoch_millis))?;
            statement.bind((4, reminder.alarm_id as i64))?;
            statement.bind((5, reminder.is_scheduled as i64))?;
            statement.bind((6, reminder.created_at))?;
            drain(&mut statement)?;
        } else {
            let mut statement = conn.prepare(
                "INSERT INTO reminders (message, fire_at, alarm_id, is_scheduled, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )?;
            statement.bind((1, reminder.message.as_str()))?;
            statement.bind((2, reminder.fire_at_epoch_millis))?;
            statement.bind((3, reminder.alarm_id as i64))?;
            statement.bind((4, reminder.is_scheduled as i64))?;
            statement.bind((5, reminder.created_at))?;
            drain(&mut statement)?;
        }

        let mut statement = conn.prepare("SELECT last_insert_rowid()")?;
        let id = match statement.next()? {
            State::Row => statement.read::<i64, _>(0)?,
            State::Done => 0,
        };

        debug!("Stored reminder {} (alarm {})", id, reminder.alarm_id);
        Ok(id)
    }

    /// Pending reminders, earliest fire time first
    pub async fn get_scheduled(&self) -> ReminderResult<Vec<Reminder>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "{SELECT_COLUMNS} WHERE is_scheduled = 1 ORDER BY fire_at ASC, id ASC"
        ))?;
        read_reminders(&mut statement)
    }

    /// Every reminder, earliest fire time first
    pub async fn get_all(&self) -> ReminderResult<Vec<Reminder>> {
        let conn = self.connection.lock().await;
        let mut statement =
            conn.prepare(format!("{SELECT_COLUMNS} ORDER BY fire_at ASC, id ASC"))?;
        read_reminders(&mut statement)
    }

    pub async fn get_by_id(&self, id: i64) -> ReminderResult<Option<Reminder>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!("{SELECT_COLUMNS} WHERE id = ?"))?;
        statement.bind((1, id))?;
        Ok(read_reminders(&mut statement)?.into_iter().next())
    }

    /// Look up the reminder behind a fired timer.
    ///
    /// Completed records may share an alarm id with a pending one (imports keep
    /// historical ids), so a pending record always wins; among equals the
    /// newest does.
    pub async fn get_by_alarm_id(&self, alarm_id: i32) -> ReminderResult<Option<Reminder>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "{SELECT_COLUMNS} WHERE alarm_id = ? ORDER BY is_scheduled DESC, id DESC LIMIT 1"
        ))?;
        statement.bind((1, alarm_id as i64))?;
        Ok(read_reminders(&mut statement)?.into_iter().next())
    }

    /// Whether a pending reminder already owns `alarm_id`
    pub async fn is_alarm_id_in_use(&self, alarm_id: i32) -> ReminderResult<bool> {
        let conn = self.connection.lock().await;
        let mut statement = conn
            .prepare("SELECT COUNT(*) FROM reminders WHERE alarm_id = ? AND is_scheduled = 1")?;
        statement.bind((1, alarm_id as i64))?;
        let count = match statement.next()? {
            State::Row => statement.read::<i64, _>(0)?,
            State::Done => 0,
        };
        Ok(count > 0)
    }

    /// Mark a reminder as no longer pending. Idempotent.
    pub async fn mark_completed(&self, id: i64) -> ReminderResult<()> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare("UPDATE reminders SET is_scheduled = 0 WHERE id = ?")?;
        statement.bind((1, id))?;
        drain(&mut statement)?;
        debug!("Reminder {} marked completed", id);
        Ok(())
    }

    /// Remove a reminder; returns whether a record existed
    pub async fn delete(&self, id: i64) -> ReminderResult<bool> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare("DELETE FROM reminders WHERE id = ?")?;
        statement.bind((1, id))?;
        drain(&mut statement)?;
        Ok(conn.change_count() > 0)
    }

    /// Clear the store; returns the number of removed records
    pub async fn delete_all(&self) -> ReminderResult<usize> {
        let conn = self.connection.lock().await;
        conn.execute("DELETE FROM reminders")?;
        let removed = conn.change_count();
        info!("Deleted all {} reminders", removed);
        Ok(removed)
    }

    /// Remove completed reminders; returns the number of removed records
    pub async fn purge_completed(&self) -> ReminderResult<usize> {
        let conn = self.connection.lock().await;
        conn.execute("DELETE FROM reminders WHERE is_scheduled = 0")?;
        Ok(conn.change_count())
    }

    pub async fn stats(&self) -> ReminderResult<StoreStats> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "SELECT COUNT(*),
                    COALESCE(SUM(is_scheduled), 0),
                    MIN(CASE WHEN is_scheduled = 1 THEN fire_at END)
             FROM reminders",
        )?;

        match statement.next()? {
            State::Row => {
                let total = statement.read::<i64, _>(0)? as usize;
                let scheduled = statement.read::<i64, _>(1)? as usize;
                let next_fire_at = statement.read::<Option<i64>, _>(2)?;
                Ok(StoreStats {
                    total,
                    scheduled,
                    completed: total - scheduled,
                    next_fire_at,
                })
            }
            State::Done => Ok(StoreStats::default()),
        }
    }
}

/// Step a statement that returns no rows until it completes
fn drain(statement: &mut Statement<'_>) -> ReminderResult<()> {
    while let State::Row = statement.next()? {}
    Ok(())
}

fn read_reminders(statement: &mut Statement<'_>) -> ReminderResult<Vec<Reminder>> {
    let mut reminders = Vec::new();
    while let State::Row = statement.next()? {
        reminders.push(Reminder {
            id: statement.read::<i64, _>("id")?,
            message: statement.read::<String, _>("message")?,
            fire_at_epoch_millis: statement.read::<i64, _>("fire_at")?,
            alarm_id: statement.read::<i64, _>("alarm_id")? as i32,
            is_scheduled: statement.read::<i64, _>("is_scheduled")? != 0,
            created_at: statement.read::<i64, _>("created_at")?,
        });
    }
    Ok(reminders)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder(message: &str, fire_at: i64, alarm_id: i32) -> Reminder {
        Reminder::new(message.to_string(), fire_at, alarm_id)
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let db = Database::in_memory().await.unwrap();

        let first = db.insert(&reminder("one", 2_000, 1)).await.unwrap();
        let second = db.insert(&reminder("two", 1_000, 2)).await.unwrap();

        assert!(first > 0);
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_get_scheduled_orders_by_fire_time() {
        let db = Database::in_memory().await.unwrap();
        db.insert(&reminder("late", 3_000, 1)).await.unwrap();
        db.insert(&reminder("early", 1_000, 2)).await.unwrap();
        let done = db.insert(&reminder("done", 500, 3)).await.unwrap();
        db.insert(&reminder("middle", 2_000, 4)).await.unwrap();
        db.mark_completed(done).await.unwrap();

        let messages: Vec<String> = db
            .get_scheduled()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.message)
            .collect();

        assert_eq!(messages, vec!["early", "middle", "late"]);
    }

    #[tokio::test]
    async fn test_roundtrip_preserves_fields() {
        let db = Database::in_memory().await.unwrap();
        let original = reminder("Take medication", 1_700_000_000_000, 42);
        let id = db.insert(&original).await.unwrap();

        let stored = db.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.message, original.message);
        assert_eq!(stored.fire_at_epoch_millis, original.fire_at_epoch_millis);
        assert_eq!(stored.alarm_id, 42);
        assert!(stored.is_scheduled);
        assert_eq!(stored.created_at, original.created_at);
    }

    #[tokio::test]
    async fn test_get_by_alarm_id() {
        let db = Database::in_memory().await.unwrap();
        let id = db.insert(&reminder("water plants", 5_000, 77)).await.unwrap();

        let found = db.get_by_alarm_id(77).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(db.get_by_alarm_id(78).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_alarm_id_prefers_pending_over_newer_completed() {
        let db = Database::in_memory().await.unwrap();
        let pending = db.insert(&reminder("pending", 9_000, 31)).await.unwrap();
        let mut historical = reminder("historical", 1_000, 31);
        historical.is_scheduled = false;
        let completed = db.insert(&historical).await.unwrap();
        assert!(completed > pending);

        let found = db.get_by_alarm_id(31).await.unwrap().unwrap();
        assert_eq!(found.id, pending);
        assert!(found.is_scheduled);

        // Once nothing is pending the newest record is returned
        db.mark_completed(pending).await.unwrap();
        let found = db.get_by_alarm_id(31).await.unwrap().unwrap();
        assert_eq!(found.id, completed);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let path = std::env::temp_dir().join(format!("voice-reminder-{}.db", uuid::Uuid::new_v4()));
        let path = path.to_string_lossy().to_string();

        let id = {
            let db = Database::new(&path).await.unwrap();
            db.insert(&reminder("persisted", 7_000, 12)).await.unwrap()
        };

        let reopened = Database::new(&path).await.unwrap();
        let stored = reopened.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.message, "persisted");
        assert!(stored.is_scheduled);

        drop(reopened);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_mark_completed_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let id = db.insert(&reminder("call mom", 5_000, 9)).await.unwrap();

        db.mark_completed(id).await.unwrap();
        let once = db.get_by_id(id).await.unwrap();
        db.mark_completed(id).await.unwrap();
        let twice = db.get_by_id(id).await.unwrap();

        assert_eq!(once, twice);
        assert!(!twice.unwrap().is_scheduled);
        // Unknown ids are not an error either
        db.mark_completed(9_999).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let db = Database::in_memory().await.unwrap();
        let id = db.insert(&reminder("a", 1_000, 1)).await.unwrap();
        db.insert(&reminder("b", 2_000, 2)).await.unwrap();

        assert!(db.delete(id).await.unwrap());
        assert!(!db.delete(id).await.unwrap());
        assert!(db.get_by_alarm_id(1).await.unwrap().is_none());

        assert_eq!(db.delete_all().await.unwrap(), 1);
        assert!(db.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_id_insert_replaces() {
        let db = Database::in_memory().await.unwrap();
        let mut r = reminder("original", 1_000, 1);
        r.id = 10;
        assert_eq!(db.insert(&r).await.unwrap(), 10);

        r.message = "replacement".to_string();
        db.insert(&r).await.unwrap();

        let all = db.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].message, "replacement");
    }

    #[tokio::test]
    async fn test_alarm_id_in_use_ignores_completed() {
        let db = Database::in_memory().await.unwrap();
        let id = db.insert(&reminder("a", 1_000, 5)).await.unwrap();
        assert!(db.is_alarm_id_in_use(5).await.unwrap());

        db.mark_completed(id).await.unwrap();
        assert!(!db.is_alarm_id_in_use(5).await.unwrap());
    }

    #[tokio::test]
    async fn test_stats_and_purge() {
        let db = Database::in_memory().await.unwrap();
        assert_eq!(db.stats().await.unwrap(), StoreStats::default());

        let done = db.insert(&reminder("done", 1_000, 1)).await.unwrap();
        db.insert(&reminder("next", 4_000, 2)).await.unwrap();
        db.insert(&reminder("later", 9_000, 3)).await.unwrap();
        db.mark_completed(done).await.unwrap();

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.scheduled, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.next_fire_at, Some(4_000));

        assert_eq!(db.purge_completed().await.unwrap(), 1);
        assert_eq!(db.stats().await.unwrap().total, 2);
    }
}
