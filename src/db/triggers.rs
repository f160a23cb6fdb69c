use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use super::Database;
use crate::error::{Error, Result};
use crate::models::notification::{Notification, PendingTrigger, Trigger};
use crate::notify::Notifier;

struct TriggerRow {
    fire_at: String,
    repeat_daily: bool,
    notification: String,
}

fn row_to_pending(r: TriggerRow) -> Result<PendingTrigger> {
    let fire_at = DateTime::parse_from_rfc3339(&r.fire_at)
        .map_err(|e| Error::Storage(format!("bad trigger time '{}': {e}", r.fire_at)))?;
    Ok(PendingTrigger {
        notification: serde_json::from_str(&r.notification)?,
        trigger: Trigger {
            fire_at,
            repeat_daily: r.repeat_daily,
        },
    })
}

impl Database {
    fn pending_rows(&self) -> Result<Vec<PendingTrigger>> {
        let mut stmt = self.conn.prepare(
            "SELECT fire_at, repeat_daily, notification FROM triggers
             ORDER BY fire_at_utc, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TriggerRow {
                fire_at: row.get(0)?,
                repeat_daily: row.get(1)?,
                notification: row.get(2)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(row_to_pending(r?)?);
        }
        Ok(out)
    }

    /// Fire every trigger due at `now`: its notification becomes displayed,
    /// one-shot triggers are dropped and daily ones move to their next
    /// occurrence after `now`. Returns the fired notifications in fire order.
    pub fn fire_due(&self, now: DateTime<FixedOffset>) -> Result<Vec<Notification>> {
        let due: Vec<PendingTrigger> = self
            .pending_rows()?
            .into_iter()
            .filter(|p| p.trigger.fire_at <= now)
            .collect();

        let tx = self.conn.unchecked_transaction()?;
        let mut fired = Vec::with_capacity(due.len());
        for p in due {
            let id = &p.notification.id;
            tx.execute(
                "INSERT OR REPLACE INTO displayed (id, notification, displayed_at)
                 VALUES (?1, ?2, ?3)",
                params![id, serde_json::to_string(&p.notification)?, now.to_rfc3339()],
            )?;
            if p.trigger.repeat_daily {
                let mut next = p.trigger.fire_at;
                while next <= now {
                    next += Duration::days(1);
                }
                tx.execute(
                    "UPDATE triggers SET fire_at = ?1, fire_at_utc = ?2 WHERE id = ?3",
                    params![next.to_rfc3339(), next.timestamp(), id],
                )?;
                debug!(%id, next = %next, "daily trigger advanced");
            } else {
                tx.execute("DELETE FROM triggers WHERE id = ?1", params![id])?;
            }
            fired.push(p.notification);
        }
        tx.commit()?;
        Ok(fired)
    }

    /// Notifications currently shown to the user.
    pub fn displayed(&self) -> Result<Vec<Notification>> {
        let mut stmt = self
            .conn
            .prepare("SELECT notification FROM displayed ORDER BY displayed_at, id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for raw in rows {
            out.push(serde_json::from_str(&raw?)?);
        }
        Ok(out)
    }

    pub fn displayed_notification(&self, id: &str) -> Result<Option<Notification>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT notification FROM displayed WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[async_trait(?Send)]
impl Notifier for Database {
    async fn create_trigger(
        &self,
        notification: &Notification,
        trigger: &Trigger,
    ) -> Result<String> {
        self.conn.execute(
            "INSERT OR REPLACE INTO triggers (id, fire_at, fire_at_utc, repeat_daily, notification)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                notification.id,
                trigger.fire_at.to_rfc3339(),
                trigger.fire_at.timestamp(),
                trigger.repeat_daily,
                serde_json::to_string(notification)?,
            ],
        )?;
        Ok(notification.id.clone())
    }

    async fn cancel_trigger(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM triggers WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM displayed WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn list_triggers(&self) -> Result<Vec<PendingTrigger>> {
        self.pending_rows()
    }
}
