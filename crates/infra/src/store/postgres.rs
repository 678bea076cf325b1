//! Postgres-backed store.
//!
//! Queries are runtime-checked (`sqlx::query`), so the crate builds without a
//! live database. Each mutating trait method runs in one transaction; the
//! ledger guards take a `FOR UPDATE` lock on the latest entry so concurrent
//! writers for the same shipment serialize at the database.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::instrument;

use reliefstock_contributions::{Contribution, ContributionKind, ContributionStatus};
use reliefstock_core::{ContributionId, InventoryId, TrackId, Uid};
use reliefstock_inventory::{InventoryItem, ItemStatus, SourceType};
use reliefstock_tracking::{DestinationKind, EventPatch, NewTrackingEvent, TrackingEvent};

use super::{ItemStateUpdate, StoreError, WarehouseStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contributions (
    id           UUID PRIMARY KEY,
    uid          TEXT NOT NULL UNIQUE,
    status       TEXT NOT NULL,
    kind         JSONB NOT NULL,
    admin_remark TEXT,
    submitted_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS inventory_items (
    inventory_id     UUID PRIMARY KEY,
    source_type      TEXT NOT NULL,
    source_id        UUID NOT NULL,
    uid              TEXT NOT NULL UNIQUE,
    product_name     TEXT,
    quantity         BIGINT,
    unit             TEXT,
    location         TEXT NOT NULL,
    status           TEXT NOT NULL,
    perishable       BOOLEAN NOT NULL,
    manufacture_date DATE,
    expiry_date      DATE,
    amount           BIGINT,
    method           TEXT,
    created_at       TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS tracking_events (
    track_id       BIGSERIAL PRIMARY KEY,
    uid            TEXT NOT NULL,
    status         TEXT NOT NULL,
    from_location  TEXT,
    to_type        TEXT,
    to_name        TEXT,
    dispatched_by  TEXT,
    dispatch_date  DATE,
    delivered_date DATE,
    remarks        TEXT,
    created_at     TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tracking_events_uid ON tracking_events (uid);
"#;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx("connect", e))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("ensure_schema", e))?;
        Ok(())
    }
}

fn map_sqlx(operation: &str, err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        return StoreError::conflict(format!("{operation}: duplicate key"));
    }
    StoreError::storage(format!("{operation}: {err}"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::storage(format!("corrupt {what} row: {detail}"))
}

fn contribution_from_row(row: &PgRow) -> Result<Contribution, StoreError> {
    let status: String = row.try_get("status").map_err(|e| corrupt("contribution", e))?;
    let kind: serde_json::Value = row.try_get("kind").map_err(|e| corrupt("contribution", e))?;
    let uid: String = row.try_get("uid").map_err(|e| corrupt("contribution", e))?;
    Ok(Contribution {
        id: ContributionId::from_uuid(row.try_get("id").map_err(|e| corrupt("contribution", e))?),
        uid: Uid::new(uid).map_err(|e| corrupt("contribution", e))?,
        status: status
            .parse::<ContributionStatus>()
            .map_err(|e| corrupt("contribution", e))?,
        kind: serde_json::from_value::<ContributionKind>(kind)
            .map_err(|e| corrupt("contribution", e))?,
        admin_remark: row
            .try_get("admin_remark")
            .map_err(|e| corrupt("contribution", e))?,
        submitted_at: row
            .try_get("submitted_at")
            .map_err(|e| corrupt("contribution", e))?,
    })
}

fn item_from_row(row: &PgRow) -> Result<InventoryItem, StoreError> {
    let source_type: String = row.try_get("source_type").map_err(|e| corrupt("item", e))?;
    let status: String = row.try_get("status").map_err(|e| corrupt("item", e))?;
    let uid: String = row.try_get("uid").map_err(|e| corrupt("item", e))?;
    Ok(InventoryItem {
        inventory_id: InventoryId::from_uuid(
            row.try_get("inventory_id").map_err(|e| corrupt("item", e))?,
        ),
        source_type: source_type
            .parse::<SourceType>()
            .map_err(|e| corrupt("item", e))?,
        source_id: ContributionId::from_uuid(
            row.try_get("source_id").map_err(|e| corrupt("item", e))?,
        ),
        uid: Uid::new(uid).map_err(|e| corrupt("item", e))?,
        product_name: row.try_get("product_name").map_err(|e| corrupt("item", e))?,
        quantity: row.try_get("quantity").map_err(|e| corrupt("item", e))?,
        unit: row.try_get("unit").map_err(|e| corrupt("item", e))?,
        location: row.try_get("location").map_err(|e| corrupt("item", e))?,
        status: status.parse::<ItemStatus>().map_err(|e| corrupt("item", e))?,
        perishable: row.try_get("perishable").map_err(|e| corrupt("item", e))?,
        manufacture_date: row
            .try_get("manufacture_date")
            .map_err(|e| corrupt("item", e))?,
        expiry_date: row.try_get("expiry_date").map_err(|e| corrupt("item", e))?,
        amount: row.try_get("amount").map_err(|e| corrupt("item", e))?,
        method: row.try_get("method").map_err(|e| corrupt("item", e))?,
        created_at: row.try_get("created_at").map_err(|e| corrupt("item", e))?,
    })
}

fn event_from_row(row: &PgRow) -> Result<TrackingEvent, StoreError> {
    let uid: String = row.try_get("uid").map_err(|e| corrupt("event", e))?;
    let to_type: Option<String> = row.try_get("to_type").map_err(|e| corrupt("event", e))?;
    Ok(TrackingEvent {
        track_id: TrackId::new(row.try_get("track_id").map_err(|e| corrupt("event", e))?),
        uid: Uid::new(uid).map_err(|e| corrupt("event", e))?,
        status: row.try_get("status").map_err(|e| corrupt("event", e))?,
        from_location: row
            .try_get("from_location")
            .map_err(|e| corrupt("event", e))?,
        to_type: to_type
            .map(|t| t.parse::<DestinationKind>())
            .transpose()
            .map_err(|e| corrupt("event", e))?,
        to_name: row.try_get("to_name").map_err(|e| corrupt("event", e))?,
        dispatched_by: row
            .try_get("dispatched_by")
            .map_err(|e| corrupt("event", e))?,
        dispatch_date: row
            .try_get("dispatch_date")
            .map_err(|e| corrupt("event", e))?,
        delivered_date: row
            .try_get("delivered_date")
            .map_err(|e| corrupt("event", e))?,
        remarks: row.try_get("remarks").map_err(|e| corrupt("event", e))?,
        created_at: row.try_get("created_at").map_err(|e| corrupt("event", e))?,
    })
}

const INSERT_EVENT: &str = r#"
INSERT INTO tracking_events
    (uid, status, from_location, to_type, to_name, dispatched_by,
     dispatch_date, delivered_date, remarks, created_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
RETURNING track_id
"#;

async fn insert_event(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event: &NewTrackingEvent,
) -> Result<TrackingEvent, StoreError> {
    let row = sqlx::query(INSERT_EVENT)
        .bind(event.uid.as_str())
        .bind(&event.status)
        .bind(&event.from_location)
        .bind(event.to_type.map(|t| t.as_str()))
        .bind(&event.to_name)
        .bind(&event.dispatched_by)
        .bind(event.dispatch_date)
        .bind(event.delivered_date)
        .bind(&event.remarks)
        .bind(event.created_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx("insert_event", e))?;
    let track_id: i64 = row.try_get("track_id").map_err(|e| corrupt("event", e))?;
    Ok(TrackingEvent {
        track_id: TrackId::new(track_id),
        uid: event.uid.clone(),
        status: event.status.clone(),
        from_location: event.from_location.clone(),
        to_type: event.to_type,
        to_name: event.to_name.clone(),
        dispatched_by: event.dispatched_by.clone(),
        dispatch_date: event.dispatch_date,
        delivered_date: event.delivered_date,
        remarks: event.remarks.clone(),
        created_at: event.created_at,
    })
}

/// Locks the latest ledger entry for `uid` and verifies the caller's guard.
async fn lock_latest(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    uid: &Uid,
    expected: TrackId,
) -> Result<TrackingEvent, StoreError> {
    let row = sqlx::query(
        "SELECT * FROM tracking_events WHERE uid = $1 \
         ORDER BY track_id DESC LIMIT 1 FOR UPDATE",
    )
    .bind(uid.as_str())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx("lock_latest", e))?;

    let latest = match row {
        Some(row) => event_from_row(&row)?,
        None => return Err(StoreError::NotFound),
    };
    if latest.track_id != expected {
        return Err(StoreError::stale_write(format!(
            "latest entry for {uid} is {}, caller expected {}",
            latest.track_id.value(),
            expected.value()
        )));
    }
    Ok(latest)
}

async fn apply_item_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    uid: &Uid,
    update: &ItemStateUpdate,
) -> Result<(), StoreError> {
    if update.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "UPDATE inventory_items SET \
         status = COALESCE($2, status), location = COALESCE($3, location) \
         WHERE uid = $1",
    )
    .bind(uid.as_str())
    .bind(update.status.map(|s| s.as_str()))
    .bind(&update.location)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx("apply_item_update", e))?;
    Ok(())
}

/// Distinguishes `Conflict` from `NotFound` after a compare-and-set update
/// matched zero rows.
async fn decided_or_missing(pool: &PgPool, id: ContributionId) -> StoreError {
    let row = sqlx::query("SELECT uid FROM contributions WHERE id = $1")
        .bind(id.as_uuid())
        .fetch_optional(pool)
        .await;
    match row {
        Ok(Some(row)) => {
            let uid: String = row.try_get("uid").unwrap_or_default();
            StoreError::conflict(format!("contribution {uid} already decided"))
        }
        Ok(None) => StoreError::NotFound,
        Err(e) => map_sqlx("decided_or_missing", e),
    }
}

#[async_trait]
impl WarehouseStore for PostgresStore {
    #[instrument(skip_all, fields(uid = %contribution.uid))]
    async fn insert_contribution(&self, contribution: Contribution) -> Result<(), StoreError> {
        let kind = serde_json::to_value(&contribution.kind)
            .map_err(|e| StoreError::storage(format!("serialize contribution kind: {e}")))?;
        sqlx::query(
            "INSERT INTO contributions (id, uid, status, kind, admin_remark, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(contribution.id.as_uuid())
        .bind(contribution.uid.as_str())
        .bind(contribution.status.as_str())
        .bind(kind)
        .bind(&contribution.admin_remark)
        .bind(contribution.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("insert_contribution", e))?;
        Ok(())
    }

    async fn get_contribution(
        &self,
        id: ContributionId,
    ) -> Result<Option<Contribution>, StoreError> {
        let row = sqlx::query("SELECT * FROM contributions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("get_contribution", e))?;
        row.as_ref().map(contribution_from_row).transpose()
    }

    async fn list_contributions(
        &self,
        status: Option<ContributionStatus>,
    ) -> Result<Vec<Contribution>, StoreError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    "SELECT * FROM contributions WHERE status = $1 ORDER BY submitted_at DESC",
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM contributions ORDER BY submitted_at DESC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| map_sqlx("list_contributions", e))?;
        rows.iter().map(contribution_from_row).collect()
    }

    #[instrument(skip_all, fields(contribution_id = %id))]
    async fn reject_contribution(
        &self,
        id: ContributionId,
        remark: Option<String>,
    ) -> Result<Uid, StoreError> {
        let row = sqlx::query(
            "UPDATE contributions SET status = $2, admin_remark = $3 \
             WHERE id = $1 AND status = $4 RETURNING uid",
        )
        .bind(id.as_uuid())
        .bind(ContributionStatus::Rejected.as_str())
        .bind(&remark)
        .bind(ContributionStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("reject_contribution", e))?;

        match row {
            Some(row) => {
                let uid: String = row.try_get("uid").map_err(|e| corrupt("contribution", e))?;
                Uid::new(uid).map_err(|e| corrupt("contribution", e))
            }
            None => Err(decided_or_missing(&self.pool, id).await),
        }
    }

    #[instrument(skip_all, fields(contribution_id = %id, uid = %item.uid))]
    async fn approve_and_materialize(
        &self,
        id: ContributionId,
        item: InventoryItem,
        seed: NewTrackingEvent,
        remark: Option<String>,
    ) -> Result<TrackingEvent, StoreError> {
        if item.uid != seed.uid {
            return Err(StoreError::storage("seed event uid does not match item uid"));
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx("begin", e))?;

        let updated = sqlx::query(
            "UPDATE contributions SET status = $2, admin_remark = $3 \
             WHERE id = $1 AND status = $4",
        )
        .bind(id.as_uuid())
        .bind(ContributionStatus::Approved.as_str())
        .bind(&remark)
        .bind(ContributionStatus::Pending.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx("approve_contribution", e))?;
        if updated.rows_affected() == 0 {
            return Err(decided_or_missing(&self.pool, id).await);
        }

        sqlx::query(
            "INSERT INTO inventory_items \
             (inventory_id, source_type, source_id, uid, product_name, quantity, unit, \
              location, status, perishable, manufacture_date, expiry_date, amount, method, \
              created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(item.inventory_id.as_uuid())
        .bind(item.source_type.as_str())
        .bind(item.source_id.as_uuid())
        .bind(item.uid.as_str())
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(&item.unit)
        .bind(&item.location)
        .bind(item.status.as_str())
        .bind(item.perishable)
        .bind(item.manufacture_date)
        .bind(item.expiry_date)
        .bind(item.amount)
        .bind(&item.method)
        .bind(item.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx("insert_inventory_item", e))?;

        let stored = insert_event(&mut tx, &seed).await?;

        tx.commit().await.map_err(|e| map_sqlx("commit", e))?;
        Ok(stored)
    }

    async fn get_item_by_uid(&self, uid: &Uid) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query("SELECT * FROM inventory_items WHERE uid = $1")
            .bind(uid.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("get_item_by_uid", e))?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let rows = sqlx::query("SELECT * FROM inventory_items ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx("list_items", e))?;
        rows.iter().map(item_from_row).collect()
    }

    async fn latest_event(&self, uid: &Uid) -> Result<Option<TrackingEvent>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM tracking_events WHERE uid = $1 ORDER BY track_id DESC LIMIT 1",
        )
        .bind(uid.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("latest_event", e))?;
        row.as_ref().map(event_from_row).transpose()
    }

    #[instrument(skip_all, fields(uid = %event.uid, expected = expected_latest.value()))]
    async fn append_event(
        &self,
        event: NewTrackingEvent,
        expected_latest: TrackId,
        item_update: Option<ItemStateUpdate>,
    ) -> Result<TrackingEvent, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx("begin", e))?;

        lock_latest(&mut tx, &event.uid, expected_latest).await?;
        let stored = insert_event(&mut tx, &event).await?;
        if let Some(update) = item_update {
            apply_item_update(&mut tx, &event.uid, &update).await?;
        }

        tx.commit().await.map_err(|e| map_sqlx("commit", e))?;
        Ok(stored)
    }

    #[instrument(skip_all, fields(uid = %uid, expected = expected_latest.value()))]
    async fn correct_latest(
        &self,
        uid: &Uid,
        expected_latest: TrackId,
        patch: EventPatch,
        item_update: Option<ItemStateUpdate>,
    ) -> Result<TrackingEvent, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx("begin", e))?;

        let mut latest = lock_latest(&mut tx, uid, expected_latest).await?;
        latest.apply_patch(&patch);

        sqlx::query(
            "UPDATE tracking_events SET status = $2, delivered_date = $3, remarks = $4 \
             WHERE track_id = $1",
        )
        .bind(latest.track_id.value())
        .bind(&latest.status)
        .bind(latest.delivered_date)
        .bind(&latest.remarks)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx("correct_latest", e))?;

        if let Some(update) = item_update {
            apply_item_update(&mut tx, uid, &update).await?;
        }

        tx.commit().await.map_err(|e| map_sqlx("commit", e))?;
        Ok(latest)
    }

    async fn timeline(&self, uid: &Uid) -> Result<Vec<TrackingEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM tracking_events WHERE uid = $1 ORDER BY created_at ASC, track_id ASC",
        )
        .bind(uid.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("timeline", e))?;
        rows.iter().map(event_from_row).collect()
    }

    async fn latest_per_uid(&self) -> Result<Vec<TrackingEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT t.* FROM tracking_events t \
             INNER JOIN (SELECT uid, MAX(track_id) AS max_id FROM tracking_events GROUP BY uid) l \
             ON t.uid = l.uid AND t.track_id = l.max_id \
             ORDER BY t.track_id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("latest_per_uid", e))?;
        rows.iter().map(event_from_row).collect()
    }
}
