//! Ledger entries.
//!
//! One [`LedgerEntry`] per monetary movement. Apart from the status
//! transition (`pending → approved | rejected`) and the settlement fields of
//! group fees, an entry never changes after it is written.
//!
//! `balance_before`/`balance_after` are **pool** balance snapshots and are
//! only present once the movement was applied.

use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MovementType, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Approved,
    Rejected,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl TryFrom<&str> for EntryStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::InvalidData(format!(
                "invalid entry status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub pool_id: Uuid,
    pub member_id: Option<String>,
    pub movement_type: MovementType,
    pub amount_minor: i64,
    pub description: String,
    pub batch_id: Option<Uuid>,
    pub status: EntryStatus,
    pub balance_before: Option<i64>,
    pub balance_after: Option<i64>,
    pub settled_at: Option<DateTime<Utc>>,
    pub settled_by_entry_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
}

impl LedgerEntry {
    /// A new entry without status, snapshots or decision fields.
    pub(crate) fn new(
        pool_id: Uuid,
        member_id: Option<String>,
        movement_type: MovementType,
        amount_minor: i64,
        description: String,
        batch_id: Option<Uuid>,
        created_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pool_id,
            member_id,
            movement_type,
            amount_minor,
            description,
            batch_id,
            status: EntryStatus::Pending,
            balance_before: None,
            balance_after: None,
            settled_at: None,
            settled_by_entry_id: None,
            created_at: Utc::now(),
            created_by,
            approved_at: None,
            approved_by: None,
            rejected_at: None,
            rejected_by: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.settled_at.is_some()
    }

    /// Signed effect on the pool once committed, zero otherwise.
    pub fn pool_delta(&self) -> i64 {
        match self.status {
            EntryStatus::Approved => self.movement_type.delta(self.amount_minor).pool,
            EntryStatus::Pending | EntryStatus::Rejected => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub pool_id: String,
    pub member_id: Option<String>,
    pub movement_type: String,
    pub amount_minor: i64,
    pub description: String,
    pub batch_id: Option<String>,
    pub status: String,
    pub balance_before: Option<i64>,
    pub balance_after: Option<i64>,
    pub settled_at: Option<DateTimeUtc>,
    pub settled_by_entry_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub created_by: String,
    pub approved_at: Option<DateTimeUtc>,
    pub approved_by: Option<String>,
    pub rejected_at: Option<DateTimeUtc>,
    pub rejected_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pools::Entity",
        from = "Column::PoolId",
        to = "super::pools::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Pools,
}

impl Related<super::pools::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pools.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LedgerEntry> for ActiveModel {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            pool_id: ActiveValue::Set(entry.pool_id.to_string()),
            member_id: ActiveValue::Set(entry.member_id.clone()),
            movement_type: ActiveValue::Set(entry.movement_type.as_str().to_string()),
            amount_minor: ActiveValue::Set(entry.amount_minor),
            description: ActiveValue::Set(entry.description.clone()),
            batch_id: ActiveValue::Set(entry.batch_id.map(|id| id.to_string())),
            status: ActiveValue::Set(entry.status.as_str().to_string()),
            balance_before: ActiveValue::Set(entry.balance_before),
            balance_after: ActiveValue::Set(entry.balance_after),
            settled_at: ActiveValue::Set(entry.settled_at),
            settled_by_entry_id: ActiveValue::Set(
                entry.settled_by_entry_id.map(|id| id.to_string()),
            ),
            created_at: ActiveValue::Set(entry.created_at),
            created_by: ActiveValue::Set(entry.created_by.clone()),
            approved_at: ActiveValue::Set(entry.approved_at),
            approved_by: ActiveValue::Set(entry.approved_by.clone()),
            rejected_at: ActiveValue::Set(entry.rejected_at),
            rejected_by: ActiveValue::Set(entry.rejected_by.clone()),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "ledger entry")?,
            pool_id: parse_uuid(&model.pool_id, "pool")?,
            member_id: model.member_id,
            movement_type: MovementType::try_from(model.movement_type.as_str())?,
            amount_minor: model.amount_minor,
            description: model.description,
            batch_id: model
                .batch_id
                .as_deref()
                .map(|id| parse_uuid(id, "batch"))
                .transpose()?,
            status: EntryStatus::try_from(model.status.as_str())?,
            balance_before: model.balance_before,
            balance_after: model.balance_after,
            settled_at: model.settled_at,
            settled_by_entry_id: model
                .settled_by_entry_id
                .as_deref()
                .map(|id| parse_uuid(id, "ledger entry"))
                .transpose()?,
            created_at: model.created_at,
            created_by: model.created_by,
            approved_at: model.approved_at,
            approved_by: model.approved_by,
            rejected_at: model.rejected_at,
            rejected_by: model.rejected_by,
        })
    }
}
