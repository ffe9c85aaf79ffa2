//! Append-only audit log. One entry per mutating engine call.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{Actor, EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    TransferCreated,
    TransferRequested,
    TransferApproved,
    TransferRejected,
    GroupFeeWaived,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransferCreated => "transfer_created",
            Self::TransferRequested => "transfer_requested",
            Self::TransferApproved => "transfer_approved",
            Self::TransferRejected => "transfer_rejected",
            Self::GroupFeeWaived => "group_fee_waived",
        }
    }
}

impl TryFrom<&str> for AuditAction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "transfer_created" => Ok(Self::TransferCreated),
            "transfer_requested" => Ok(Self::TransferRequested),
            "transfer_approved" => Ok(Self::TransferApproved),
            "transfer_rejected" => Ok(Self::TransferRejected),
            "group_fee_waived" => Ok(Self::GroupFeeWaived),
            other => Err(EngineError::InvalidData(format!(
                "invalid audit action: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub pool_id: Uuid,
    pub actor_id: String,
    pub actor_name: String,
    pub action: AuditAction,
    pub target_entry_id: Uuid,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub(crate) fn new(
        pool_id: Uuid,
        actor: &Actor,
        action: AuditAction,
        target_entry_id: Uuid,
        details: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pool_id,
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            action,
            target_entry_id,
            details,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub pool_id: String,
    pub actor_id: String,
    pub actor_name: String,
    pub action: String,
    pub target_entry_id: String,
    pub details: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&AuditEntry> for ActiveModel {
    fn from(entry: &AuditEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            pool_id: ActiveValue::Set(entry.pool_id.to_string()),
            actor_id: ActiveValue::Set(entry.actor_id.clone()),
            actor_name: ActiveValue::Set(entry.actor_name.clone()),
            action: ActiveValue::Set(entry.action.as_str().to_string()),
            target_entry_id: ActiveValue::Set(entry.target_entry_id.to_string()),
            details: ActiveValue::Set(entry.details.to_string()),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for AuditEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let details = serde_json::from_str(&model.details)
            .map_err(|err| EngineError::InvalidData(format!("invalid audit details: {err}")))?;
        Ok(Self {
            id: parse_uuid(&model.id, "audit")?,
            pool_id: parse_uuid(&model.pool_id, "pool")?,
            actor_id: model.actor_id,
            actor_name: model.actor_name,
            action: AuditAction::try_from(model.action.as_str())?,
            target_entry_id: parse_uuid(&model.target_entry_id, "ledger entry")?,
            details,
            created_at: model.created_at,
        })
    }
}
