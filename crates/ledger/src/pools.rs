//! A `Pool` is the shared balance of one organizational unit.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: Uuid,
    pub name: String,
    /// Minor units. Only ledger movements change it.
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl Pool {
    pub(crate) fn new(name: String, created_by: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            balance: 0,
            created_at: Utc::now(),
            created_by,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "pools")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub balance: i64,
    pub created_at: DateTimeUtc,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::members::Entity")]
    Members,
    #[sea_orm(has_many = "super::ledger_entries::Entity")]
    LedgerEntries,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::ledger_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Pool> for ActiveModel {
    fn from(pool: &Pool) -> Self {
        Self {
            id: ActiveValue::Set(pool.id.to_string()),
            name: ActiveValue::Set(pool.name.clone()),
            balance: ActiveValue::Set(pool.balance),
            created_at: ActiveValue::Set(pool.created_at),
            created_by: ActiveValue::Set(pool.created_by.clone()),
        }
    }
}

impl TryFrom<Model> for Pool {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "pool")?,
            name: model.name,
            balance: model.balance,
            created_at: model.created_at,
            created_by: model.created_by,
        })
    }
}
