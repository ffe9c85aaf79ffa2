//! Per-pool member balances.
//!
//! `member_id` is the caller's external identity (a chat user id, for
//! example); the engine never interprets it. A negative balance means the
//! member owes the pool.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub pool_id: Uuid,
    pub member_id: String,
    pub display_name: String,
    pub balance: i64,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub(crate) fn new(pool_id: Uuid, member_id: String, display_name: String) -> Self {
        Self {
            pool_id,
            member_id,
            display_name,
            balance: 0,
            joined_at: Utc::now(),
        }
    }

    pub fn owes_pool(&self) -> bool {
        self.balance < 0
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub pool_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub member_id: String,
    pub display_name: String,
    pub balance: i64,
    pub joined_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pools::Entity",
        from = "Column::PoolId",
        to = "super::pools::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Pools,
}

impl Related<super::pools::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pools.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Member> for ActiveModel {
    fn from(member: &Member) -> Self {
        Self {
            pool_id: ActiveValue::Set(member.pool_id.to_string()),
            member_id: ActiveValue::Set(member.member_id.clone()),
            display_name: ActiveValue::Set(member.display_name.clone()),
            balance: ActiveValue::Set(member.balance),
            joined_at: ActiveValue::Set(member.joined_at),
        }
    }
}

impl TryFrom<Model> for Member {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            pool_id: parse_uuid(&model.pool_id, "pool")?,
            member_id: model.member_id,
            display_name: model.display_name,
            balance: model.balance,
            joined_at: model.joined_at,
        })
    }
}
