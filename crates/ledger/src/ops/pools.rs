use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Actor, EngineError, Member, Pool, ResultEngine, members, pools, util::normalize_required,
};

use super::{Engine, with_tx};

impl Engine {
    /// Create a pool with a zero balance.
    pub async fn new_pool(&self, name: &str, actor: &Actor) -> ResultEngine<Uuid> {
        let name = normalize_required(name, "pool name")?;
        let pool = Pool::new(name, actor.id.clone());
        let model: pools::ActiveModel = (&pool).into();
        model.insert(&self.database).await?;
        info!(pool_id = %pool.id, name = %pool.name, actor = %actor.id, "pool created");
        Ok(pool.id)
    }

    /// Register a member of `pool_id` at balance 0.
    pub async fn add_member(
        &self,
        pool_id: Uuid,
        member_id: &str,
        display_name: &str,
    ) -> ResultEngine<()> {
        let member_id = normalize_required(member_id, "member id")?;
        let display_name = normalize_required(display_name, "display name")?;

        with_tx!(self, |db_tx| {
            if pools::Entity::find_by_id(pool_id.to_string())
                .one(&db_tx)
                .await?
                .is_none()
            {
                return Err(EngineError::PoolNotFound(pool_id));
            }
            let exists = members::Entity::find_by_id((pool_id.to_string(), member_id.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(member_id));
            }

            let member = Member::new(pool_id, member_id, display_name);
            let model: members::ActiveModel = (&member).into();
            model.insert(&db_tx).await?;
            info!(%pool_id, member_id = %member.member_id, "member added");
            Ok(())
        })
    }

    pub async fn pool(&self, pool_id: Uuid) -> ResultEngine<Pool> {
        pools::Entity::find_by_id(pool_id.to_string())
            .one(&self.database)
            .await?
            .ok_or(EngineError::PoolNotFound(pool_id))
            .and_then(Pool::try_from)
    }

    pub async fn member(&self, pool_id: Uuid, member_id: &str) -> ResultEngine<Member> {
        members::Entity::find_by_id((pool_id.to_string(), member_id.to_string()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::MemberNotFound(member_id.to_string()))
            .and_then(Member::try_from)
    }

    /// Members of a pool, ordered by join time.
    pub async fn list_members(&self, pool_id: Uuid) -> ResultEngine<Vec<Member>> {
        self.pool(pool_id).await?;
        members::Entity::find()
            .filter(members::Column::PoolId.eq(pool_id.to_string()))
            .order_by_asc(members::Column::JoinedAt)
            .order_by_asc(members::Column::MemberId)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Member::try_from)
            .collect()
    }
}
