use sea_orm::{QueryFilter, QueryOrder, QuerySelect, prelude::*};
use uuid::Uuid;

use crate::{
    AuditEntry, EngineError, EntryStatus, LedgerEntry, MovementType, ResultEngine, audit,
    ledger_entries,
};

use super::Engine;

/// Filters for listing ledger entries of a pool.
#[derive(Clone, Debug, Default)]
pub struct EntryFilter {
    pub member_id: Option<String>,
    /// If present, acts as an allow-list of movement types.
    pub movement_types: Option<Vec<MovementType>>,
    pub status: Option<EntryStatus>,
    pub batch_id: Option<Uuid>,
    pub limit: Option<u64>,
}

impl EntryFilter {
    #[must_use]
    pub fn member(mut self, member_id: impl Into<String>) -> Self {
        self.member_id = Some(member_id.into());
        self
    }

    #[must_use]
    pub fn movement_types(mut self, types: impl IntoIterator<Item = MovementType>) -> Self {
        self.movement_types = Some(types.into_iter().collect());
        self
    }

    #[must_use]
    pub fn status(mut self, status: EntryStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn batch(mut self, batch_id: Uuid) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn into_entries(models: Vec<ledger_entries::Model>) -> ResultEngine<Vec<LedgerEntry>> {
    models.into_iter().map(LedgerEntry::try_from).collect()
}

impl Engine {
    pub async fn entry(&self, entry_id: Uuid) -> ResultEngine<LedgerEntry> {
        ledger_entries::Entity::find_by_id(entry_id.to_string())
            .one(&self.database)
            .await?
            .ok_or(EngineError::EntryNotFound(entry_id))
            .and_then(LedgerEntry::try_from)
    }

    /// Entries of a pool, newest first.
    pub async fn list_entries(
        &self,
        pool_id: Uuid,
        filter: &EntryFilter,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        if filter.movement_types.as_ref().is_some_and(Vec::is_empty) {
            return Err(EngineError::InvalidInput(
                "movement_types must not be empty".to_string(),
            ));
        }
        self.pool(pool_id).await?;

        let mut query = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::PoolId.eq(pool_id.to_string()));
        if let Some(member_id) = &filter.member_id {
            query = query.filter(ledger_entries::Column::MemberId.eq(member_id.as_str()));
        }
        if let Some(types) = &filter.movement_types {
            query = query.filter(
                ledger_entries::Column::MovementType.is_in(types.iter().map(|t| t.as_str())),
            );
        }
        if let Some(status) = filter.status {
            query = query.filter(ledger_entries::Column::Status.eq(status.as_str()));
        }
        if let Some(batch_id) = filter.batch_id {
            query = query.filter(ledger_entries::Column::BatchId.eq(batch_id.to_string()));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let models = query
            .order_by_desc(ledger_entries::Column::CreatedAt)
            .order_by_desc(ledger_entries::Column::Id)
            .all(&self.database)
            .await?;
        into_entries(models)
    }

    /// Approved group fees of a member that are still waiting to be settled,
    /// oldest first.
    pub async fn unsettled_group_fees(
        &self,
        pool_id: Uuid,
        member_id: &str,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        let models = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::PoolId.eq(pool_id.to_string()))
            .filter(ledger_entries::Column::MemberId.eq(member_id))
            .filter(ledger_entries::Column::MovementType.eq(MovementType::GroupFee.as_str()))
            .filter(ledger_entries::Column::Status.eq(EntryStatus::Approved.as_str()))
            .filter(ledger_entries::Column::SettledAt.is_null())
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .all(&self.database)
            .await?;
        into_entries(models)
    }

    /// Audit rows written for one ledger entry, in write order.
    pub async fn audit_trail(&self, entry_id: Uuid) -> ResultEngine<Vec<AuditEntry>> {
        audit::Entity::find()
            .filter(audit::Column::TargetEntryId.eq(entry_id.to_string()))
            .order_by_asc(audit::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(AuditEntry::try_from)
            .collect()
    }
}
