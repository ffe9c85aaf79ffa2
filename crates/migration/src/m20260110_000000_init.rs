//! Initial schema for the treasury ledger.
//!
//! - `pools`: shared balances, one per organizational unit
//! - `members`: per-pool member balances, keyed by `(pool_id, member_id)`
//! - `ledger_entries`: one row per monetary movement
//! - `audit_log`: one row per mutating engine call

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Pools {
    Table,
    Id,
    Name,
    Balance,
    CreatedAt,
    CreatedBy,
}

#[derive(Iden)]
enum Members {
    Table,
    PoolId,
    MemberId,
    DisplayName,
    Balance,
    JoinedAt,
}

#[derive(Iden)]
enum LedgerEntries {
    Table,
    Id,
    PoolId,
    MemberId,
    MovementType,
    AmountMinor,
    Description,
    BatchId,
    Status,
    BalanceBefore,
    BalanceAfter,
    SettledAt,
    SettledByEntryId,
    CreatedAt,
    CreatedBy,
    ApprovedAt,
    ApprovedBy,
    RejectedAt,
    RejectedBy,
}

#[derive(Iden)]
enum AuditLog {
    Table,
    Id,
    PoolId,
    ActorId,
    ActorName,
    Action,
    TargetEntryId,
    Details,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Pools::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Pools::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Pools::Name).string().not_null())
                    .col(
                        ColumnDef::new(Pools::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Pools::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Pools::CreatedBy).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Members::PoolId).string().not_null())
                    .col(ColumnDef::new(Members::MemberId).string().not_null())
                    .col(ColumnDef::new(Members::DisplayName).string().not_null())
                    .col(
                        ColumnDef::new(Members::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Members::JoinedAt).timestamp().not_null())
                    .primary_key(Index::create().col(Members::PoolId).col(Members::MemberId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-members-pool_id")
                            .from(Members::Table, Members::PoolId)
                            .to(Pools::Table, Pools::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerEntries::PoolId).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::MemberId).string())
                    .col(
                        ColumnDef::new(LedgerEntries::MovementType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(LedgerEntries::BatchId).string())
                    .col(ColumnDef::new(LedgerEntries::Status).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::BalanceBefore).big_integer())
                    .col(ColumnDef::new(LedgerEntries::BalanceAfter).big_integer())
                    .col(ColumnDef::new(LedgerEntries::SettledAt).timestamp())
                    .col(ColumnDef::new(LedgerEntries::SettledByEntryId).string())
                    .col(
                        ColumnDef::new(LedgerEntries::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::CreatedBy).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::ApprovedAt).timestamp())
                    .col(ColumnDef::new(LedgerEntries::ApprovedBy).string())
                    .col(ColumnDef::new(LedgerEntries::RejectedAt).timestamp())
                    .col(ColumnDef::new(LedgerEntries::RejectedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger_entries-pool_id")
                            .from(LedgerEntries::Table, LedgerEntries::PoolId)
                            .to(Pools::Table, Pools::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-pool_id-created_at")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::PoolId)
                    .col(LedgerEntries::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-pool_id-member_id-batch_id")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::PoolId)
                    .col(LedgerEntries::MemberId)
                    .col(LedgerEntries::BatchId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuditLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLog::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLog::PoolId).string().not_null())
                    .col(ColumnDef::new(AuditLog::ActorId).string().not_null())
                    .col(ColumnDef::new(AuditLog::ActorName).string().not_null())
                    .col(ColumnDef::new(AuditLog::Action).string().not_null())
                    .col(ColumnDef::new(AuditLog::TargetEntryId).string().not_null())
                    .col(ColumnDef::new(AuditLog::Details).text().not_null())
                    .col(ColumnDef::new(AuditLog::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-audit_log-target_entry_id")
                    .table(AuditLog::Table)
                    .col(AuditLog::TargetEntryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Pools::Table).to_owned())
            .await?;
        Ok(())
    }
}
