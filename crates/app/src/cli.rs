use clap::{Args, Parser, Subcommand};
use ledger::{MoneyCents, MovementType};
use uuid::Uuid;

use crate::settings::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(name = "treasury")]
#[command(about = "Operator tool for the group treasury ledger")]
pub struct Cli {
    /// Settings file (TOML, extension optional).
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Database connection string, overrides the `database` setting.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Actor id recorded on entries and audit rows.
    #[arg(long)]
    pub actor_id: Option<String>,

    #[arg(long)]
    pub actor_name: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply pending schema migrations and exit.
    Migrate,
    Pool(Pool),
    Member(Member),
    /// Apply a movement immediately.
    Transfer(MovementArgs),
    /// Record a movement for later approval.
    Request(MovementArgs),
    Approve(EntryArgs),
    Reject(EntryArgs),
    Fee(Fee),
    /// List recent ledger entries of a pool.
    Entries(EntriesArgs),
}

#[derive(Args, Debug)]
pub struct Pool {
    #[command(subcommand)]
    pub command: PoolCommand,
}

#[derive(Subcommand, Debug)]
pub enum PoolCommand {
    Create {
        #[arg(long)]
        name: String,
    },
    /// Pool balance and member balances.
    Show {
        #[arg(long)]
        pool: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct Member {
    #[command(subcommand)]
    pub command: MemberCommand,
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    Add {
        #[arg(long)]
        pool: Uuid,
        #[arg(long)]
        member: String,
        #[arg(long)]
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct MovementArgs {
    #[arg(long)]
    pub pool: Uuid,
    /// income, expense, loan, repayment, deposit or group_fee.
    #[arg(long)]
    pub kind: MovementType,
    /// Amount in major units, e.g. `12.50`.
    #[arg(long, allow_hyphen_values = true)]
    pub amount: MoneyCents,
    #[arg(long)]
    pub member: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct EntryArgs {
    #[arg(long)]
    pub entry: Uuid,
}

#[derive(Args, Debug)]
pub struct Fee {
    #[command(subcommand)]
    pub command: FeeCommand,
}

#[derive(Subcommand, Debug)]
pub enum FeeCommand {
    /// Charge every listed member the same amount under one batch.
    Issue {
        #[arg(long)]
        pool: Uuid,
        #[arg(long)]
        amount: MoneyCents,
        #[arg(long)]
        description: String,
        #[arg(long = "member", required = true, num_args = 1..)]
        members: Vec<String>,
    },
    /// Cancel a member's unpaid share of a batch.
    Waive {
        #[arg(long)]
        pool: Uuid,
        #[arg(long)]
        member: String,
        #[arg(long)]
        batch: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct EntriesArgs {
    #[arg(long)]
    pub pool: Uuid,
    #[arg(long)]
    pub member: Option<String>,
    #[arg(long, default_value_t = 20)]
    pub limit: u64,
}
