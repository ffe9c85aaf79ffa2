use clap::Parser;
use ledger::{
    Actor, Engine, EngineError, EntryFilter, LedgerEntry, MoneyCents, TransferCmd,
    TransferReceipt,
};
use migration::{Migrator, MigratorTrait};

use cli::{Cli, Command, FeeCommand, MemberCommand, MovementArgs, PoolCommand};

mod cli;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "treasury={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    let url = cli
        .database_url
        .unwrap_or_else(|| settings.database.url());
    let db = connect_db(&url).await?;
    let engine = Engine::builder().database(db).build().await?;

    let actor = Actor::new(
        cli.actor_id.unwrap_or(settings.actor.id),
        cli.actor_name.unwrap_or(settings.actor.name),
    );

    if let Err(err) = run(&engine, actor, cli.command).await {
        if err.is_infrastructure() {
            tracing::error!("database failure: {err}");
        }
        eprintln!("error [{}]: {err}", err.error_code());
        if err.is_retryable() {
            eprintln!("balances changed while the command ran, run it again");
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn connect_db(
    database_url: &str,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let db = sea_orm::Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    tracing::debug!("schema up to date");
    Ok(db)
}

fn transfer_cmd(args: MovementArgs, actor: Actor) -> TransferCmd {
    let mut cmd = TransferCmd::new(args.pool, args.kind, args.amount.cents(), actor);
    if let Some(member) = args.member {
        cmd = cmd.member(member);
    }
    if let Some(description) = args.description {
        cmd = cmd.description(description);
    }
    cmd
}

fn print_receipt(receipt: &TransferReceipt) {
    println!("entry {}", receipt.entry_id);
    println!("pool balance: {}", MoneyCents::new(receipt.new_pool_balance));
    if let Some(balance) = receipt.new_member_balance {
        println!("member balance: {}", MoneyCents::new(balance));
    }
    if receipt.settled_fees > 0 {
        println!("group fees settled: {}", receipt.settled_fees);
    }
}

fn print_entry(entry: &LedgerEntry) {
    println!(
        "{}  {}  {:<10} {:>12}  {:<9} {:<12} {}",
        entry.created_at.format("%Y-%m-%d %H:%M"),
        entry.id,
        entry.movement_type,
        MoneyCents::new(entry.amount_minor).to_string(),
        entry.status,
        entry.member_id.as_deref().unwrap_or("-"),
        entry.description
    );
}

async fn run(engine: &Engine, actor: Actor, command: Command) -> Result<(), EngineError> {
    match command {
        Command::Migrate => println!("schema up to date"),
        Command::Pool(pool) => match pool.command {
            PoolCommand::Create { name } => {
                let pool_id = engine.new_pool(&name, &actor).await?;
                println!("created pool {pool_id}");
            }
            PoolCommand::Show { pool } => {
                let pool = engine.pool(pool).await?;
                println!("{} ({})", pool.name, pool.id);
                println!("balance: {}", MoneyCents::new(pool.balance));
                for member in engine.list_members(pool.id).await? {
                    println!(
                        "  {:<20} {:<24} {:>12}",
                        member.member_id,
                        member.display_name,
                        MoneyCents::new(member.balance).to_string()
                    );
                }
            }
        },
        Command::Member(member) => match member.command {
            MemberCommand::Add { pool, member, name } => {
                engine.add_member(pool, &member, &name).await?;
                println!("added member {member}");
            }
        },
        Command::Transfer(args) => {
            let receipt = engine.create_transfer(transfer_cmd(args, actor)).await?;
            print_receipt(&receipt);
        }
        Command::Request(args) => {
            let entry_id = engine.request_transfer(transfer_cmd(args, actor)).await?;
            println!("pending entry {entry_id}");
        }
        Command::Approve(args) => {
            let receipt = engine.approve_transfer(args.entry, actor).await?;
            print_receipt(&receipt);
        }
        Command::Reject(args) => {
            engine.reject_transfer(args.entry, actor).await?;
            println!("rejected entry {}", args.entry);
        }
        Command::Fee(fee) => match fee.command {
            FeeCommand::Issue {
                pool,
                amount,
                description,
                members,
            } => {
                let receipt = engine
                    .issue_group_fee(pool, amount.cents(), &description, &members, actor)
                    .await?;
                println!("batch {}", receipt.batch_id);
                println!("charged: {}", receipt.success_count);
                for (member_id, err) in &receipt.failures {
                    println!("  not charged {member_id}: {err}");
                }
            }
            FeeCommand::Waive {
                pool,
                member,
                batch,
            } => {
                let receipt = engine
                    .waive_group_fee_debt(pool, &member, batch, actor)
                    .await?;
                println!(
                    "waived {} on entry {}",
                    MoneyCents::new(receipt.amount_waived),
                    receipt.entry_id
                );
                println!("pool balance: {}", MoneyCents::new(receipt.new_pool_balance));
            }
        },
        Command::Entries(args) => {
            let mut filter = EntryFilter::default().limit(args.limit);
            if let Some(member) = args.member {
                filter = filter.member(member);
            }
            for entry in engine.list_entries(args.pool, &filter).await? {
                print_entry(&entry);
            }
        }
    }
    Ok(())
}
