use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use txpersist::config::PersistenceConfig;
use txpersist::model::{ManagedTx, TxStatus};
use txpersist::store::Direction;
use txpersist::DiskPersistence;

#[derive(Debug, Parser)]
#[command(version, author, about = "Managed-transaction persistence core demo")]
struct Args {
    /// Directory the log-structured store is opened in.
    #[clap(short = 'p', long = "path", default_value = "storage/txpersist")]
    store_path: String,

    #[clap(short = 'l', long, default_value = "info")]
    log_level: String,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a pending transaction.
    Create {
        id: String,
        from: String,
        nonce: u128,
    },
    /// Fetch a transaction by id.
    Get { id: String },
    /// List transactions still pending, oldest first.
    ListPending,
    /// List every transaction in creation order.
    ListByCreated,
    /// List every transaction for a signer, in nonce order.
    ListByNonce { signer: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_dir = format!("{}/.txpersist-demo", std::env::var("HOME").unwrap_or_else(|_| ".".to_string()));
    let _guards = txpersist::logging::init_logging(&log_dir, &args.log_level)
        .map_err(|err| anyhow::anyhow!("failed to initialize logging: {err}"))?;
    info!("txpersist-demo start args: {:?}", &args);

    let config = PersistenceConfig::new(&args.store_path);
    let store = DiskPersistence::open(config).context("failed to open persistence store")?;

    match args.cmd {
        Command::Create { id, from, nonce } => {
            let created = now_nanos();
            let tx = ManagedTx {
                id,
                sequence_id: String::new(),
                from,
                nonce,
                created,
                status: TxStatus::Pending,
                to: None,
                gas: None,
                value: None,
                receipt: None,
            };
            let written = store.create_transaction(tx)?;
            println!("{}", serde_json::to_string_pretty(&written)?);
        }
        Command::Get { id } => match store.get_transaction_by_id(&id)? {
            Some(tx) => println!("{}", serde_json::to_string_pretty(&tx)?),
            None => println!("not found"),
        },
        Command::ListPending => {
            let rows = store.list_transactions_pending(b"", 0, Direction::Ascending)?;
            print_rows(&rows)?;
        }
        Command::ListByCreated => {
            let rows = store.list_transactions_by_created(b"", 0, Direction::Ascending)?;
            print_rows(&rows)?;
        }
        Command::ListByNonce { signer } => {
            let rows = store.list_transactions_by_nonce(&signer, b"", 0, Direction::Ascending)?;
            print_rows(&rows)?;
        }
    }

    store.close()?;
    Ok(())
}

fn print_rows(rows: &[ManagedTx]) -> Result<()> {
    for row in rows {
        println!("{}", serde_json::to_string(row)?);
    }
    Ok(())
}

fn now_nanos() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos() as i64
}
