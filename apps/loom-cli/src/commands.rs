//! Subcommand dispatch. Every command prints one JSON document on stdout.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::args::{Command, ListFilter, SaleArgs, StandaloneCommand, VariantArgs};
use loom_core::{
    NewRetailProduct, NewStandaloneSale, QuickSell, RestockVariant, RetailProductUpdate,
    SellVariant,
};
use loom_ledger::{LedgerError, LedgerService};

/// Why a command failed.
#[derive(Debug)]
pub enum Failure {
    /// The ledger rejected the operation; printed as JSON.
    Ledger(LedgerError),
    /// Anything else: bad input file, malformed JSON, I/O.
    Other(anyhow::Error),
}

impl From<LedgerError> for Failure {
    fn from(err: LedgerError) -> Self {
        Failure::Ledger(err)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        Failure::Other(err)
    }
}

/// Runs one command and returns its JSON output.
pub async fn run(ledger: &LedgerService, command: Command) -> Result<String, Failure> {
    debug!(?command, "Running command");

    match command {
        Command::Create { input } => {
            let input: NewRetailProduct = parse_json(&input)?;
            print(&ledger.create(input).await?)
        }
        Command::List { filter } => {
            let products = match filter {
                ListFilter::All => ledger.find_all().await?,
                ListFilter::Available => ledger.find_available().await?,
                ListFilter::Sold => ledger.find_sold().await?,
            };
            print(&products)
        }
        Command::Show { id } => print(&ledger.find_one(&id).await?),
        Command::Update { id, input } => {
            let update: RetailProductUpdate = parse_json(&input)?;
            print(&ledger.update(&id, update).await?)
        }
        Command::Remove { id } => {
            ledger.remove(&id).await?;
            print(&json!({ "removed": id }))
        }
        Command::Sell(args) => {
            let (id, sell) = sell_input(args);
            print(&ledger.sell_variant(&id, sell).await?)
        }
        Command::External(args) => {
            let (id, sell) = sell_input(args);
            print(&ledger.record_external_sale(&id, sell).await?)
        }
        Command::Restock { id, variant } => {
            let VariantArgs {
                size,
                color,
                quantity,
            } = variant;
            let restock = RestockVariant {
                size,
                color,
                quantity,
            };
            print(&ledger.restock_variant(&id, restock).await?)
        }
        Command::Return {
            product_id,
            sale_id,
        } => print(&ledger.return_sale(&product_id, &sale_id).await?),
        Command::Reprice {
            product_id,
            sale_id,
            price_cents,
        } => print(
            &ledger
                .update_sale_price(&product_id, &sale_id, price_cents)
                .await?,
        ),
        Command::QuickSell {
            category,
            variant,
            price_cents,
        } => {
            let input = QuickSell {
                category,
                size: variant.size,
                color: variant.color,
                quantity: variant.quantity,
                sold_price_cents: price_cents,
            };
            print(&ledger.quick_sell(input).await?)
        }
        Command::Sales => print(&ledger.get_all_sales().await?),
        Command::Report { id } => print(&ledger.get_sales_report(&id).await?),
        Command::Standalone(command) => run_standalone(ledger, command).await,
        Command::Import { path } => {
            let json = read_file(&path)?;
            print(&ledger.import_legacy(&json).await?)
        }
    }
}

async fn run_standalone(
    ledger: &LedgerService,
    command: StandaloneCommand,
) -> Result<String, Failure> {
    match command {
        StandaloneCommand::Create {
            category,
            variant,
            price_cents,
        } => {
            let input = NewStandaloneSale {
                category,
                size: variant.size,
                color: variant.color,
                quantity: variant.quantity,
                sold_price_cents: price_cents,
            };
            print(&ledger.create_standalone_sale(input).await?)
        }
        StandaloneCommand::List => print(&ledger.list_standalone_sales().await?),
        StandaloneCommand::Remove { id } => {
            let removed = ledger.remove_standalone_sale(&id).await?;
            print(&json!({ "id": id, "removed": removed }))
        }
    }
}

fn sell_input(args: SaleArgs) -> (String, SellVariant) {
    let sell = SellVariant {
        size: args.variant.size,
        color: args.variant.color,
        quantity: args.variant.quantity,
        sold_price_cents: args.price_cents,
    };
    (args.id, sell)
}

/// Parses inline JSON, or stdin when the argument is `-`.
fn parse_json<T: serde::de::DeserializeOwned>(input: &str) -> Result<T, Failure> {
    let text = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading JSON from stdin")?;
        buf
    } else {
        input.to_string()
    };

    let value: T = serde_json::from_str(&text).context("parsing JSON input")?;
    Ok(value)
}

fn read_file(path: &Path) -> Result<String, Failure> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(text)
}

fn print<T: Serialize>(value: &T) -> Result<String, Failure> {
    let out = serde_json::to_string_pretty(value).context("serializing output")?;
    Ok(out)
}
