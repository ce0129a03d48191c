//! Command line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Retail inventory and sales ledger.
#[derive(Debug, Parser)]
#[command(name = "loom", version, about, long_about = None)]
pub struct Cli {
    /// SQLite database file. Overrides LOOM_DATABASE_PATH.
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a product from JSON (inline, or `-` for stdin)
    Create {
        input: String,
    },

    /// List products
    List {
        #[arg(long, value_enum, default_value_t = ListFilter::All)]
        filter: ListFilter,
    },

    /// Show one product
    Show {
        id: String,
    },

    /// Apply a partial update from JSON (inline, or `-` for stdin)
    Update {
        id: String,
        input: String,
    },

    /// Delete a product and its ledger
    Remove {
        id: String,
    },

    /// Sell units of a variant
    Sell(SaleArgs),

    /// Record a sale made outside the shop's stock
    External(SaleArgs),

    /// Put sold units back on the shelf
    Restock {
        id: String,
        #[command(flatten)]
        variant: VariantArgs,
    },

    /// Undo a sale record
    Return {
        product_id: String,
        sale_id: String,
    },

    /// Correct the price of a sale record
    Reprice {
        product_id: String,
        sale_id: String,
        #[arg(long)]
        price_cents: i64,
    },

    /// Create a one-variant product and sell all of it
    QuickSell {
        #[arg(long)]
        category: String,
        #[command(flatten)]
        variant: VariantArgs,
        #[arg(long)]
        price_cents: i64,
    },

    /// Every sale record across products, newest first
    Sales,

    /// Sales report for one product
    Report {
        id: String,
    },

    /// Point-of-sale records without a product
    #[command(subcommand)]
    Standalone(StandaloneCommand),

    /// Import exported retail product documents (JSON array file)
    Import {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ListFilter {
    All,
    Available,
    Sold,
}

#[derive(Debug, Args)]
pub struct VariantArgs {
    #[arg(long)]
    pub size: String,
    #[arg(long)]
    pub color: String,
    #[arg(long)]
    pub quantity: i64,
}

#[derive(Debug, Args)]
pub struct SaleArgs {
    pub id: String,
    #[command(flatten)]
    pub variant: VariantArgs,
    /// Defaults to the product's list price
    #[arg(long)]
    pub price_cents: Option<i64>,
}

#[derive(Debug, Subcommand)]
pub enum StandaloneCommand {
    /// Record a sale
    Create {
        #[arg(long)]
        category: String,
        #[command(flatten)]
        variant: VariantArgs,
        #[arg(long)]
        price_cents: i64,
    },

    /// List sales, newest first
    List,

    /// Delete a sale
    Remove {
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sell() {
        let cli = Cli::try_parse_from([
            "loom", "sell", "p-1", "--size", "M", "--color", "Black", "--quantity", "2",
        ])
        .unwrap();

        match cli.command {
            Command::Sell(args) => {
                assert_eq!(args.id, "p-1");
                assert_eq!(args.variant.quantity, 2);
                assert_eq!(args.price_cents, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_database() {
        let cli = Cli::try_parse_from(["loom", "list", "--filter", "sold", "--database", "x.db"])
            .unwrap();
        assert_eq!(cli.database, Some(PathBuf::from("x.db")));
        assert!(matches!(
            cli.command,
            Command::List {
                filter: ListFilter::Sold
            }
        ));
    }
}
