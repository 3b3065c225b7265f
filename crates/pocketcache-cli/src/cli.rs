use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pocketcache", version, about = "Cached JSON fetching and offline expense tracking")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch a JSON document, serving it from cache when a key is given
    Fetch {
        url: String,
        /// Cache key for the response
        #[arg(short, long)]
        key: Option<String>,
        /// Minimum time the network fetch should appear to take
        #[arg(long)]
        min_latency_ms: Option<u64>,
        /// Drop the cached entry first so the network is consulted
        #[arg(long)]
        refresh: bool,
    },
    /// Inspect or clear cached responses
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage expenses in the local database
    Expense {
        #[command(subcommand)]
        action: ExpenseAction,
    },
    /// Back up or restore expenses as a JSON file
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List cached keys with their age
    List,
    /// Remove one cached response
    Remove { key: String },
    /// Remove cached responses
    Clear {
        /// Wipe the whole cache store, not just fetched responses
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum ExpenseAction {
    /// Record a new expense dated now
    Add {
        name: String,
        amount: String,
        category: String,
    },
    /// List expenses, newest first
    List {
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Delete an expense by id
    Delete { id: String },
    /// Number of stored expenses
    Count,
    /// Sum of all expenses
    Total,
    /// Spending per category
    Breakdown,
    /// Insert sample expenses when the database is empty
    Seed,
    /// Delete every expense
    Clear,
}

#[derive(Subcommand)]
pub enum BackupAction {
    /// Write all expenses to the backup file
    Create,
    /// Replace the database contents with the backup file
    Restore,
    /// Check that the backup file looks usable
    Validate,
    /// Show backup file details
    Info,
    /// Delete the backup file
    Delete {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
