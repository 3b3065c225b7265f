use std::io::{self, BufRead, Write};

use anyhow::Result;

use pocketcache_core::backup::{BackupError, BackupInfo, DeleteOutcome};
use pocketcache_core::utils::format_kb;
use pocketcache_core::Config;

use super::expense::open_tracker;
use crate::cli::BackupAction;

pub async fn run(config: &Config, action: BackupAction) -> Result<()> {
    match action {
        BackupAction::Create => {
            let tracker = open_tracker(config).await?;
            let result = tracker.backup_all().await;
            tracker.store().close().await;
            let receipt = result?;
            println!(
                "{} expenses backed up to {} ({})",
                receipt.count,
                receipt.path.display(),
                format_kb(receipt.size_bytes)
            );
        }
        BackupAction::Restore => {
            let tracker = open_tracker(config).await?;
            let result = tracker.restore_into_store().await;
            tracker.store().close().await;
            let restored = result?;
            println!(
                "{} expenses restored (backup from {}, version {})",
                restored.expenses.len(),
                restored.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                restored.version
            );
        }
        BackupAction::Validate => {
            let tracker = config.expense_tracker()?;
            if tracker.backups().validate() {
                println!("Backup file is valid");
            } else {
                anyhow::bail!("No valid backup at {}", tracker.backups().path().display());
            }
        }
        BackupAction::Info => {
            let tracker = config.expense_tracker()?;
            let info = tracker.backups().info()?;
            if !info.exists {
                return Err(BackupError::NotFound.into());
            }
            println!("File:     {}", tracker.backups().path().display());
            print_info(&info);
        }
        BackupAction::Delete { yes } => {
            let tracker = config.expense_tracker()?;
            let outcome = tracker
                .backups()
                .delete(|info| yes || confirm_delete(info))?;
            match outcome {
                DeleteOutcome::NotFound => println!("No backup file exists to delete"),
                DeleteOutcome::Cancelled => println!("Kept the backup"),
                DeleteOutcome::Deleted => println!("Backup file deleted"),
            }
        }
    }
    Ok(())
}

fn print_info(info: &BackupInfo) {
    let unknown = || "unknown".to_string();
    println!("Size:     {}", info.size_bytes.map(format_kb).unwrap_or_else(unknown));
    println!(
        "Modified: {}",
        info.modified
            .map(|m| m.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(unknown)
    );
    println!(
        "Expenses: {}",
        info.total_expenses.map(|n| n.to_string()).unwrap_or_else(unknown)
    );
    println!("Version:  {}", info.version.clone().unwrap_or_else(unknown));
}

fn confirm_delete(info: &BackupInfo) -> bool {
    print_info(info);
    print!("Delete this backup? This cannot be undone [y/N]: ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
