use anyhow::Result;

use pocketcache_core::models::{Category, Expense, NewExpense};
use pocketcache_core::utils::truncate_string;
use pocketcache_core::{Config, ExpenseTracker};

use crate::cli::ExpenseAction;

/// Open the tracker and bring its store to the ready state
pub async fn open_tracker(config: &Config) -> Result<ExpenseTracker> {
    let tracker = config.expense_tracker()?;
    tracker.store().init().await?;
    Ok(tracker)
}

pub async fn run(config: &Config, action: ExpenseAction) -> Result<()> {
    let tracker = open_tracker(config).await?;
    let result = execute(&tracker, action).await;
    tracker.store().close().await;
    result
}

async fn execute(tracker: &ExpenseTracker, action: ExpenseAction) -> Result<()> {
    let store = tracker.store();

    match action {
        ExpenseAction::Add {
            name,
            amount,
            category,
        } => {
            let draft = NewExpense::parse(&name, &amount, &category)?;
            let expense = tracker.add(draft).await?;
            println!("Added {} ({})", expense.name, expense.id);
        }
        ExpenseAction::List { category } => {
            let expenses = match category {
                Some(category) => store.get_by_category(category.parse::<Category>()?).await?,
                None => store.get_all().await?,
            };
            if expenses.is_empty() {
                println!("No expenses yet");
            }
            for expense in &expenses {
                print_expense(expense);
            }
        }
        ExpenseAction::Delete { id } => {
            store.delete(&id).await?;
            println!("Deleted {}", id);
        }
        ExpenseAction::Count => println!("{}", store.count().await?),
        ExpenseAction::Total => println!("{:.2}", store.total_amount().await?),
        ExpenseAction::Breakdown => {
            for slice in tracker.category_breakdown().await? {
                println!(
                    "{:<14} {:>10.2} {:>5.1}%",
                    slice.category, slice.amount, slice.percentage
                );
            }
        }
        ExpenseAction::Seed => {
            let added = tracker.seed_if_empty().await?;
            if added == 0 {
                println!("Database already has expenses, nothing seeded");
            } else {
                println!("Seeded {} sample expenses", added);
            }
        }
        ExpenseAction::Clear => {
            store.clear_all().await?;
            println!("All expenses deleted");
        }
    }
    Ok(())
}

fn print_expense(expense: &Expense) {
    println!(
        "{}  {:<24} {:<14} {:>10.2}  {}",
        expense.id,
        truncate_string(&expense.name, 24),
        expense.category,
        expense.amount,
        expense.date.format("%b %d, %Y")
    );
}
