use chrono::{DateTime, TimeZone, Utc};

use super::{Category, Expense};

/// Starter records used to populate an empty store.
const SAMPLE_EXPENSES: [(&str, f64, Category, u32); 8] = [
    ("Pizza Dinner", 25.99, Category::Food, 10),
    ("Bus Ticket", 3.50, Category::Transport, 11),
    ("Electricity Bill", 125.75, Category::Utilities, 12),
    ("Movie Tickets", 18.00, Category::Entertainment, 13),
    ("Groceries", 67.40, Category::Shopping, 14),
    ("Doctor Visit", 85.00, Category::Health, 15),
    ("Online Course", 49.99, Category::Education, 16),
    ("Gas Station", 45.20, Category::Travel, 17),
];

fn sample_date(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, day, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn sample_expenses() -> Vec<Expense> {
    SAMPLE_EXPENSES
        .iter()
        .map(|&(name, amount, category, day)| Expense {
            id: Expense::generate_id(),
            name: name.to_string(),
            amount,
            category,
            date: sample_date(day),
            created_at: None,
        })
        .collect()
}
