use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transport,
    Utilities,
    Entertainment,
    Shopping,
    Health,
    Education,
    Travel,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Food,
        Category::Transport,
        Category::Utilities,
        Category::Entertainment,
        Category::Shopping,
        Category::Health,
        Category::Education,
        Category::Travel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Utilities => "Utilities",
            Category::Entertainment => "Entertainment",
            Category::Shopping => "Shopping",
            Category::Health => "Health",
            Category::Education => "Education",
            Category::Travel => "Travel",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValidationError::UnknownCategory(trimmed.to_string()))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Expense name cannot be empty")]
    EmptyName,

    #[error("Amount must be a number greater than zero, got {0}")]
    InvalidAmount(String),

    #[error("Unknown category: {0} (expected one of Food, Transport, Utilities, Entertainment, Shopping, Health, Education, Travel)")]
    UnknownCategory(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub category: Category,
    pub date: DateTime<Utc>,
    /// Assigned by the store on insert; absent for records not yet stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Expense {
    /// Generate a fresh collision-resistant identifier
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && self.amount.is_finite() && self.amount > 0.0
    }

    /// Equality on the user-visible fields, ignoring `created_at`.
    pub fn same_record(&self, other: &Expense) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.amount == other.amount
            && self.category == other.category
            && self.date == other.date
    }
}

/// A validated-on-build expense that has no identifier yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub name: String,
    pub amount: f64,
    pub category: Category,
    pub date: Option<DateTime<Utc>>,
}

impl NewExpense {
    pub fn new(name: &str, amount: f64, category: Category) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ValidationError::InvalidAmount(amount.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            amount,
            category,
            date: None,
        })
    }

    /// Build from raw form input, e.g. command line arguments.
    pub fn parse(name: &str, amount: &str, category: &str) -> Result<Self, ValidationError> {
        let parsed: f64 = amount
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidAmount(amount.trim().to_string()))?;
        Self::new(name, parsed, category.parse()?)
    }

    pub fn on(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Assign an identifier, dating the expense now unless a date was given.
    pub fn into_expense(self) -> Expense {
        Expense {
            id: Expense::generate_id(),
            name: self.name,
            amount: self.amount,
            category: self.category,
            date: self.date.unwrap_or_else(Utc::now),
            created_at: None,
        }
    }
}
