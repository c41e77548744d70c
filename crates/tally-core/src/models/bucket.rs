//! Syncable data buckets and their parsed content

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::Error;

/// A single JSON object stored inside an array-shaped bucket.
pub type Record = Map<String, Value>;

/// Named category of persisted user data included in backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    Categories,
    Expenses,
    Incomes,
    Notes,
    Accounts,
    Jars,
    Budgets,
    RecurringPayments,
    FamilyMembers,
    SplitExpenses,
    Settings,
}

impl BucketKey {
    /// Every syncable bucket, in collection order.
    pub const ALL: [Self; 11] = [
        Self::Categories,
        Self::Expenses,
        Self::Incomes,
        Self::Notes,
        Self::Accounts,
        Self::Jars,
        Self::Budgets,
        Self::RecurringPayments,
        Self::FamilyMembers,
        Self::SplitExpenses,
        Self::Settings,
    ];

    /// Storage key used locally and inside the snapshot `data` map.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Expenses => "expenses",
            Self::Incomes => "incomes",
            Self::Notes => "notes",
            Self::Accounts => "accounts",
            Self::Jars => "jars",
            Self::Budgets => "budgets",
            Self::RecurringPayments => "recurring_payments",
            Self::FamilyMembers => "family_members",
            Self::SplitExpenses => "split_expenses",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketKey {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| Error::InvalidInput(format!("unknown bucket '{value}'")))
    }
}

/// Bucket content after an explicit parse-and-classify step.
#[derive(Debug, Clone, PartialEq)]
pub enum BucketContent {
    /// Anything that is not a JSON array of objects, kept verbatim.
    Opaque(String),
    /// A JSON array whose every element is an object.
    Records(Vec<Record>),
}

impl BucketContent {
    pub fn parse(raw: &str) -> Self {
        let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) else {
            return Self::Opaque(raw.to_string());
        };

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Object(record) => records.push(record),
                _ => return Self::Opaque(raw.to_string()),
            }
        }
        Self::Records(records)
    }

    pub fn into_records(self) -> Option<Vec<Record>> {
        match self {
            Self::Records(records) => Some(records),
            Self::Opaque(_) => None,
        }
    }
}

/// Identity of a record used when merging two record lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Id(String),
    Name(String),
    Full(String),
}

impl RecordKey {
    /// Identity from `id`, then `name`, then the record's serialized form.
    ///
    /// `null` and empty-string values do not count as an identity.
    pub fn of(record: &Record) -> Self {
        if let Some(id) = identity_field(record, "id") {
            return Self::Id(id);
        }
        if let Some(name) = identity_field(record, "name") {
            return Self::Name(name);
        }
        Self::Full(Value::Object(record.clone()).to_string())
    }
}

fn identity_field(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::Null => None,
        Value::String(value) if value.is_empty() => None,
        value => Some(value.to_string()),
    }
}
