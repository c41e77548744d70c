use std::io::{self, IsTerminal, Read};

use serde::Serialize;
use tally_core::storage::{JsonFileStore, LocalData};
use tally_core::{BucketContent, BucketKey};

use crate::commands::common::{open_local, parse_bucket_key, CliContext};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct BucketListItem {
    pub name: &'static str,
    pub populated: bool,
    pub bytes: usize,
    pub records: Option<usize>,
}

pub fn list_buckets(local: &LocalData<JsonFileStore>) -> Result<Vec<BucketListItem>, CliError> {
    let mut items = Vec::with_capacity(BucketKey::ALL.len());
    for key in BucketKey::ALL {
        let value = local.read_bucket(key)?;
        let records = value
            .as_deref()
            .and_then(|raw| BucketContent::parse(raw).into_records())
            .map(|records| records.len());
        items.push(BucketListItem {
            name: key.as_str(),
            populated: value.is_some(),
            bytes: value.as_ref().map_or(0, String::len),
            records,
        });
    }
    Ok(items)
}

pub fn format_bucket_line(item: &BucketListItem) -> String {
    if !item.populated {
        return format!("{:<20} (empty)", item.name);
    }
    match item.records {
        Some(count) => format!("{:<20} {count} records", item.name),
        None => format!("{:<20} {} bytes", item.name, item.bytes),
    }
}

pub fn run_bucket_list(context: &CliContext, as_json: bool) -> Result<(), CliError> {
    let local = open_local(&context.store_path)?;
    let items = list_buckets(&local)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for item in &items {
            println!("{}", format_bucket_line(item));
        }
    }
    Ok(())
}

pub fn run_bucket_get(context: &CliContext, name: &str) -> Result<(), CliError> {
    let key = parse_bucket_key(name)?;
    let local = open_local(&context.store_path)?;
    let value = local
        .read_bucket(key)?
        .ok_or_else(|| CliError::EmptyBucket(key.to_string()))?;
    println!("{value}");
    Ok(())
}

pub fn run_bucket_set(
    context: &CliContext,
    name: &str,
    value: Option<&str>,
) -> Result<(), CliError> {
    let key = parse_bucket_key(name)?;
    let raw = match value {
        Some(value) if value != "-" => value.to_string(),
        _ => read_stdin_value()?,
    };
    let value = normalize_bucket_value(&raw)?;

    let local = open_local(&context.store_path)?;
    local.write_bucket(key, &value)?;
    println!("Updated {key}");
    Ok(())
}

pub fn run_bucket_remove(context: &CliContext, name: &str) -> Result<(), CliError> {
    let key = parse_bucket_key(name)?;
    let local = open_local(&context.store_path)?;
    local.remove_bucket(key)?;
    println!("Removed {key}");
    Ok(())
}

/// Validate bucket JSON and store it compactly.
pub fn normalize_bucket_value(raw: &str) -> Result<String, CliError> {
    let parsed = serde_json::from_str::<serde_json::Value>(raw.trim())
        .map_err(|error| CliError::InvalidBucketValue(error.to_string()))?;
    Ok(parsed.to_string())
}

fn read_stdin_value() -> Result<String, CliError> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(CliError::InvalidBucketValue(
            "no value given; pass it as an argument or pipe it on stdin".to_string(),
        ));
    }
    let mut buffer = String::new();
    stdin.read_to_string(&mut buffer)?;
    Ok(buffer)
}
