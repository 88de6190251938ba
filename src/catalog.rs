//! Reference catalog of standard parts and its offline feed import.
//!
//! Feeds come in three shapes: a JSON array, a JSON object holding the
//! entries under one list-valued field, or JSON Lines. Entries that are not
//! objects or lack the external code are skipped with a warning.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

use crate::entities::standard_item;
use crate::error::StockResult;
use crate::storage::contains_any;

pub const CATALOG_TAG: &str = "IMPA";
pub const CODE_FIELD: &str = "impa_code";
pub const PAGE_SIZE: u64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed is empty")]
    Empty,
    #[error("cannot read feed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON feed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("the JSON array feed is not an array")]
    NotAnArray,
    #[error("no list found inside the JSON object")]
    NoList,
}

/// Splits feed text into entries. Only a structurally unusable document is
/// an error; bad JSON Lines are skipped.
pub fn parse_feed(content: &str) -> Result<Vec<Value>, FeedError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(FeedError::Empty);
    }

    if content.starts_with('[') {
        return match serde_json::from_str(content)? {
            Value::Array(entries) => Ok(entries),
            _ => Err(FeedError::NotAnArray),
        };
    }

    if content.starts_with('{') {
        // A JSON Lines file also starts with '{'; it only parses line by line.
        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(content) {
            return entries_of_object(object);
        }
    }

    Ok(parse_json_lines(content))
}

fn entries_of_object(object: Map<String, Value>) -> Result<Vec<Value>, FeedError> {
    let mut lists = object.into_iter().filter(|(_, value)| value.is_array());
    let Some((key, Value::Array(entries))) = lists.next() else {
        return Err(FeedError::NoList);
    };
    let ignored: Vec<String> = lists.map(|(other, _)| other).collect();
    if ignored.is_empty() {
        info!(key = %key, "using the list under key");
    } else {
        warn!(key = %key, ?ignored, "several lists in feed object, using the first");
    }
    Ok(entries)
}

fn parse_json_lines(content: &str) -> Vec<Value> {
    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value @ Value::Object(_)) => entries.push(value),
            Ok(_) => warn!(line = index + 1, "not an object, skipped"),
            Err(err) => warn!(line = index + 1, error = %err, "invalid JSON, skipped"),
        }
    }
    entries
}

/// One catalog entry as read from a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub code: String,
    pub description: String,
    pub category: String,
    pub sub_category: String,
    pub unit: String,
    pub keywords: Vec<String>,
    pub notes: String,
}

impl FeedEntry {
    /// `None` when the external code is missing or empty.
    pub fn from_object(object: &Map<String, Value>) -> Option<Self> {
        let code = match object.get(CODE_FIELD)? {
            Value::String(code) if !code.trim().is_empty() => code.trim().to_string(),
            Value::Number(number) if number.as_f64() != Some(0.0) => number.to_string(),
            _ => return None,
        };
        let keywords = match object.get("keywords") {
            Some(Value::Array(values)) => values.iter().filter_map(text_of).collect(),
            Some(value) => text_of(value).into_iter().collect(),
            None => Vec::new(),
        };
        let field = |name: &str| object.get(name).and_then(text_of).unwrap_or_default();
        Some(Self {
            code,
            description: field("description"),
            category: field("category"),
            sub_category: field("sub_category"),
            unit: field("unit"),
            keywords,
            notes: field("notes"),
        })
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Inserts or refreshes each entry, keyed by its external code.
pub async fn upsert_entries<C>(db: &C, entries: &[Value]) -> StockResult<FeedSummary>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let mut summary = FeedSummary::default();

    for (index, value) in entries.iter().enumerate() {
        let Some(object) = value.as_object() else {
            warn!(index, "entry is not an object, skipped");
            summary.skipped += 1;
            continue;
        };
        let Some(entry) = FeedEntry::from_object(object) else {
            warn!(index, field = CODE_FIELD, "entry has no code, skipped");
            summary.skipped += 1;
            continue;
        };

        let existing = standard_item::Entity::find()
            .filter(standard_item::Column::Code.eq(entry.code.as_str()))
            .one(&txn)
            .await?;
        let created = existing.is_none();
        let mut active = match existing {
            Some(found) => found.into_active_model(),
            None => standard_item::ActiveModel {
                code: Set(entry.code.clone()),
                ..ActiveModelTrait::default()
            },
        };
        active.description = Set(entry.description);
        active.category = Set(entry.category);
        active.sub_category = Set(entry.sub_category);
        active.unit = Set(entry.unit);
        active.keywords = Set(Value::from(entry.keywords));
        active.notes = Set(entry.notes);
        active.catalog = Set(CATALOG_TAG.to_string());

        if created {
            active.insert(&txn).await?;
            summary.created += 1;
        } else {
            active.update(&txn).await?;
            summary.updated += 1;
        }
    }

    txn.commit().await?;
    Ok(summary)
}

pub async fn import_feed_file<C>(db: &C, path: &Path) -> StockResult<FeedSummary>
where
    C: ConnectionTrait + TransactionTrait,
{
    let content = tokio::fs::read_to_string(path).await.map_err(FeedError::from)?;
    let entries = parse_feed(&content)?;
    let summary = upsert_entries(db, &entries).await?;
    info!(
        path = %path.display(),
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        "catalog import finished"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub items: Vec<standard_item::Model>,
    pub page: u64,
    pub total_pages: u64,
}

/// Page `page` (0-based) of the catalog ordered by code.
pub async fn list_catalog<C: ConnectionTrait>(
    db: &C,
    query: Option<&str>,
    page: u64,
) -> StockResult<CatalogPage> {
    let mut select = standard_item::Entity::find().order_by_asc(standard_item::Column::Code);
    if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
        select = select.filter(contains_any(
            &[
                standard_item::Column::Code,
                standard_item::Column::Description,
                standard_item::Column::Category,
            ],
            query,
        ));
    }
    let paginator = select.paginate(db, PAGE_SIZE);
    let total_pages = paginator.num_pages().await?;
    let items = paginator.fetch_page(page).await?;
    Ok(CatalogPage {
        items,
        page,
        total_pages,
    })
}

pub async fn find_standard_item<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> StockResult<Option<standard_item::Model>> {
    Ok(standard_item::Entity::find()
        .filter(standard_item::Column::Code.eq(code))
        .one(db)
        .await?)
}
