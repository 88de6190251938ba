//! Bulk item import from spreadsheet rows.
//!
//! Every row of an upload is written inside one transaction: a single bad
//! row rolls back all items and auto-created categories of that upload.

mod table;

pub use table::{Cell, Table};

use sea_orm::{ConnectionTrait, TransactionTrait};
use tracing::{info, warn};

use crate::codes::{self, NewItem};
use crate::entities::{category, item};
use crate::error::StockResult;
use crate::qr::QrGenerator;

pub const COLUMN_NAME: &str = "Elemento";
pub const COLUMN_CATEGORY: &str = "Categoría";
pub const COLUMN_STATUS: &str = "Estado";
pub const COLUMN_QUANTITY: &str = "Cantidad";
pub const COLUMN_DESCRIPTION: &str = "Descripción";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    COLUMN_NAME,
    COLUMN_CATEGORY,
    COLUMN_STATUS,
    COLUMN_QUANTITY,
    COLUMN_DESCRIPTION,
];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("cannot read spreadsheet: {0}")]
    UnreadableFile(String),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {line}: {message}")]
    Row { line: usize, message: String },
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    name: usize,
    category: usize,
    status: usize,
    quantity: usize,
    description: usize,
}

fn locate_columns(table: &Table) -> Result<Columns, ImportError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| table.column(column).is_none())
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    let index = |name: &str| table.column(name).unwrap_or_default();
    Ok(Columns {
        name: index(COLUMN_NAME),
        category: index(COLUMN_CATEGORY),
        status: index(COLUMN_STATUS),
        quantity: index(COLUMN_QUANTITY),
        description: index(COLUMN_DESCRIPTION),
    })
}

#[derive(Debug, Clone, PartialEq)]
struct ImportRow {
    name: String,
    category: String,
    status: item::Status,
    quantity: i32,
    description: String,
}

fn parse_row(columns: Columns, line: usize, cells: &[Cell]) -> Result<ImportRow, ImportError> {
    const EMPTY: &Cell = &Cell::Empty;
    let cell = |index: usize| cells.get(index).unwrap_or(EMPTY);
    let row_error = |message: String| ImportError::Row { line, message };

    let name = cell(columns.name).text();
    if name.is_empty() {
        return Err(row_error(format!("{COLUMN_NAME} is empty")));
    }
    let category = cell(columns.category).text();
    if category.is_empty() {
        return Err(row_error(format!("{COLUMN_CATEGORY} is empty")));
    }

    Ok(ImportRow {
        name,
        category,
        status: item::Status::from_import_label(&cell(columns.status).text()),
        quantity: parse_quantity(cell(columns.quantity)).map_err(row_error)?,
        description: cell(columns.description).text(),
    })
}

/// Integer cells as-is, floats truncated toward zero, text parsed as an
/// integer. Blank, negative or non-numeric values are rejected.
pub fn parse_quantity(cell: &Cell) -> Result<i32, String> {
    let value = match cell {
        Cell::Int(value) => *value,
        Cell::Float(value) if value.is_finite() => value.trunc() as i64,
        Cell::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid quantity {:?}", text.trim()))?,
        Cell::Empty => return Err("quantity is missing".to_string()),
        other => return Err(format!("invalid quantity {:?}", other.text())),
    };
    if value < 0 {
        return Err(format!("quantity must not be negative, got {value}"));
    }
    i32::try_from(value).map_err(|_| format!("quantity {value} is too large"))
}

/// What one successful upload wrote.
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub items: Vec<item::Model>,
    pub new_categories: Vec<category::Model>,
}

/// Validates the header row, then creates one item per non-blank row in a
/// single transaction.
pub async fn import_table<C>(db: &C, qr: &QrGenerator, table: &Table) -> StockResult<ImportOutcome>
where
    C: ConnectionTrait + TransactionTrait,
{
    let columns = locate_columns(table)?;

    let txn = db.begin().await?;
    match import_rows(&txn, qr, columns, table).await {
        Ok(outcome) => {
            txn.commit().await?;
            info!(
                items = outcome.items.len(),
                categories = outcome.new_categories.len(),
                "import committed"
            );
            Ok(outcome)
        }
        Err(err) => {
            txn.rollback().await?;
            warn!(error = %err, "import rolled back");
            Err(err)
        }
    }
}

async fn import_rows<C>(
    db: &C,
    qr: &QrGenerator,
    columns: Columns,
    table: &Table,
) -> StockResult<ImportOutcome>
where
    C: ConnectionTrait + TransactionTrait,
{
    let mut outcome = ImportOutcome::default();
    for (index, cells) in table.rows.iter().enumerate() {
        if cells.iter().all(Cell::is_blank) {
            continue;
        }
        // Line 1 holds the headers.
        let row = parse_row(columns, index + 2, cells)?;

        let resolved = codes::resolve_category(db, &row.category).await?;
        if resolved.created {
            outcome.new_categories.push(resolved.category.clone());
        }

        let new = NewItem {
            name: row.name,
            status: row.status,
            quantity: row.quantity,
            description: row.description,
        };
        let created = codes::insert_item(db, &resolved.category, new).await?;
        outcome.items.push(qr.attach(db, created).await?);
    }
    Ok(outcome)
}
