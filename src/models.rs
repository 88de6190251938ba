use serde::{Deserialize, Serialize};

use crate::entities::item::Status;
use crate::entities::{category, item};
use crate::error::{StockError, StockResult};

pub const MAX_ITEM_NAME_LEN: usize = 200;
pub const MAX_CATEGORY_NAME_LEN: usize = 100;

fn default_quantity() -> i32 {
    1
}

/// Create/edit form for an item. `new_category_name` only matters when the
/// selected category is the "new category" placeholder.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemForm {
    pub name: String,
    pub category: i32,
    #[serde(default)]
    pub status: Status,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub new_category_name: Option<String>,
}

impl ItemForm {
    pub fn validate(&self) -> StockResult<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(StockError::validation("name", "name is required"));
        }
        if name.chars().count() > MAX_ITEM_NAME_LEN {
            return Err(StockError::validation(
                "name",
                format!("name must be at most {MAX_ITEM_NAME_LEN} characters"),
            ));
        }
        if self.quantity < 0 {
            return Err(StockError::validation("quantity", "quantity must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: item::Model,
    pub category: category::Model,
    pub status_label: &'static str,
}

impl ItemView {
    pub fn new(item: item::Model, category: category::Model) -> Self {
        let status_label = item.status.label();
        Self {
            item,
            category,
            status_label,
        }
    }
}

/// Result of a create/update; `new_category` is set when the save created one.
#[derive(Debug, Clone, Serialize)]
pub struct SavedItem {
    pub item: ItemView,
    pub new_category: Option<category::Model>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    pub code: String,
}

impl CategoryForm {
    /// Trimmed name and upper-cased code after validation.
    pub fn normalized(&self) -> StockResult<(String, String)> {
        let name = validate_category_name(&self.name)?;
        let code = self.code.trim().to_uppercase();
        let length = code.chars().count();
        if !(2..=3).contains(&length) || !code.chars().all(char::is_alphanumeric) {
            return Err(StockError::validation(
                "code",
                "code must be 2 or 3 letters or digits",
            ));
        }
        Ok((name, code))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRename {
    pub name: String,
}

pub fn validate_category_name(name: &str) -> StockResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StockError::validation("name", "name is required"));
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(StockError::validation(
            "name",
            format!("name must be at most {MAX_CATEGORY_NAME_LEN} characters"),
        ));
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub codes: Vec<String>,
    pub new_categories: Vec<category::Model>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddToInventory {
    pub quantity: Option<i32>,
    pub status: Option<Status>,
}
