//! Read-mostly reference catalog of standard parts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "standard_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// External code of the feed the entry came from.
    #[sea_orm(unique)]
    pub code: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: String,
    pub sub_category: String,
    pub unit: String,
    /// JSON array of strings.
    pub keywords: Json,
    #[sea_orm(column_type = "Text")]
    pub notes: String,
    /// Source tag, e.g. `IMPA`.
    pub catalog: String,
}

impl Model {
    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| value.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
