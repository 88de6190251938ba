use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Code of the placeholder category meaning "the user supplies a new name".
pub const SENTINEL_CODE: &str = "NUE";
pub const SENTINEL_NAME: &str = "Nueva Categoría";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub code: String,
}

impl Model {
    pub fn is_sentinel(&self) -> bool {
        self.code == SENTINEL_CODE
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::item::Entity")]
    Items,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
