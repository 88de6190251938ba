use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// `<category code>-<11 digits>`, written once at insert time.
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub category_id: i32,
    pub status: Status,
    pub quantity: i32,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub created_at: DateTimeWithTimeZone,
    /// URL encoded in the QR artifact.
    pub qr_target: Option<String>,
    /// PNG bytes of the QR artifact.
    #[serde(skip)]
    pub qr_code: Option<Vec<u8>>,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    #[sea_orm(string_value = "FUNCIONAL")]
    Funcional,
    #[sea_orm(string_value = "AVERIADO")]
    Averiado,
    #[sea_orm(string_value = "OBSOLETO")]
    Obsoleto,
    #[sea_orm(string_value = "VENTA")]
    Venta,
    #[sea_orm(string_value = "DESCARTE")]
    Descarte,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Funcional => "Funcional",
            Status::Averiado => "Averiado",
            Status::Obsoleto => "Obsoleto",
            Status::Venta => "Apto para venta",
            Status::Descarte => "Apto para descarte",
        }
    }

    /// Maps a spreadsheet status label. Unknown labels fall back to
    /// [`Status::Funcional`].
    pub fn from_import_label(label: &str) -> Self {
        match capitalize(label.trim()).as_str() {
            "Averiado" => Status::Averiado,
            "Obsoleto" => Status::Obsoleto,
            "Venta" => Status::Venta,
            "Descarte" => Status::Descarte,
            _ => Status::Funcional,
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert && self.created_at.is_not_set() {
            self.created_at = Set(chrono::Utc::now().into());
        }
        if let Set(quantity) = &self.quantity {
            if *quantity < 0 {
                return Err(DbErr::Custom(format!(
                    "quantity must be non-negative, got {quantity}"
                )));
            }
        }
        Ok(self)
    }
}
