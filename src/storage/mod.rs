mod schema;

pub use schema::{connect, init_database};

use sea_orm::sea_query::{Condition, Expr, Func};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::info;

use crate::entities::category::{self, SENTINEL_CODE, SENTINEL_NAME};
use crate::error::StockResult;

/// Categories installed by `seed-categories`.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Herramientas", "HER"),
    ("Partes de Motor", "MOT"),
    ("Partes de Botes", "BOT"),
    ("Pintura y Acabados", "PIN"),
    ("Seguridad", "SEG"),
    ("Electrónica", "ELE"),
    ("Otros", "OTR"),
    (SENTINEL_NAME, SENTINEL_CODE),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    Renamed,
    Unchanged,
}

/// Makes sure the "new category" placeholder exists.
pub async fn ensure_sentinel_category<C: ConnectionTrait>(db: &C) -> StockResult<category::Model> {
    let existing = category::Entity::find()
        .filter(category::Column::Code.eq(SENTINEL_CODE))
        .one(db)
        .await?;
    if let Some(sentinel) = existing {
        return Ok(sentinel);
    }
    let sentinel = category::ActiveModel {
        name: Set(SENTINEL_NAME.to_string()),
        code: Set(SENTINEL_CODE.to_string()),
        ..ActiveModelTrait::default()
    }
    .insert(db)
    .await?;
    info!(code = SENTINEL_CODE, "sentinel category created");
    Ok(sentinel)
}

/// Get-or-create by code; an existing category is renamed when its name
/// differs from `name`.
pub async fn seed_category<C: ConnectionTrait>(
    db: &C,
    name: &str,
    code: &str,
) -> StockResult<SeedOutcome> {
    let existing = category::Entity::find()
        .filter(category::Column::Code.eq(code))
        .one(db)
        .await?;
    match existing {
        None => {
            category::ActiveModel {
                name: Set(name.to_string()),
                code: Set(code.to_string()),
                ..ActiveModelTrait::default()
            }
            .insert(db)
            .await?;
            Ok(SeedOutcome::Created)
        }
        Some(found) if found.name != name => {
            let mut active: category::ActiveModel = found.into();
            active.name = Set(name.to_string());
            active.update(db).await?;
            Ok(SeedOutcome::Renamed)
        }
        Some(_) => Ok(SeedOutcome::Unchanged),
    }
}

pub async fn seed_default_categories<C: ConnectionTrait>(
    db: &C,
) -> StockResult<Vec<(&'static str, SeedOutcome)>> {
    let mut outcomes = Vec::with_capacity(DEFAULT_CATEGORIES.len());
    for (name, code) in DEFAULT_CATEGORIES {
        let outcome = seed_category(db, name, code).await?;
        info!(code, name, ?outcome, "seeded category");
        outcomes.push((*code, outcome));
    }
    Ok(outcomes)
}

/// `lower(table.column) LIKE '%query%'` for each column, OR-ed together.
/// Columns carry their table so the filter stays valid on joined selects.
pub(crate) fn contains_any<C: ColumnTrait>(columns: &[C], query: &str) -> Condition {
    let pattern = format!("%{}%", query.trim().to_lowercase());
    columns.iter().fold(Condition::any(), |condition, column| {
        let qualified = Expr::col((column.entity_name(), *column));
        condition.add(Expr::expr(Func::lower(qualified)).like(pattern.as_str()))
    })
}

/// Fresh in-memory SQLite database with the schema and sentinel installed.
#[cfg(test)]
pub(crate) async fn memory_db() -> anyhow::Result<sea_orm::DatabaseConnection> {
    Ok(connect("sqlite::memory:", 1).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use crate::entities::item;
    use sea_orm::{DbBackend, PaginatorTrait, QueryTrait};

    #[tokio::test]
    async fn test_connect_installs_sentinel() -> Result<()> {
        let db = memory_db().await?;
        let sentinel = ensure_sentinel_category(&db).await?;
        assert_eq!(sentinel.code, "NUE");
        assert_eq!(sentinel.name, "Nueva Categoría");
        assert_eq!(category::Entity::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_init_database_is_idempotent() -> Result<()> {
        let db = memory_db().await?;
        init_database(&db).await?;
        init_database(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_default_categories() -> Result<()> {
        let db = memory_db().await?;
        let outcomes = seed_default_categories(&db).await?;

        assert_eq!(outcomes.len(), DEFAULT_CATEGORIES.len());
        assert!(outcomes.contains(&("HER", SeedOutcome::Created)));
        assert!(outcomes.contains(&("NUE", SeedOutcome::Unchanged)));
        assert_eq!(category::Entity::find().count(&db).await?, 8);

        let again = seed_default_categories(&db).await?;
        assert!(again.iter().all(|(_, outcome)| *outcome == SeedOutcome::Unchanged));
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_renames_existing_code() -> Result<()> {
        let db = memory_db().await?;
        seed_category(&db, "Tools", "HER").await?;

        let outcome = seed_category(&db, "Herramientas", "HER").await?;
        assert_eq!(outcome, SeedOutcome::Renamed);

        let her = category::Entity::find()
            .filter(category::Column::Code.eq("HER"))
            .one(&db)
            .await?
            .expect("HER exists");
        assert_eq!(her.name, "Herramientas");
        Ok(())
    }

    #[test]
    fn test_contains_any_qualifies_columns_on_joins() {
        let sql = item::Entity::find()
            .find_also_related(category::Entity)
            .filter(contains_any(&[item::Column::Name, item::Column::Code], " Hammer "))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#"LOWER("items"."name") LIKE '%hammer%'"#), "{sql}");
        assert!(sql.contains(r#"LOWER("items"."code") LIKE '%hammer%'"#), "{sql}");
    }
}
