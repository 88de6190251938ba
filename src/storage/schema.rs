use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::time::Duration;
use tracing::info;

use crate::entities::{category, item, standard_item};
use crate::error::StockResult;

pub async fn connect(database_url: &str, max_connections: u32) -> StockResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(options).await?;

    init_database(&db).await?;
    super::ensure_sentinel_category(&db).await?;

    info!(backend = ?db.get_database_backend(), "database ready");
    Ok(db)
}

/// Creates the tables when they do not exist yet.
pub async fn init_database<C: ConnectionTrait>(db: &C) -> StockResult<()> {
    create_table(db, category::Entity).await?;
    create_table(db, item::Entity).await?;
    create_table(db, standard_item::Entity).await?;
    Ok(())
}

async fn create_table<C, E>(db: &C, entity: E) -> StockResult<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    db.execute(backend.build(statement.if_not_exists())).await?;
    Ok(())
}
