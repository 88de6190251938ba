pub mod catalog;
pub mod codes;
pub mod config;
pub mod entities;
pub mod error;
pub mod i18n;
pub mod import;
pub mod logging;
mod models;
pub mod notifications;
pub mod qr;
pub mod storage;
pub mod web;

pub use error::{StockError, StockResult};
pub use models::{
    AddToInventory, CategoryForm, CategoryRename, ImportReport, ItemForm, ItemView, SavedItem,
};
pub use notifications::{ItemEvent, NotificationHub};

use codes::{NewItem, ResolvedCategory};
use entities::{category, item, standard_item};
use import::Table;
use qr::QrGenerator;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

/// Name given to categories auto-created for catalog entries without one.
pub const FALLBACK_CATALOG_CATEGORY: &str = "Otros";

pub struct StockService {
    db: DatabaseConnection,
    qr: QrGenerator,
    hub: NotificationHub,
}

impl StockService {
    pub fn new(db: DatabaseConnection, qr: QrGenerator) -> Self {
        Self {
            db,
            qr,
            hub: NotificationHub::new(),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub fn subscribe(&self) -> BroadcastStream<ItemEvent> {
        self.hub.subscribe()
    }

    pub async fn list_items(&self, query: Option<&str>) -> StockResult<Vec<ItemView>> {
        let mut select = item::Entity::find()
            .find_also_related(category::Entity)
            .order_by_desc(item::Column::CreatedAt)
            .order_by_desc(item::Column::Id);
        if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
            select = select.filter(storage::contains_any(
                &[item::Column::Name, item::Column::Code, item::Column::Description],
                query,
            ));
        }
        let rows = select.all(&self.db).await?;
        Ok(rows
            .into_iter()
            .filter_map(|(item, category)| category.map(|category| ItemView::new(item, category)))
            .collect())
    }

    pub async fn get_item(&self, code: &str) -> StockResult<ItemView> {
        let (item, category) = item::Entity::find()
            .filter(item::Column::Code.eq(code))
            .find_also_related(category::Entity)
            .one(&self.db)
            .await?
            .ok_or_else(|| StockError::not_found(format!("item {code}")))?;
        let category =
            category.ok_or_else(|| StockError::not_found(format!("category of item {code}")))?;
        Ok(ItemView::new(item, category))
    }

    /// PNG bytes of the item's QR artifact.
    pub async fn item_qr(&self, code: &str) -> StockResult<Vec<u8>> {
        let item = find_item(&self.db, code).await?;
        item.qr_code
            .ok_or_else(|| StockError::not_found(format!("QR code of item {code}")))
    }

    pub async fn create_item(&self, form: ItemForm) -> StockResult<SavedItem> {
        form.validate()?;
        let txn = self.db.begin().await?;

        let selected = find_category(&txn, form.category).await?;
        let resolved = resolve_form_category(&txn, selected, form.new_category_name.as_deref()).await?;
        let new = NewItem {
            name: form.name.trim().to_string(),
            status: form.status,
            quantity: form.quantity,
            description: form.description,
        };
        let created = codes::insert_item(&txn, &resolved.category, new).await?;
        let created = self.qr.attach(&txn, created).await?;
        txn.commit().await?;

        info!(code = %created.code, category = %resolved.category.code, "item created");
        self.hub.publish(ItemEvent::Created(created.clone()));
        Ok(saved(created, resolved))
    }

    /// Updates the editable fields; the code and QR artifact never change.
    pub async fn update_item(&self, code: &str, form: ItemForm) -> StockResult<SavedItem> {
        form.validate()?;
        let txn = self.db.begin().await?;

        let existing = find_item(&txn, code).await?;
        let selected = find_category(&txn, form.category).await?;
        let resolved = resolve_form_category(&txn, selected, form.new_category_name.as_deref()).await?;

        let mut active = existing.into_active_model();
        active.name = Set(form.name.trim().to_string());
        active.category_id = Set(resolved.category.id);
        active.status = Set(form.status);
        active.quantity = Set(form.quantity);
        active.description = Set(form.description);
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(code = %updated.code, "item updated");
        self.hub.publish(ItemEvent::Updated(updated.clone()));
        Ok(saved(updated, resolved))
    }

    pub async fn delete_item(&self, code: &str) -> StockResult<()> {
        let result = item::Entity::delete_many()
            .filter(item::Column::Code.eq(code))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(StockError::not_found(format!("item {code}")));
        }
        info!(code, "item deleted");
        self.hub.publish(ItemEvent::Deleted(code.to_string()));
        Ok(())
    }

    pub async fn list_categories(&self) -> StockResult<Vec<category::Model>> {
        Ok(category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn get_category(&self, id: i32) -> StockResult<category::Model> {
        find_category(&self.db, id).await
    }

    /// Creates a category with an explicitly chosen code.
    pub async fn create_category(&self, form: CategoryForm) -> StockResult<category::Model> {
        let (name, code) = form.normalized()?;
        let created = category::ActiveModel {
            name: Set(name),
            code: Set(code.clone()),
            ..ActiveModelTrait::default()
        }
        .insert(&self.db)
        .await
        .map_err(|err| {
            if codes::is_unique_violation(&err) {
                StockError::Conflict(format!("category code {code} already exists"))
            } else {
                err.into()
            }
        })?;
        info!(code = %created.code, "category created");
        Ok(created)
    }

    /// Renames a category. Its code stays as assigned.
    pub async fn rename_category(
        &self,
        id: i32,
        form: CategoryRename,
    ) -> StockResult<category::Model> {
        let name = models::validate_category_name(&form.name)?;
        let mut active = find_category(&self.db, id).await?.into_active_model();
        active.name = Set(name);
        Ok(active.update(&self.db).await?)
    }

    /// Deletes a category together with all of its items.
    pub async fn delete_category(&self, id: i32) -> StockResult<Vec<String>> {
        let txn = self.db.begin().await?;
        let category = find_category(&txn, id).await?;
        if category.is_sentinel() {
            return Err(StockError::Conflict(
                "the new-category placeholder cannot be deleted".into(),
            ));
        }

        let removed: Vec<String> = item::Entity::find()
            .filter(item::Column::CategoryId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|item| item.code)
            .collect();
        item::Entity::delete_many()
            .filter(item::Column::CategoryId.eq(id))
            .exec(&txn)
            .await?;
        category::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(code = %category.code, items = removed.len(), "category deleted");
        for code in &removed {
            self.hub.publish(ItemEvent::Deleted(code.clone()));
        }
        Ok(removed)
    }

    pub async fn import(&self, table: &Table) -> StockResult<ImportReport> {
        let outcome = import::import_table(&self.db, &self.qr, table).await?;
        let codes = outcome.items.iter().map(|item| item.code.clone()).collect();
        for item in &outcome.items {
            self.hub.publish(ItemEvent::Created(item.clone()));
        }
        Ok(ImportReport {
            created: outcome.items.len(),
            codes,
            new_categories: outcome.new_categories,
        })
    }

    pub async fn list_catalog(
        &self,
        query: Option<&str>,
        page: u64,
    ) -> StockResult<catalog::CatalogPage> {
        catalog::list_catalog(&self.db, query, page).await
    }

    pub async fn get_standard_item(&self, code: &str) -> StockResult<standard_item::Model> {
        catalog::find_standard_item(&self.db, code)
            .await?
            .ok_or_else(|| StockError::not_found(format!("catalog entry {code}")))
    }

    /// Copies a catalog entry into the inventory as a new item.
    pub async fn add_to_inventory(
        &self,
        code: &str,
        request: AddToInventory,
    ) -> StockResult<SavedItem> {
        let quantity = request.quantity.unwrap_or(1);
        if quantity < 0 {
            return Err(StockError::validation("quantity", "quantity must not be negative"));
        }
        let standard = self.get_standard_item(code).await?;

        let category_name = match standard.category.trim() {
            "" => FALLBACK_CATALOG_CATEGORY,
            name => name,
        };
        let name = match standard.description.trim() {
            "" => standard.code.clone(),
            description => description.chars().take(models::MAX_ITEM_NAME_LEN).collect(),
        };
        let description = match standard.notes.trim() {
            "" => format!("{} {}", standard.catalog, standard.code),
            notes => notes.to_string(),
        };

        let txn = self.db.begin().await?;
        let resolved = codes::resolve_category(&txn, category_name).await?;
        let new = NewItem {
            name,
            status: request.status.unwrap_or_default(),
            quantity,
            description,
        };
        let created = codes::insert_item(&txn, &resolved.category, new).await?;
        let created = self.qr.attach(&txn, created).await?;
        txn.commit().await?;

        info!(code = %created.code, catalog_code = %standard.code, "catalog entry added to inventory");
        self.hub.publish(ItemEvent::Created(created.clone()));
        Ok(saved(created, resolved))
    }
}

fn saved(item: item::Model, resolved: ResolvedCategory) -> SavedItem {
    let new_category = resolved.created.then(|| resolved.category.clone());
    SavedItem {
        item: ItemView::new(item, resolved.category),
        new_category,
    }
}

async fn find_item<C: ConnectionTrait>(db: &C, code: &str) -> StockResult<item::Model> {
    item::Entity::find()
        .filter(item::Column::Code.eq(code))
        .one(db)
        .await?
        .ok_or_else(|| StockError::not_found(format!("item {code}")))
}

async fn find_category<C: ConnectionTrait>(db: &C, id: i32) -> StockResult<category::Model> {
    category::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| StockError::not_found(format!("category {id}")))
}

/// Swaps the "new category" placeholder for the category named by the form,
/// creating it when needed.
async fn resolve_form_category<C>(
    db: &C,
    selected: category::Model,
    new_category_name: Option<&str>,
) -> StockResult<ResolvedCategory>
where
    C: ConnectionTrait + TransactionTrait,
{
    if !selected.is_sentinel() {
        return Ok(ResolvedCategory {
            category: selected,
            created: false,
        });
    }
    let name = new_category_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            StockError::validation(
                "new_category_name",
                "a name is required when the new category placeholder is selected",
            )
        })?;
    let name = models::validate_category_name(name)?;

    let resolved = codes::resolve_category(db, &name).await?;
    if resolved.category.is_sentinel() {
        return Err(StockError::validation(
            "new_category_name",
            "the placeholder cannot be used as a category name",
        ));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::is_item_code_for;
    use crate::import::Cell;
    use crate::storage::{ensure_sentinel_category, memory_db};
    use anyhow::Result;
    use futures::StreamExt;
    use sea_orm::PaginatorTrait;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn service() -> Result<StockService> {
        let db = memory_db().await?;
        Ok(StockService::new(db, QrGenerator::new("http://localhost:8000")))
    }

    fn form(name: &str, category: i32) -> ItemForm {
        ItemForm {
            name: name.to_string(),
            category,
            status: item::Status::Funcional,
            quantity: 1,
            description: String::new(),
            new_category_name: None,
        }
    }

    async fn add_category(service: &StockService, name: &str, code: &str) -> Result<category::Model> {
        Ok(service
            .create_category(CategoryForm {
                name: name.into(),
                code: code.into(),
            })
            .await?)
    }

    #[tokio::test]
    async fn test_item_creation_generates_code_and_qr() -> Result<()> {
        let service = service().await?;
        let it = add_category(&service, "IT Equipment", "IT").await?;

        let mut laptop = form("Laptop", it.id);
        laptop.quantity = 10;
        let saved = service.create_item(laptop).await?;

        let item = &saved.item.item;
        assert!(item.code.starts_with("IT-"));
        assert_eq!(item.code.len(), 14);
        assert!(is_item_code_for(&item.code, "IT"));
        assert!(item.qr_target.as_deref().unwrap_or_default().contains(&item.code));
        assert!(saved.new_category.is_none());

        let png = service.item_qr(&item.code).await?;
        assert!(png.starts_with(b"\x89PNG"));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_item_with_new_category() -> Result<()> {
        let service = service().await?;
        let sentinel = ensure_sentinel_category(service.db()).await?;

        let mut new_thing = form("New Thing", sentinel.id);
        new_thing.new_category_name = Some("My New Cat".into());
        let saved = service.create_item(new_thing).await?;

        assert_eq!(saved.item.category.name, "My New Cat");
        assert!(saved.item.category.code.starts_with("MY"));
        assert_eq!(saved.new_category.as_ref().map(|c| c.id), Some(saved.item.category.id));
        assert!(is_item_code_for(&saved.item.item.code, &saved.item.category.code));
        Ok(())
    }

    #[tokio::test]
    async fn test_new_category_reuses_existing_name() -> Result<()> {
        let service = service().await?;
        let sentinel = ensure_sentinel_category(service.db()).await?;
        let tools = add_category(&service, "Tools", "TOL").await?;

        let mut hammer = form("Hammer", sentinel.id);
        hammer.new_category_name = Some("  TOOLS ".into());
        let saved = service.create_item(hammer).await?;

        assert_eq!(saved.item.category, tools);
        assert!(saved.new_category.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_sentinel_without_name_is_rejected() -> Result<()> {
        let service = service().await?;
        let sentinel = ensure_sentinel_category(service.db()).await?;
        let categories_before = category::Entity::find().count(service.db()).await?;

        let mut orphan = form("Orphan", sentinel.id);
        orphan.new_category_name = Some("   ".into());
        let result = service.create_item(orphan).await;

        assert!(matches!(
            result,
            Err(StockError::Validation { field: "new_category_name", .. })
        ));
        assert_eq!(item::Entity::find().count(service.db()).await?, 0);
        assert_eq!(category::Entity::find().count(service.db()).await?, categories_before);
        Ok(())
    }

    #[tokio::test]
    async fn test_sentinel_name_cannot_be_reused() -> Result<()> {
        let service = service().await?;
        let sentinel = ensure_sentinel_category(service.db()).await?;

        let mut item = form("Thing", sentinel.id);
        item.new_category_name = Some("nueva categoría".into());
        let result = service.create_item(item).await;
        assert!(matches!(result, Err(StockError::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_category_is_not_found() -> Result<()> {
        let service = service().await?;
        let result = service.create_item(form("Ghost", 999)).await;
        assert!(matches!(result, Err(StockError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_keeps_code_and_qr() -> Result<()> {
        let service = service().await?;
        let tools = add_category(&service, "Tools", "TOL").await?;
        let safety = add_category(&service, "Safety", "SEG").await?;
        let created = service.create_item(form("Helmet", tools.id)).await?.item.item;

        let mut edit = form("Helmet XL", safety.id);
        edit.status = item::Status::Averiado;
        edit.quantity = 3;
        edit.description = "Cracked".into();
        let updated = service.update_item(&created.code, edit).await?.item;

        assert_eq!(updated.item.code, created.code);
        assert_eq!(updated.item.qr_code, created.qr_code);
        assert_eq!(updated.item.qr_target, created.qr_target);
        assert_eq!(updated.item.created_at, created.created_at);
        assert_eq!(updated.item.name, "Helmet XL");
        assert_eq!(updated.category, safety);
        assert_eq!(updated.status_label, "Averiado");
        assert_eq!(updated.item.quantity, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_with_sentinel_creates_category() -> Result<()> {
        let service = service().await?;
        let sentinel = ensure_sentinel_category(service.db()).await?;
        let tools = add_category(&service, "Tools", "TOL").await?;
        let created = service.create_item(form("Rope", tools.id)).await?.item.item;

        let mut edit = form("Rope", sentinel.id);
        let result = service.update_item(&created.code, edit.clone()).await;
        assert!(matches!(result, Err(StockError::Validation { .. })));

        edit.new_category_name = Some("Cubierta".into());
        let saved = service.update_item(&created.code, edit).await?;
        assert_eq!(saved.item.category.code, "CUB");
        assert_eq!(saved.item.item.code, created.code);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_items_newest_first_and_filtered() -> Result<()> {
        let service = service().await?;
        let tools = add_category(&service, "Tools", "TOL").await?;
        let hammer = service.create_item(form("Hammer", tools.id)).await?.item.item;
        let mut drill = form("Drill", tools.id);
        drill.description = "Cordless HAMMER drill".into();
        let drill = service.create_item(drill).await?.item.item;
        service.create_item(form("Saw", tools.id)).await?;

        let all = service.list_items(None).await?;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].item.name, "Saw");

        let found = service.list_items(Some("hammer")).await?;
        let codes: Vec<&str> = found.iter().map(|view| view.item.code.as_str()).collect();
        assert_eq!(codes, vec![drill.code.as_str(), hammer.code.as_str()]);

        let by_code = service.list_items(Some(&hammer.code.to_lowercase())).await?;
        assert_eq!(by_code.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_item() -> Result<()> {
        let service = service().await?;
        let tools = add_category(&service, "Tools", "TOL").await?;
        let created = service.create_item(form("Hammer", tools.id)).await?.item.item;

        service.delete_item(&created.code).await?;
        assert!(matches!(service.get_item(&created.code).await, Err(StockError::NotFound(_))));
        assert!(matches!(service.delete_item(&created.code).await, Err(StockError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_category_cascades() -> Result<()> {
        let service = service().await?;
        let tools = add_category(&service, "Tools", "TOL").await?;
        let other = add_category(&service, "Other", "OTR").await?;
        let hammer = service.create_item(form("Hammer", tools.id)).await?.item.item;
        service.create_item(form("Saw", tools.id)).await?;
        service.create_item(form("Tape", other.id)).await?;

        let removed = service.delete_category(tools.id).await?;
        assert_eq!(removed.len(), 2);
        assert!(removed.contains(&hammer.code));
        assert_eq!(item::Entity::find().count(service.db()).await?, 1);
        assert!(matches!(service.get_category(tools.id).await, Err(StockError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_sentinel_category_cannot_be_deleted() -> Result<()> {
        let service = service().await?;
        let sentinel = ensure_sentinel_category(service.db()).await?;
        let result = service.delete_category(sentinel.id).await;
        assert!(matches!(result, Err(StockError::Conflict(_))));
        assert!(service.get_category(sentinel.id).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_category_code_conflicts_and_rename() -> Result<()> {
        let service = service().await?;
        let tools = add_category(&service, "Tools", "tol").await?;
        assert_eq!(tools.code, "TOL");

        let duplicate = service
            .create_category(CategoryForm {
                name: "Tolerances".into(),
                code: "TOL".into(),
            })
            .await;
        assert!(matches!(duplicate, Err(StockError::Conflict(_))));

        let renamed = service
            .rename_category(tools.id, CategoryRename { name: "Herramientas".into() })
            .await?;
        assert_eq!(renamed.name, "Herramientas");
        assert_eq!(renamed.code, "TOL");
        Ok(())
    }

    #[tokio::test]
    async fn test_import_publishes_events() -> Result<()> {
        let service = service().await?;
        add_category(&service, "Tools", "TOL").await?;
        let mut events = service.subscribe();

        let table = Table::new(
            import::REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            vec![vec![
                Cell::Text("Hammer".into()),
                Cell::Text("Tools".into()),
                Cell::Text("Funcional".into()),
                Cell::Int(10),
                Cell::Text("Heavy duty".into()),
            ]],
        );
        let report = service.import(&table).await?;
        assert_eq!(report.created, 1);
        assert!(report.new_categories.is_empty());

        let event = timeout(Duration::from_secs(1), events.next()).await?;
        match event {
            Some(Ok(ItemEvent::Created(item))) => assert_eq!(item.code, report.codes[0]),
            other => panic!("expected Created event, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_notifications() -> Result<()> {
        let service = service().await?;
        let tools = add_category(&service, "Tools", "TOL").await?;
        let mut notifications = service.subscribe();

        let created = service.create_item(form("Test Doc", tools.id)).await?.item.item;
        service.delete_item(&created.code).await?;

        match timeout(Duration::from_secs(1), notifications.next()).await? {
            Some(Ok(ItemEvent::Created(item))) => assert_eq!(item.code, created.code),
            other => panic!("Expected Created event, got {other:?}"),
        }
        match timeout(Duration::from_secs(1), notifications.next()).await? {
            Some(Ok(ItemEvent::Deleted(code))) => assert_eq!(code, created.code),
            other => panic!("Expected Deleted event, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_add_to_inventory_copies_catalog_entry() -> Result<()> {
        let service = service().await?;
        catalog::upsert_entries(
            service.db(),
            &[
                json!({"impa_code": "331201", "description": "Shackle galv 10mm", "category": "Deck"}),
                json!({"impa_code": "999999", "description": "", "notes": "Loose part"}),
            ],
        )
        .await?;

        let saved = service
            .add_to_inventory("331201", AddToInventory { quantity: Some(4), status: None })
            .await?;
        assert_eq!(saved.item.item.name, "Shackle galv 10mm");
        assert_eq!(saved.item.item.quantity, 4);
        assert_eq!(saved.item.item.description, "IMPA 331201");
        assert_eq!(saved.item.category.code, "DEC");
        assert!(saved.new_category.is_some());

        let again = service.add_to_inventory("331201", AddToInventory::default()).await?;
        assert_eq!(again.item.category.id, saved.item.category.id);
        assert_ne!(again.item.item.code, saved.item.item.code);
        assert_eq!(again.item.item.quantity, 1);

        let loose = service.add_to_inventory("999999", AddToInventory::default()).await?;
        assert_eq!(loose.item.item.name, "999999");
        assert_eq!(loose.item.item.description, "Loose part");
        assert_eq!(loose.item.category.name, FALLBACK_CATALOG_CATEGORY);

        let missing = service.add_to_inventory("000000", AddToInventory::default()).await;
        assert!(matches!(missing, Err(StockError::NotFound(_))));
        Ok(())
    }
}
