//! Item and category code assignment.
//!
//! Codes are claimed by inserting the row and letting the unique constraint
//! reject duplicates. Every attempt runs inside its own savepoint so that a
//! rejected insert leaves an enclosing transaction usable.

use rand::Rng;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{debug, info};

use crate::entities::{category, item};
use crate::error::{StockError, StockResult};

pub const NUMERIC_PART_LEN: usize = 11;
pub const MAX_ITEM_CODE_ATTEMPTS: u32 = 16;
/// Counters tried after the primary category code collides.
pub const CATEGORY_CODE_FALLBACKS: u32 = 9;

/// Random string of `len` decimal digits, leading zeros allowed.
pub fn generate_numeric_part(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

pub fn item_code(category_code: &str, numeric_part: &str) -> String {
    format!("{category_code}-{numeric_part}")
}

/// True when `code` is `<category_code>-` followed by exactly eleven digits.
pub fn is_item_code_for(code: &str, category_code: &str) -> bool {
    code.strip_prefix(category_code)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|digits| {
            digits.len() == NUMERIC_PART_LEN && digits.bytes().all(|b| b.is_ascii_digit())
        })
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Inserts candidates until one is accepted by the unique constraints.
///
/// `next_candidate` receives the attempt number and returns `None` when it
/// has nothing left to offer. Returns `Ok(None)` when every candidate
/// collided or `max_attempts` was reached.
pub(crate) async fn insert_unique<C, A, F>(
    db: &C,
    max_attempts: u32,
    mut next_candidate: F,
) -> StockResult<Option<<A::Entity as EntityTrait>::Model>>
where
    C: TransactionTrait,
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    F: FnMut(u32) -> Option<A>,
{
    for attempt in 0..max_attempts {
        let Some(candidate) = next_candidate(attempt) else {
            break;
        };
        let savepoint = db.begin().await?;
        match candidate.insert(&savepoint).await {
            Ok(model) => {
                savepoint.commit().await?;
                return Ok(Some(model));
            }
            Err(err) if is_unique_violation(&err) => {
                savepoint.rollback().await?;
                debug!(attempt, "code collision, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(None)
}

/// Field values of an item before it has a code.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub status: item::Status,
    pub quantity: i32,
    pub description: String,
}

/// Inserts `new` under `category` with a freshly generated, unique code.
pub async fn insert_item<C>(
    db: &C,
    category: &category::Model,
    new: NewItem,
) -> StockResult<item::Model>
where
    C: TransactionTrait,
{
    insert_item_with(db, category, new, || generate_numeric_part(NUMERIC_PART_LEN)).await
}

pub(crate) async fn insert_item_with<C, G>(
    db: &C,
    category: &category::Model,
    new: NewItem,
    mut numeric_part: G,
) -> StockResult<item::Model>
where
    C: TransactionTrait,
    G: FnMut() -> String,
{
    let inserted = insert_unique(db, MAX_ITEM_CODE_ATTEMPTS, |_| {
        Some(item::ActiveModel {
            code: Set(item_code(&category.code, &numeric_part())),
            name: Set(new.name.clone()),
            category_id: Set(category.id),
            status: Set(new.status),
            quantity: Set(new.quantity),
            description: Set(new.description.clone()),
            qr_target: Set(None),
            qr_code: Set(None),
            ..ActiveModelTrait::default()
        })
    })
    .await?;

    inserted.ok_or_else(|| StockError::CodeSpaceExhausted {
        category: category.code.clone(),
        attempts: MAX_ITEM_CODE_ATTEMPTS,
    })
}

/// Candidate codes for a category name: the first three characters
/// upper-cased, then the first two followed by `1..=9`.
///
/// Only letters and digits are kept, so codes stay usable inside item codes
/// and URLs. Names with fewer than three of them produce shorter codes.
#[derive(Debug, Clone)]
pub struct CategoryCodeCandidates {
    primary: String,
    prefix: String,
    counter: u32,
}

impl CategoryCodeCandidates {
    pub fn new(name: &str) -> Self {
        let primary: String = name
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_uppercase)
            .take(3)
            .collect();
        let prefix = primary.chars().take(2).collect();
        Self {
            primary,
            prefix,
            counter: 0,
        }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }
}

impl Iterator for CategoryCodeCandidates {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.primary.is_empty() || self.counter > CATEGORY_CODE_FALLBACKS {
            return None;
        }
        let candidate = if self.counter == 0 {
            self.primary.clone()
        } else {
            format!("{}{}", self.prefix, self.counter)
        };
        self.counter += 1;
        Some(candidate)
    }
}

/// Finds a category whose name matches `name` ignoring case.
pub async fn find_category_by_name<C>(db: &C, name: &str) -> StockResult<Option<category::Model>>
where
    C: ConnectionTrait,
{
    let wanted = name.trim().to_lowercase();
    // Categories are few; comparing here keeps non-ASCII case folding
    // consistent across database backends.
    let categories = category::Entity::find()
        .order_by_asc(category::Column::Id)
        .all(db)
        .await?;
    Ok(categories
        .into_iter()
        .find(|category| category.name.trim().to_lowercase() == wanted))
}

/// Creates a category named `name` with a derived, unique code.
pub async fn create_derived_category<C>(db: &C, name: &str) -> StockResult<category::Model>
where
    C: TransactionTrait,
{
    let name = name.trim();
    let mut candidates = CategoryCodeCandidates::new(name);
    if candidates.primary().is_empty() {
        return Err(StockError::validation(
            "category",
            "category name must contain a letter or digit",
        ));
    }

    let created = insert_unique(db, CATEGORY_CODE_FALLBACKS + 1, |_| {
        candidates.next().map(|code| category::ActiveModel {
            name: Set(name.to_string()),
            code: Set(code),
            ..ActiveModelTrait::default()
        })
    })
    .await?;

    let category = created.ok_or_else(|| StockError::CategoryCodeExhausted {
        name: name.to_string(),
    })?;
    info!(name = %category.name, code = %category.code, "category created");
    Ok(category)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCategory {
    pub category: category::Model,
    pub created: bool,
}

/// Returns the category matching `name`, creating it when none matches.
pub async fn resolve_category<C>(db: &C, name: &str) -> StockResult<ResolvedCategory>
where
    C: ConnectionTrait + TransactionTrait,
{
    if let Some(category) = find_category_by_name(db, name).await? {
        return Ok(ResolvedCategory {
            category,
            created: false,
        });
    }
    let category = create_derived_category(db, name).await?;
    Ok(ResolvedCategory {
        category,
        created: true,
    })
}
