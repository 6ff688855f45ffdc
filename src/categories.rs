use sqlx::SqliteConnection;
use tracing::info;

use crate::columns::{ColumnSpec, RowInserter, RowValues};
use crate::error::AppResult;
use crate::household::Household;
use crate::time::{ANCHOR_MS, DAY_MS};

/// `(name, slug, color)` for every category a household starts with.
pub const CATALOG: [(&str, &str, &str); 12] = [
    ("Primary", "primary", "#4F46E5"),
    ("Secondary", "secondary", "#64748B"),
    ("Tasks", "tasks", "#0EA5E9"),
    ("Bills", "bills", "#F59E0B"),
    ("Insurance", "insurance", "#10B981"),
    ("Property", "property", "#8B5CF6"),
    ("Vehicles", "vehicles", "#EF4444"),
    ("Pets", "pets", "#EC4899"),
    ("Family", "family", "#14B8A6"),
    ("Inventory", "inventory", "#A855F7"),
    ("Shopping", "shopping", "#F97316"),
    ("Health", "health", "#22C55E"),
];

const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("id"),
    ColumnSpec::new("household_id"),
    ColumnSpec::new("name"),
    ColumnSpec::new("slug"),
    ColumnSpec::new("color"),
    ColumnSpec::new("position"),
    ColumnSpec::new("z"),
    ColumnSpec::new("is_visible"),
    ColumnSpec::new("created_at"),
    ColumnSpec::new("updated_at"),
    ColumnSpec::new("deleted_at"),
];

/// Category ids per household, in catalog order, indexed like the
/// household list.
#[derive(Debug, Clone, Default)]
pub struct CategoryCatalog {
    by_household: Vec<Vec<String>>,
}

impl CategoryCatalog {
    pub fn for_household(&self, index: usize) -> &[String] {
        self.by_household
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total(&self) -> usize {
        self.by_household.iter().map(Vec::len).sum()
    }
}

pub fn category_id(household_id: &str, slug: &str) -> String {
    format!("cat_{household_id}_{slug}")
}

pub async fn generate_categories(
    conn: &mut SqliteConnection,
    households: &[Household],
) -> AppResult<CategoryCatalog> {
    let inserter = RowInserter::prepare(conn, "categories", COLUMNS).await?;
    let created_at = ANCHOR_MS - 365 * DAY_MS;

    let mut catalog = CategoryCatalog::default();
    for household in households {
        let mut ids = Vec::with_capacity(CATALOG.len());
        for (position, (name, slug, color)) in CATALOG.iter().enumerate() {
            let id = category_id(&household.id, slug);
            let row = RowValues::new()
                .set("id", id.as_str())
                .set("household_id", household.id.as_str())
                .set("name", *name)
                .set("slug", *slug)
                .set("color", *color)
                .set("position", position as i64)
                .set("z", position as i64)
                .set("is_visible", true)
                .set("created_at", created_at)
                .set("updated_at", created_at)
                .set("deleted_at", Option::<i64>::None);
            inserter.insert(conn, &row).await?;
            ids.push(id);
        }
        catalog.by_household.push(ids);
    }

    info!(target: "arklowdun", event = "seed_categories", count = catalog.total());
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn slugs_are_unique() {
        let slugs: HashSet<_> = CATALOG.iter().map(|(_, slug, _)| *slug).collect();
        assert_eq!(slugs.len(), CATALOG.len());
    }

    #[test]
    fn ids_embed_household_and_slug() {
        assert_eq!(category_id("hh_02", "pets"), "cat_hh_02_pets");
    }

    #[test]
    fn unknown_household_has_no_categories() {
        assert!(CategoryCatalog::default().for_household(3).is_empty());
    }
}
