//! Catalog helpers: product status, slugs and the level-1 category visibility map.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Published,
    Archived,
}

impl ProductStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Published => "published",
            ProductStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProductStatus::Draft),
            "published" => Ok(ProductStatus::Published),
            "archived" => Ok(ProductStatus::Archived),
            _ => Err(ParseEnumError::new("product status", s)),
        }
    }
}

/// One row of the product/category join: a product's membership in a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMembership {
    pub product_id: i64,
    pub category_id: i64,
    pub product_status: String,
    pub category_level: i16,
}

/// For every level-1 category, the set of categories that appear on at least
/// one published product together with it.
///
/// Each product contributes its full category set to every level-1 category it
/// belongs to. Products with no level-1 category contribute nothing. Rows for
/// products that are not published are ignored.
#[must_use]
pub fn visible_by_l1(rows: &[CategoryMembership]) -> BTreeMap<i64, BTreeSet<i64>> {
    let published = ProductStatus::Published.as_str();

    let mut by_product: HashMap<i64, (BTreeSet<i64>, BTreeSet<i64>)> = HashMap::new();
    for row in rows.iter().filter(|r| r.product_status == published) {
        let (l1, all) = by_product.entry(row.product_id).or_default();
        all.insert(row.category_id);
        if row.category_level == 1 {
            l1.insert(row.category_id);
        }
    }

    let mut visible: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for (l1, all) in by_product.values() {
        for top in l1 {
            visible.entry(*top).or_default().extend(all.iter().copied());
        }
    }
    visible
}

/// Generate a URL-safe slug from a display name.
///
/// Letters and digits of any script are kept (lowercased), so CJK names
/// produce a usable slug. Spaces, dashes and underscores become single
/// dashes, everything else is dropped.
#[must_use]
pub fn slug_from_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c == ' ' || c == '-' || c == '_' {
                Some('-')
            } else {
                None
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
