//! Data loading functionality for yieldplan.
//!
//! The finalized item table arrives as a CSV file with one row per item.
//! Rows are loosely typed text; this module cleans names, parses recipes and
//! validates everything into a [`Catalog`], rejecting malformed rows before
//! they can reach the model builder.

use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;
use crate::models::{Catalog, CatalogRow, Item};

/// Normalizes an item or machine name as it appears in scraped tables.
///
/// Non-breaking spaces become spaces, en and em dashes become hyphens, and
/// runs of whitespace collapse to one space.
///
/// # Example
///
/// ```
/// use yieldplan::data::clean_name;
///
/// assert_eq!(clean_name("  Cream\u{a0}  cake "), "Cream cake");
/// assert_eq!(clean_name("Bacon \u{2013} eggs"), "Bacon - eggs");
/// ```
pub fn clean_name(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .replace(['\u{2013}', '\u{2014}'], "-")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a recipe string (e.g., `"Wheat:3;Corn:1"`) into ingredient amounts.
///
/// An empty string is an empty recipe. A repeated ingredient adds up.
///
/// # Errors
///
/// Returns a description of the first malformed part.
pub fn parse_recipe(raw: &str) -> Result<BTreeMap<String, f64>, String> {
    let mut recipe = BTreeMap::new();
    for part in raw.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (name, qty) = part
            .rsplit_once(':')
            .ok_or_else(|| format!("recipe part '{}' is not 'name:quantity'", part))?;
        let name = clean_name(name);
        if name.is_empty() {
            return Err(format!("recipe part '{}' has no ingredient name", part));
        }
        let qty: f64 = qty
            .trim()
            .parse()
            .map_err(|_| format!("recipe part '{}' has a non-numeric quantity", part))?;
        *recipe.entry(name).or_insert(0.0) += qty;
    }
    Ok(recipe)
}

fn row_to_item(row: CatalogRow, line: u64) -> Result<Item, ConfigError> {
    let recipe = parse_recipe(row.recipe.as_deref().unwrap_or(""))
        .map_err(|reason| ConfigError::InvalidRow { line, reason })?;
    Ok(Item {
        name: clean_name(&row.name),
        unlock_level: row.unlock_level,
        production_time: row.production_time,
        machine: clean_name(&row.machine),
        recipe,
        xp_yield: row.xp,
        profit_yield: row.profit,
        batch_yield: row.batch_yield.unwrap_or(1),
    })
}

/// Loads a catalog from any CSV source.
///
/// # CSV Format
///
/// Expected columns: `name, unlock_level, production_time, machine, recipe, xp, profit, yield`.
/// `production_time` is in minutes; `yield` may be omitted and defaults to 1.
pub fn load_catalog_from_reader<R: Read>(reader: R) -> Result<Catalog, ConfigError> {
    let mut rdr = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut items = Vec::new();
    for (index, result) in rdr.deserialize::<CatalogRow>().enumerate() {
        // header is line 1
        let line = index as u64 + 2;
        let row = result?;
        items.push(row_to_item(row, line)?);
    }
    debug!(rows = items.len(), "catalog rows parsed");
    Catalog::new(items)
}

/// Loads the item catalog from a CSV file.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use yieldplan::data::load_catalog;
///
/// let catalog = load_catalog(Path::new("data/goods.csv")).unwrap();
/// println!("Loaded {} items", catalog.len());
/// ```
pub fn load_catalog(path: &Path) -> Result<Catalog, ConfigError> {
    let file = File::open(path)?;
    load_catalog_from_reader(file)
}

/// The catalog bundled with the crate.
pub const BUNDLED_CATALOG: &str = include_str!("../data/goods.csv");

/// Parses [`BUNDLED_CATALOG`].
pub fn bundled_catalog() -> Result<Catalog, ConfigError> {
    load_catalog_from_reader(BUNDLED_CATALOG.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_ingredient_recipe() {
        let recipe = parse_recipe("Wheat:3; Milk : 1").unwrap();
        assert_eq!(recipe.get("Wheat"), Some(&3.0));
        assert_eq!(recipe.get("Milk"), Some(&1.0));
    }

    #[test]
    fn repeated_ingredient_adds_up() {
        let recipe = parse_recipe("Egg:1;Egg:2").unwrap();
        assert_eq!(recipe.get("Egg"), Some(&3.0));
    }

    #[test]
    fn empty_recipe_is_raw_good() {
        assert!(parse_recipe("").unwrap().is_empty());
        assert!(parse_recipe(" ; ").unwrap().is_empty());
    }

    #[test]
    fn rejects_part_without_quantity() {
        assert!(parse_recipe("Wheat").is_err());
        assert!(parse_recipe("Wheat:lots").is_err());
        assert!(parse_recipe(":2").is_err());
    }

    #[test]
    fn malformed_row_reports_line() {
        let csv = "name,unlock_level,production_time,machine,recipe,xp,profit,yield\n\
                   Wheat,1,0,Field,,1,1,1\n\
                   Bread,1,15,Oven,Wheat-3,10,21,1\n";
        match load_catalog_from_reader(csv.as_bytes()) {
            Err(ConfigError::InvalidRow { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected InvalidRow, got {:?}", other),
        }
    }
}
