//! Selection of the catalog items a player can produce right now.

use std::collections::BTreeSet;

use crate::models::{Catalog, Item};

/// Items unlocked for one request, in catalog (name) order.
#[derive(Debug, Clone)]
pub struct EligibleSet<'a> {
    items: Vec<&'a Item>,
}

impl<'a> EligibleSet<'a> {
    pub fn items(&self) -> &[&'a Item] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|i| i.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&'a Item> {
        self.items.iter().copied().find(|i| i.name == name)
    }

    /// Further restricts the set to items whose single run fits in
    /// `time_budget` minutes.
    pub fn fitting_window(&self, time_budget: f64) -> EligibleSet<'a> {
        EligibleSet {
            items: self
                .items
                .iter()
                .copied()
                .filter(|i| i.production_time <= time_budget)
                .collect(),
        }
    }

    /// Every ingredient named by an eligible recipe, eligible or not.
    pub fn ingredients(&self) -> BTreeSet<&'a str> {
        self.items
            .iter()
            .flat_map(|i| i.recipe.keys().map(String::as_str))
            .collect()
    }

    /// Eligible items that no other eligible item consumes.
    pub fn finals(&self) -> BTreeSet<&'a str> {
        let used = self.ingredients();
        self.items
            .iter()
            .map(|i| i.name.as_str())
            .filter(|name| !used.contains(name))
            .collect()
    }
}

/// Returns the catalog items with `unlock_level <= level`.
///
/// # Example
///
/// ```
/// use yieldplan::eligibility::eligible_items;
/// use yieldplan::models::{Catalog, Item};
///
/// let catalog = Catalog::new(vec![
///     Item::new("Wheat", "Field").unlock_at(1),
///     Item::new("Cheese", "Dairy").unlock_at(12).takes(60.0),
/// ]).unwrap();
///
/// let eligible = eligible_items(&catalog, 5);
/// assert!(eligible.contains("Wheat"));
/// assert!(!eligible.contains("Cheese"));
/// ```
pub fn eligible_items(catalog: &Catalog, level: u32) -> EligibleSet<'_> {
    EligibleSet {
        items: catalog.iter().filter(|i| i.unlock_level <= level).collect(),
    }
}
