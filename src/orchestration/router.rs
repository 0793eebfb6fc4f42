//! # Router
//!
//! Maps the Selector's emitted value to the single aggregation branch that
//! should run. Anything outside the category set routes nowhere.

use serde_json::Value;

use crate::models::{BranchId, Category};

/// Branch of a known category
pub fn route_category(category: Category) -> BranchId {
    match category {
        Category::Bronze => Category::Bronze.branch_id(),
        Category::Silver => Category::Silver.branch_id(),
        Category::Gold => Category::Gold.branch_id(),
    }
}

/// Branch for an emitted value, `None` when it names no category
pub fn route(selection: &str) -> Option<BranchId> {
    match selection.parse::<Category>() {
        Ok(category) => Some(route_category(category)),
        Err(_) => None,
    }
}

/// Route a hand-off value; only JSON strings can name a category
pub fn route_value(selection: &Value) -> Option<BranchId> {
    selection.as_str().and_then(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_category_routes_to_its_branch() {
        assert_eq!(route("Bronze").map(|b| b.as_str()), Some("calc_Bronze"));
        assert_eq!(route("Silver").map(|b| b.as_str()), Some("calc_Silver"));
        assert_eq!(route("Gold").map(|b| b.as_str()), Some("calc_Gold"));
    }

    #[test]
    fn test_unknown_values_route_nowhere() {
        for value in ["", "gold", "Platinum", " Gold", "calc_Gold"] {
            assert_eq!(route(value), None, "{value:?} should not route");
        }
    }

    #[test]
    fn test_route_value_requires_string() {
        assert_eq!(
            route_value(&json!("Gold")).map(|b| b.category()),
            Some(Category::Gold)
        );
        assert_eq!(route_value(&json!(3)), None);
        assert_eq!(route_value(&Value::Null), None);
    }
}
