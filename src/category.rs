//! Granted category set and per-registration requirements.
//!
//! Category identifiers are opaque strings compared exactly: no case
//! folding, no trimming. Both [`CategorySet`] and [`RequiredCategories`]
//! keep first-seen order and never hold duplicates.

use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Keep the first occurrence of each identifier, preserving order.
fn dedup<I, S>(categories: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    categories
        .into_iter()
        .map(Into::into)
        .filter(|category| seen.insert(category.clone()))
        .collect()
}

/// Currently granted categories.
///
/// Replacement is wholesale: anything absent from a new assignment is
/// revoked, even if it was granted before.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySet {
    granted: Vec<String>,
}

impl CategorySet {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granted: dedup(categories),
        }
    }

    /// Replace the granted set.
    ///
    /// Returns `true` unless the new set has the same membership as the
    /// old one. Equal length plus one-way containment is set equality
    /// here because both sides are de-duplicated.
    pub fn replace<I, S>(&mut self, categories: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let next = dedup(categories);
        let unchanged = next.len() == self.granted.len()
            && next.iter().all(|category| self.granted.contains(category));

        self.granted = next;
        !unchanged
    }

    /// Replace from an untyped value.
    ///
    /// Anything other than a JSON array is ignored and reports no change.
    /// Non-string array elements are skipped.
    pub fn replace_value(&mut self, value: &Value) -> bool {
        match value.as_array() {
            Some(items) => self.replace(items.iter().filter_map(Value::as_str)),
            None => false,
        }
    }

    /// True iff every required category is granted. Empty requirements
    /// are always satisfied.
    pub fn includes_all(&self, required: &RequiredCategories) -> bool {
        required.iter().all(|category| self.contains(category))
    }

    pub fn contains(&self, category: &str) -> bool {
        self.granted.iter().any(|granted| granted == category)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.granted
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.granted.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.granted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }
}

/// Categories a registration needs before its action may fire.
///
/// Fixed at registration time. A single identifier normalizes to a
/// one-element set through the `From` impls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredCategories {
    categories: Vec<String>,
}

impl RequiredCategories {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: dedup(categories),
        }
    }

    /// No requirements: vacuously satisfied by any granted set.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from an untyped value: a string is one category, an array
    /// contributes its string elements. Anything else is rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(category) => Some(Self::from(category.as_str())),
            Value::Array(items) => Some(Self::new(items.iter().filter_map(Value::as_str))),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl fmt::Display for RequiredCategories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.categories.join(", "))
    }
}

impl From<&str> for RequiredCategories {
    fn from(category: &str) -> Self {
        Self {
            categories: vec![category.to_string()],
        }
    }
}

impl From<String> for RequiredCategories {
    fn from(category: String) -> Self {
        Self {
            categories: vec![category],
        }
    }
}

impl From<&String> for RequiredCategories {
    fn from(category: &String) -> Self {
        Self::from(category.as_str())
    }
}

impl<S: Into<String>> From<Vec<S>> for RequiredCategories {
    fn from(categories: Vec<S>) -> Self {
        Self::new(categories)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for RequiredCategories {
    fn from(categories: [S; N]) -> Self {
        Self::new(categories)
    }
}

impl<S: Into<String> + Clone> From<&[S]> for RequiredCategories {
    fn from(categories: &[S]) -> Self {
        Self::new(categories.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_removes_duplicates_keeping_first_seen_order() {
        let set = CategorySet::new(["b", "a", "b", "c", "a"]);
        assert_eq!(set.as_slice(), ["b", "a", "c"]);
    }

    #[test]
    fn test_replace_reports_change_for_new_membership() {
        let mut set = CategorySet::default();
        assert!(set.replace(["analytics"]));
        assert_eq!(set.as_slice(), ["analytics"]);
    }

    #[test]
    fn test_replace_same_membership_is_unchanged_regardless_of_order() {
        let mut set = CategorySet::new(["a", "b"]);
        assert!(!set.replace(["b", "a"]));
        assert!(!set.replace(["a", "b", "a"]));
    }

    #[test]
    fn test_replace_is_full_replacement_not_merge() {
        let mut set = CategorySet::new(["a", "b"]);
        assert!(set.replace(["c"]));
        assert!(!set.contains("a"));
        assert!(!set.contains("b"));
        assert!(set.contains("c"));
    }

    #[test]
    fn test_replace_with_subset_or_superset_is_a_change() {
        let mut set = CategorySet::new(["a", "b"]);
        assert!(set.replace(["a"]));
        assert!(set.replace(["a", "b", "c"]));
    }

    #[test]
    fn test_replace_duplicates_do_not_fake_a_same_length_match() {
        // ["a", "a"] has the same raw length as ["a", "b"] but is a change.
        let mut set = CategorySet::new(["a", "b"]);
        assert!(set.replace(["a", "a"]));
        assert_eq!(set.as_slice(), ["a"]);
    }

    #[test]
    fn test_replace_value_ignores_non_arrays() {
        let mut set = CategorySet::new(["a"]);
        assert!(!set.replace_value(&json!("b")));
        assert!(!set.replace_value(&json!({ "categories": ["b"] })));
        assert!(!set.replace_value(&Value::Null));
        assert_eq!(set.as_slice(), ["a"]);
    }

    #[test]
    fn test_replace_value_skips_non_string_elements() {
        let mut set = CategorySet::default();
        assert!(set.replace_value(&json!(["a", 1, null, "b"])));
        assert_eq!(set.as_slice(), ["a", "b"]);
    }

    #[test]
    fn test_categories_are_case_sensitive_and_untrimmed() {
        let set = CategorySet::new(["Analytics", " ads"]);
        assert!(!set.contains("analytics"));
        assert!(!set.contains("ads"));
        assert!(set.contains(" ads"));
    }

    #[test]
    fn test_includes_all() {
        let set = CategorySet::new(["a", "b"]);
        assert!(set.includes_all(&RequiredCategories::from("a")));
        assert!(set.includes_all(&RequiredCategories::from(["b", "a"])));
        assert!(!set.includes_all(&RequiredCategories::from(["a", "c"])));
    }

    #[test]
    fn test_empty_requirement_is_vacuously_satisfied() {
        assert!(CategorySet::default().includes_all(&RequiredCategories::none()));
    }

    #[test]
    fn test_single_identifier_normalizes_to_one_element() {
        let required = RequiredCategories::from("marketing");
        assert_eq!(required.as_slice(), ["marketing"]);
        assert_eq!(RequiredCategories::from(String::from("x")).len(), 1);
    }

    #[test]
    fn test_required_from_value() {
        assert_eq!(
            RequiredCategories::from_value(&json!("a")),
            Some(RequiredCategories::from("a"))
        );
        assert_eq!(
            RequiredCategories::from_value(&json!(["a", "b", "a"])),
            Some(RequiredCategories::from(["a", "b"]))
        );
        assert_eq!(RequiredCategories::from_value(&json!(42)), None);
    }

    #[test]
    fn test_required_display() {
        assert_eq!(RequiredCategories::from(["a", "b"]).to_string(), "[a, b]");
    }
}
