use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};

/// A merchant profile. A message that starts with the store's `shortcut` is logged as a purchase
/// at this store.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Store {
    /// Free text, e.g. `North Vancouver`.
    location: String,
    /// Free text, e.g. `Save on Foods`.
    name: String,
    /// Free text, e.g. `food`.
    category: String,
    /// Short uppercase token matched against the start of a message, e.g. `SF`.
    shortcut: String,
}

impl Store {
    pub fn new(
        shortcut: impl Into<String>,
        location: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            name: name.into(),
            category: category.into(),
            shortcut: shortcut.into(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn shortcut(&self) -> &str {
        &self.shortcut
    }

    /// Shortcut matching is a case-sensitive prefix match on the raw message text.
    pub fn matches(&self, text: &str) -> bool {
        text.starts_with(&self.shortcut)
    }
}

/// The ordered store table. Order is priority order when matching messages.
///
/// Construction guarantees that shortcuts are non-empty, unique, and that no shortcut is a prefix
/// of another one, so the order can never change which store a message is logged against.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Stores(Vec<Store>);

impl Stores {
    pub fn new(stores: Vec<Store>) -> anyhow::Result<Self> {
        ensure!(!stores.is_empty(), "The store table is empty");
        for (i, store) in stores.iter().enumerate() {
            ensure!(
                !store.shortcut.trim().is_empty(),
                "Store '{}' has an empty shortcut",
                store.name
            );
            ensure!(
                !store.shortcut.contains(char::is_whitespace),
                "The shortcut '{}' for store '{}' contains whitespace",
                store.shortcut,
                store.name
            );
            for other in stores.iter().skip(i + 1) {
                if store.shortcut == other.shortcut {
                    bail!(
                        "The shortcut '{}' is used by both '{}' and '{}'",
                        store.shortcut,
                        store.name,
                        other.name
                    );
                }
                if other.shortcut.starts_with(&store.shortcut)
                    || store.shortcut.starts_with(&other.shortcut)
                {
                    bail!(
                        "The shortcuts '{}' ('{}') and '{}' ('{}') overlap: one is a prefix of the \
                        other",
                        store.shortcut,
                        store.name,
                        other.shortcut,
                        other.name
                    );
                }
            }
        }
        Ok(Self(stores))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Store> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Stores {
    /// The built-in store table, used when `config.json` has no `stores`.
    fn default() -> Self {
        Self(vec![
            Store::new(
                "P",
                "Lonsdale, North Vancouver",
                "Persia Foods",
                "vegetable & fruit",
            ),
            Store::new("TW", "North Vancouver", "Taiwan", "lunch"),
            Store::new("SF", "North Vancouver", "Save on Foods", "food"),
            Store::new("TT", "North Vancouver", "T&T Supermarket", "food"),
            Store::new("SP", "North Vancouver", "Shoppers", "food"),
        ])
    }
}

impl<'de> Deserialize<'de> for Stores {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let stores = Vec::<Store>::deserialize(deserializer)?;
        Stores::new(stores).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        let defaults = Stores::default();
        let validated = Stores::new(defaults.iter().cloned().collect()).unwrap();
        assert_eq!(defaults, validated);
        assert_eq!(validated.len(), 5);
    }

    #[test]
    fn test_duplicate_shortcut_rejected() {
        let err = Stores::new(vec![
            Store::new("SF", "a", "Save on Foods", "food"),
            Store::new("SF", "b", "Superfresh", "food"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("used by both"));
    }

    #[test]
    fn test_prefix_overlap_rejected() {
        let err = Stores::new(vec![
            Store::new("T", "a", "Target", "stuff"),
            Store::new("TW", "b", "Taiwan", "lunch"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("overlap"));

        // The order of the overlapping stores does not matter.
        let err = Stores::new(vec![
            Store::new("TW", "b", "Taiwan", "lunch"),
            Store::new("T", "a", "Target", "stuff"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_empty_shortcut_rejected() {
        assert!(Stores::new(vec![Store::new(" ", "a", "b", "c")]).is_err());
        assert!(Stores::new(vec![Store::new("A B", "a", "b", "c")]).is_err());
        assert!(Stores::new(Vec::new()).is_err());
    }

    #[test]
    fn test_matches_is_case_sensitive_prefix() {
        let store = Store::new("SP", "North Vancouver", "Shoppers", "food");
        assert!(store.matches("SP 5"));
        assert!(store.matches("SPX"));
        assert!(!store.matches("sp 5"));
        assert!(!store.matches(" SP 5"));
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"[
            {"shortcut": "A", "location": "x", "name": "Alpha", "category": "c"},
            {"shortcut": "AB", "location": "y", "name": "Beta", "category": "c"}
        ]"#;
        let result: Result<Stores, _> = serde_json::from_str(json);
        assert!(result.is_err());

        let json = r#"[{"shortcut": "A", "location": "x", "name": "Alpha", "category": "c"}]"#;
        let stores: Stores = serde_json::from_str(json).unwrap();
        assert_eq!(stores.iter().next().unwrap().category(), "c");
    }
}
