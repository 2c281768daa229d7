use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Raw `skils` field as the API sends it: either a comma-separated string or
/// a list whose string entries are skills. Non-string entries are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SkillsField {
    Text(String),
    List(Vec<serde_json::Value>),
}

/// Canonical set of lower-cased, trimmed skill names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillSet(BTreeSet<String>);

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one skill, normalizing it. Blank values are dropped.
    pub fn insert(&mut self, skill: &str) -> bool {
        let normalized = skill.trim().to_lowercase();
        if normalized.is_empty() {
            return false;
        }
        self.0.insert(normalized)
    }

    pub fn contains(&self, skill: &str) -> bool {
        self.0.contains(&skill.trim().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns `true` when any skill occurs as a case-insensitive substring of
    /// `text`. A missing text never matches.
    pub fn matches_text(&self, text: Option<&str>) -> bool {
        let Some(text) = text else {
            return false;
        };
        let haystack = text.to_lowercase();
        self.0.iter().any(|skill| haystack.contains(skill.as_str()))
    }
}

impl From<SkillsField> for SkillSet {
    fn from(value: SkillsField) -> Self {
        let mut set = SkillSet::new();
        match value {
            SkillsField::Text(text) => {
                for item in text.split(',') {
                    set.insert(item);
                }
            }
            SkillsField::List(items) => {
                for item in items.iter().filter_map(serde_json::Value::as_str) {
                    set.insert(item);
                }
            }
        }
        set
    }
}

impl<'a> FromIterator<&'a str> for SkillSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = SkillSet::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl Serialize for SkillSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for SkillSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .and_then(|value| serde_json::from_value::<SkillsField>(value).ok())
            .map(SkillSet::from)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn comma_separated_text_is_split_and_lowercased() {
        let set: SkillSet = serde_json::from_value(json!(" Rust,  PostgreSQL ,,Docker")).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["docker", "postgresql", "rust"]);
    }

    #[test]
    fn list_form_is_normalized_the_same_way() {
        let set: SkillSet = serde_json::from_value(json!(["Rust", "rust ", ""])).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains("RUST"));
    }

    #[test]
    fn non_string_entries_and_shapes_are_ignored() {
        let set: SkillSet = serde_json::from_value(json!(["Figma", null, 3, { "x": 1 }])).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["figma"]);

        let set: SkillSet = serde_json::from_value(json!(42)).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn null_yields_empty_set() {
        let set: SkillSet = serde_json::from_value(json!(null)).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn matches_text_is_case_insensitive_substring() {
        let set: SkillSet = ["react"].into_iter().collect();
        assert!(set.matches_text(Some("Senior ReactJS engineer")));
        assert!(!set.matches_text(Some("Vue developer")));
        assert!(!set.matches_text(None));
    }
}
