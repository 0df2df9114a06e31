//! Key/value store for facts about the add-on being validated.
//!
//! The install-manifest reader seeds it (`em:bootstrap`, `is_jetpack`) and the
//! engine writes back what it learns (`requires_chrome`).

use serde_json::Value;
use std::collections::BTreeMap;

pub const IS_JETPACK: &str = "is_jetpack";
pub const BOOTSTRAP: &str = "em:bootstrap";
pub const REQUIRES_CHROME: &str = "requires_chrome";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    values: BTreeMap<String, Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Truthiness of a key. Manifests spell booleans as `"true"` strings too.
    pub fn flag(&self, key: &str) -> bool {
        match self.values.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        }
    }

    pub fn is_jetpack(&self) -> bool {
        self.flag(IS_JETPACK)
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.flag(BOOTSTRAP)
    }

    pub fn requires_chrome(&self) -> bool {
        self.flag(REQUIRES_CHROME)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_string_booleans_are_flags() {
        let mut meta = Metadata::new();
        meta.set(BOOTSTRAP, "true");
        meta.set(IS_JETPACK, false);
        assert!(meta.is_bootstrapped());
        assert!(!meta.is_jetpack());
        assert!(!meta.requires_chrome());
    }
}
