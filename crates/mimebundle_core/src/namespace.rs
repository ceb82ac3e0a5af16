//! Host namespace collaborator: named values addressed by string key.

use crate::model::object::Object;
use std::collections::{BTreeMap, HashMap};

/// Mapping-like store of named objects.
pub trait Namespace {
    /// Returns the binding for `name`, if any.
    fn get(&self, name: &str) -> Option<&Object>;

    /// Binds `name`, replacing any previous binding.
    fn set(&mut self, name: &str, value: Object);
}

impl Namespace for HashMap<String, Object> {
    fn get(&self, name: &str) -> Option<&Object> {
        HashMap::get(self, name)
    }

    fn set(&mut self, name: &str, value: Object) {
        self.insert(name.to_string(), value);
    }
}

impl Namespace for BTreeMap<String, Object> {
    fn get(&self, name: &str) -> Option<&Object> {
        BTreeMap::get(self, name)
    }

    fn set(&mut self, name: &str, value: Object) {
        self.insert(name.to_string(), value);
    }
}
