// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Ordered category -> keywords mapping

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category names mapped to their keywords, in declaration order.
///
/// Order matters: keyword matching walks the categories front to back and the
/// first hit wins, so a JSON object is read in document order rather than into
/// a hash map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    entries: Vec<(String, Vec<String>)>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a category. An existing category keeps its position and has its
    /// keywords replaced; the old keywords are returned.
    pub fn insert(&mut self, name: impl Into<String>, keywords: Vec<String>) -> Option<Vec<String>> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, keywords)),
            None => {
                self.entries.push((name, keywords));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, k)| k.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate `(category, keywords)` in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(n, k)| (n.as_str(), k.as_slice()))
    }

    /// Category names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn keywords_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.entries.iter_mut().flat_map(|(_, k)| k.iter_mut())
    }
}

impl<N, I, K> FromIterator<(N, I)> for CategoryMap
where
    N: Into<String>,
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (name, keywords) in iter {
            map.insert(name, keywords.into_iter().map(Into::into).collect());
        }
        map
    }
}

impl Serialize for CategoryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, keywords) in &self.entries {
            map.serialize_entry(name, keywords)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CategoryMapVisitor;

        impl<'de> Visitor<'de> for CategoryMapVisitor {
            type Value = CategoryMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping category names to keyword lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = CategoryMap::new();
                while let Some((name, keywords)) = access.next_entry::<String, Vec<String>>()? {
                    if map.contains(&name) {
                        return Err(de::Error::custom(format!("duplicate category {:?}", name)));
                    }
                    map.insert(name, keywords);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(CategoryMapVisitor)
    }
}
