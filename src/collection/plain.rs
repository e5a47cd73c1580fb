use super::{CollectionElements, CollectionFlavor};
use crate::core::{ModelError, Result, Value};
use std::cmp::Ordering;

/// Session-free collection holding a flavor tag and its elements.
///
/// Inserts follow the flavor: lists and bags append, sets skip duplicates,
/// sorted flavors keep `Value::compare` order, maps replace on key collision.
#[derive(Debug, Clone)]
pub struct PlainCollection {
    flavor: CollectionFlavor,
    elements: CollectionElements,
}

impl PlainCollection {
    pub fn new(flavor: CollectionFlavor) -> Self {
        let elements = if flavor.is_map() {
            CollectionElements::Entries(Vec::new())
        } else {
            CollectionElements::Sequence(Vec::new())
        };
        Self { flavor, elements }
    }

    /// Builds a sequence-flavored collection from values.
    pub fn of<I, V>(flavor: CollectionFlavor, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut collection = Self::new(flavor);
        for value in values {
            collection.insert(value.into())?;
        }
        Ok(collection)
    }

    /// Builds a map-flavored collection from key/value pairs.
    pub fn map_of<I, K, V>(flavor: CollectionFlavor, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        let mut collection = Self::new(flavor);
        for (key, value) in entries {
            collection.put(key.into(), value.into())?;
        }
        Ok(collection)
    }

    /// Copies `elements` in iteration order, applying the flavor's insert rules.
    pub fn from_elements(flavor: CollectionFlavor, elements: CollectionElements) -> Result<Self> {
        let mut collection = Self::new(flavor);
        match elements {
            CollectionElements::Sequence(values) => {
                for value in values {
                    collection.insert(value)?;
                }
            }
            CollectionElements::Entries(entries) => {
                for (key, value) in entries {
                    collection.put(key, value)?;
                }
            }
        }
        Ok(collection)
    }

    pub fn flavor(&self) -> CollectionFlavor {
        self.flavor
    }

    pub fn elements(&self) -> &CollectionElements {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut CollectionElements {
        &mut self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Sequence values, or an empty slice for maps.
    pub fn values(&self) -> &[Value] {
        match &self.elements {
            CollectionElements::Sequence(values) => values,
            CollectionElements::Entries(_) => &[],
        }
    }

    /// Map entries, or an empty slice for sequences.
    pub fn entries(&self) -> &[(Value, Value)] {
        match &self.elements {
            CollectionElements::Entries(entries) => entries,
            CollectionElements::Sequence(_) => &[],
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.values().iter().any(|candidate| candidate == value)
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries()
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    /// Inserts into a sequence flavor. Returns false when a set already held the value.
    pub fn insert(&mut self, value: Value) -> Result<bool> {
        let flavor = self.flavor;
        let CollectionElements::Sequence(values) = &mut self.elements else {
            return Err(ModelError::PreconditionViolation(format!(
                "cannot insert a single value into a {} collection",
                flavor.name()
            )));
        };

        if flavor.is_unique() && values.iter().any(|candidate| *candidate == value) {
            return Ok(false);
        }

        if flavor.is_sorted() {
            let position = values
                .iter()
                .position(|candidate| candidate.compare(&value) == Ordering::Greater)
                .unwrap_or(values.len());
            values.insert(position, value);
        } else {
            values.push(value);
        }
        Ok(true)
    }

    /// Puts an entry into a map flavor, returning the replaced value.
    pub fn put(&mut self, key: Value, value: Value) -> Result<Option<Value>> {
        let flavor = self.flavor;
        let CollectionElements::Entries(entries) = &mut self.elements else {
            return Err(ModelError::PreconditionViolation(format!(
                "cannot put an entry into a {} collection",
                flavor.name()
            )));
        };

        if let Some((_, existing)) = entries.iter_mut().find(|(candidate, _)| *candidate == key) {
            return Ok(Some(std::mem::replace(existing, value)));
        }

        if flavor.is_sorted() {
            let position = entries
                .iter()
                .position(|(candidate, _)| candidate.compare(&key) == Ordering::Greater)
                .unwrap_or(entries.len());
            entries.insert(position, (key, value));
        } else {
            entries.push((key, value));
        }
        Ok(None)
    }
}

impl PartialEq for PlainCollection {
    fn eq(&self, other: &Self) -> bool {
        if self.flavor != other.flavor || self.len() != other.len() {
            return false;
        }

        if self.flavor.is_order_significant() {
            return match (&self.elements, &other.elements) {
                (CollectionElements::Sequence(a), CollectionElements::Sequence(b)) => a == b,
                (CollectionElements::Entries(a), CollectionElements::Entries(b)) => a == b,
                _ => false,
            };
        }

        match (&self.elements, &other.elements) {
            (CollectionElements::Sequence(a), CollectionElements::Sequence(b)) => {
                a.iter().all(|value| b.contains(value))
            }
            (CollectionElements::Entries(a), CollectionElements::Entries(b)) => {
                a.iter().all(|entry| b.contains(entry))
            }
            _ => false,
        }
    }
}
