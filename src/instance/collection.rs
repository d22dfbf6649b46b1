//! Ordered set of instances of one model

use std::ops::Deref;

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::instance::Instance;
use crate::errors::{ModelError, ModelResult};
use crate::model::Model;

const MIXED_COLLECTION: &str = "Collection only takes an array of Model instance objects";

/// Instances of exactly one model
#[derive(Debug, Clone)]
pub struct Collection {
    model: Model,
    items: Vec<Instance>,
}

impl Collection {
    pub fn new(model: &Model, items: Vec<Instance>) -> ModelResult<Collection> {
        let mut collection = Collection {
            model: model.clone(),
            items: Vec::with_capacity(items.len()),
        };
        collection.extend(items)?;
        Ok(collection)
    }

    pub(crate) fn from_trusted(model: &Model, items: Vec<Instance>) -> Collection {
        Collection {
            model: model.clone(),
            items,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn add(&mut self, instance: Instance) -> ModelResult<()> {
        if instance.model().name() != self.model.name() {
            return Err(ModelError::InvalidArgument(MIXED_COLLECTION.to_string()));
        }
        self.items.push(instance);
        Ok(())
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = Instance>) -> ModelResult<()> {
        for item in items {
            self.add(item)?;
        }
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<Instance> {
        self.items.clone()
    }

    pub fn into_vec(self) -> Vec<Instance> {
        self.items
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.items.iter().map(Instance::to_json).collect())
    }
}

impl Deref for Collection {
    type Target = [Instance];

    fn deref(&self) -> &[Instance] {
        &self.items
    }
}

impl IntoIterator for Collection {
    type Item = Instance;
    type IntoIter = std::vec::IntoIter<Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
