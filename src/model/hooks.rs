//! Operation event hooks
//!
//! Each generated operation may publish a named event before it runs and
//! after it succeeds. Model-wide names apply to every operation unless an
//! operation overrides them.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::connector::Operation;
use crate::errors::{ModelError, ModelResult};

/// Hook names for one operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationHooks {
    pub before_event: Option<String>,
    pub after_event: Option<String>,
    /// Registered transformer applied to the `after` payload
    pub transformer: Option<String>,
}

impl OperationHooks {
    fn overlay(&self, over: &OperationHooks) -> OperationHooks {
        OperationHooks {
            before_event: over.before_event.clone().or_else(|| self.before_event.clone()),
            after_event: over.after_event.clone().or_else(|| self.after_event.clone()),
            transformer: over.transformer.clone().or_else(|| self.transformer.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before_event.is_none() && self.after_event.is_none() && self.transformer.is_none()
    }
}

/// Model-wide defaults plus per-operation overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookDefinition {
    pub(crate) defaults: OperationHooks,
    pub(crate) operations: HashMap<Operation, OperationHooks>,
}

impl HookDefinition {
    /// Effective hooks for `op`
    pub fn resolve(&self, op: Operation) -> OperationHooks {
        match self.operations.get(&op) {
            Some(over) => self.defaults.overlay(over),
            None => self.defaults.clone(),
        }
    }

    pub(crate) fn for_op(&mut self, op: Option<Operation>) -> &mut OperationHooks {
        match op {
            Some(op) => self.operations.entry(op).or_default(),
            None => &mut self.defaults,
        }
    }

    /// Later definition wins key by key
    pub(crate) fn merge(&self, over: &HookDefinition) -> HookDefinition {
        let mut merged = self.clone();
        merged.defaults = self.defaults.overlay(&over.defaults);
        for (op, hooks) in &over.operations {
            let base = merged.operations.remove(op).unwrap_or_default();
            merged.operations.insert(*op, base.overlay(hooks));
        }
        merged
    }

    /// Reads `beforeEvent`, `afterEvent`, `eventTransformer` and the per-operation
    /// forms `before<Op>Event`, `after<Op>Event`, `<op>EventTransformer`.
    /// Returns true when `key` was a hook key.
    pub(crate) fn read_key(&mut self, key: &str, value: &Value) -> ModelResult<bool> {
        let Some((op, slot)) = parse_hook_key(key) else {
            return Ok(false);
        };
        let name = match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => {
                return Err(ModelError::InvalidArgument(format!(
                    "{} must be a string, got: {}",
                    key, other
                )))
            }
        };
        let hooks = self.for_op(op);
        match slot {
            HookSlot::Before => hooks.before_event = name,
            HookSlot::After => hooks.after_event = name,
            HookSlot::Transformer => hooks.transformer = name,
        }
        Ok(true)
    }

    pub(crate) fn describe(&self) -> Value {
        let mut obj = Map::new();
        let mut put = |key: String, v: &Option<String>| {
            if let Some(v) = v {
                obj.insert(key, Value::String(v.clone()));
            }
        };
        put("beforeEvent".into(), &self.defaults.before_event);
        put("afterEvent".into(), &self.defaults.after_event);
        put("eventTransformer".into(), &self.defaults.transformer);
        for op in Operation::ALL {
            if let Some(h) = self.operations.get(&op) {
                put(format!("before{}Event", op.proper_name()), &h.before_event);
                put(format!("after{}Event", op.proper_name()), &h.after_event);
                put(format!("{}EventTransformer", op.as_str()), &h.transformer);
            }
        }
        Value::Object(obj)
    }
}

enum HookSlot {
    Before,
    After,
    Transformer,
}

fn parse_hook_key(key: &str) -> Option<(Option<Operation>, HookSlot)> {
    match key {
        "beforeEvent" => return Some((None, HookSlot::Before)),
        "afterEvent" => return Some((None, HookSlot::After)),
        "eventTransformer" => return Some((None, HookSlot::Transformer)),
        _ => {}
    }
    for op in Operation::ALL {
        let proper = op.proper_name();
        if key == format!("before{}Event", proper) {
            return Some((Some(op), HookSlot::Before));
        }
        if key == format!("after{}Event", proper) {
            return Some((Some(op), HookSlot::After));
        }
        if key == format!("{}EventTransformer", op.as_str()) {
            return Some((Some(op), HookSlot::Transformer));
        }
    }
    None
}
