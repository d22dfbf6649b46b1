//! Connector operations and capability sets

use std::fmt;

/// Operations a connector may implement. Each one backs a generated model method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Create,
    FindById,
    FindAll,
    Query,
    Update,
    Delete,
    DeleteAll,
    Distinct,
    Count,
    FindAndModify,
    Upsert,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::Create,
        Operation::FindById,
        Operation::FindAll,
        Operation::Query,
        Operation::Update,
        Operation::Delete,
        Operation::DeleteAll,
        Operation::Distinct,
        Operation::Count,
        Operation::FindAndModify,
        Operation::Upsert,
    ];

    /// Method name, e.g. `findByID`
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::FindById => "findByID",
            Operation::FindAll => "findAll",
            Operation::Query => "query",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::DeleteAll => "deleteAll",
            Operation::Distinct => "distinct",
            Operation::Count => "count",
            Operation::FindAndModify => "findAndModify",
            Operation::Upsert => "upsert",
        }
    }

    /// Capitalized name used in hook keys, e.g. `beforeFindByIDEvent`
    pub fn proper_name(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }

    pub fn parse(name: &str) -> Option<Operation> {
        Operation::ALL.iter().copied().find(|op| op.as_str() == name)
    }

    fn bit(&self) -> u16 {
        1 << (*self as u16)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Set of operations a connector implements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities(u16);

impl Capabilities {
    pub fn all() -> Self {
        Operation::ALL.iter().fold(Self::none(), |caps, op| caps.with(*op))
    }

    pub fn none() -> Self {
        Capabilities(0)
    }

    pub fn with(self, op: Operation) -> Self {
        Capabilities(self.0 | op.bit())
    }

    pub fn without(self, op: Operation) -> Self {
        Capabilities(self.0 & !op.bit())
    }

    pub fn contains(&self, op: Operation) -> bool {
        self.0 & op.bit() != 0
    }

    /// Operations in declaration order
    pub fn operations(&self) -> Vec<Operation> {
        Operation::ALL
            .iter()
            .copied()
            .filter(|op| self.contains(*op))
            .collect()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Operation::FindById.as_str(), "findByID");
        assert_eq!(Operation::FindById.proper_name(), "FindByID");
        assert_eq!(Operation::DeleteAll.proper_name(), "DeleteAll");
        assert_eq!(Operation::parse("findAndModify"), Some(Operation::FindAndModify));
        assert_eq!(Operation::parse("explode"), None);
    }

    #[test]
    fn test_capability_set() {
        let caps = Capabilities::all().without(Operation::DeleteAll);
        assert!(caps.contains(Operation::Create));
        assert!(!caps.contains(Operation::DeleteAll));
        assert_eq!(caps.operations().len(), Operation::ALL.len() - 1);
        assert!(Capabilities::none().operations().is_empty());
    }
}
