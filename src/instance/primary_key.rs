//! Primary-key accessor aliases
//!
//! Every alias reads and writes the same primary-key slot of an instance.

use std::fmt;

/// Alternate names for the primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryKeyAlias {
    /// `id`
    Id,
    /// `ID`
    IdUpper,
    /// `Id`
    IdTitle,
    /// `_id`
    Underscore,
    /// `primaryKey`
    PrimaryKey,
}

impl PrimaryKeyAlias {
    pub const ALL: [PrimaryKeyAlias; 5] = [
        PrimaryKeyAlias::Id,
        PrimaryKeyAlias::IdUpper,
        PrimaryKeyAlias::IdTitle,
        PrimaryKeyAlias::Underscore,
        PrimaryKeyAlias::PrimaryKey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryKeyAlias::Id => "id",
            PrimaryKeyAlias::IdUpper => "ID",
            PrimaryKeyAlias::IdTitle => "Id",
            PrimaryKeyAlias::Underscore => "_id",
            PrimaryKeyAlias::PrimaryKey => "primaryKey",
        }
    }

    /// Exact, case-sensitive match
    pub fn parse(name: &str) -> Option<PrimaryKeyAlias> {
        PrimaryKeyAlias::ALL.iter().copied().find(|a| a.as_str() == name)
    }

    pub fn is_alias(name: &str) -> bool {
        Self::parse(name).is_some()
    }
}

impl fmt::Display for PrimaryKeyAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
