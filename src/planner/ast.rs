//! Query description structures
//!
//! The structural form of a read: filter predicates, ordering,
//! projection, pagination and distinct keys.

use serde_json::Value;

/// Filter operation types
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Equality: field = value
    Eq(Value),
    /// Inequality: field != value (absent fields match)
    Ne(Value),
    /// Greater than or equal: field >= value
    Gte(Value),
    /// Greater than: field > value
    Gt(Value),
    /// Less than or equal: field <= value
    Lte(Value),
    /// Less than: field < value
    Lt(Value),
    /// Membership: field in values
    In(Vec<Value>),
    /// Exclusion: field not in values (absent fields match)
    Nin(Vec<Value>),
}

impl FilterOp {
    /// Parse a `$op` operator with its operand
    pub fn parse(op: &str, operand: &Value) -> Option<FilterOp> {
        let list = || operand.as_array().cloned();
        match op {
            "$eq" => Some(FilterOp::Eq(operand.clone())),
            "$ne" => Some(FilterOp::Ne(operand.clone())),
            "$gte" => Some(FilterOp::Gte(operand.clone())),
            "$gt" => Some(FilterOp::Gt(operand.clone())),
            "$lte" => Some(FilterOp::Lte(operand.clone())),
            "$lt" => Some(FilterOp::Lt(operand.clone())),
            "$in" => list().map(FilterOp::In),
            "$nin" => list().map(FilterOp::Nin),
            _ => None,
        }
    }

    /// Returns true if this is an equality operation
    pub fn is_equality(&self) -> bool {
        matches!(self, FilterOp::Eq(_))
    }

    /// Returns true if this is a range operation
    pub fn is_range(&self) -> bool {
        matches!(self, FilterOp::Gte(_) | FilterOp::Gt(_) | FilterOp::Lte(_) | FilterOp::Lt(_))
    }

    /// Whether a record without the field can satisfy this operation
    pub fn matches_absent(&self) -> bool {
        matches!(self, FilterOp::Ne(_) | FilterOp::Nin(_))
    }

    /// Returns the operator name
    pub fn op_name(&self) -> &'static str {
        match self {
            FilterOp::Eq(_) => "$eq",
            FilterOp::Ne(_) => "$ne",
            FilterOp::Gte(_) => "$gte",
            FilterOp::Gt(_) => "$gt",
            FilterOp::Lte(_) => "$lte",
            FilterOp::Lt(_) => "$lt",
            FilterOp::In(_) => "$in",
            FilterOp::Nin(_) => "$nin",
        }
    }

    /// Apply `f` to every operand value
    pub fn map_operands(self, f: impl Fn(Value) -> Value) -> FilterOp {
        match self {
            FilterOp::Eq(v) => FilterOp::Eq(f(v)),
            FilterOp::Ne(v) => FilterOp::Ne(f(v)),
            FilterOp::Gte(v) => FilterOp::Gte(f(v)),
            FilterOp::Gt(v) => FilterOp::Gt(f(v)),
            FilterOp::Lte(v) => FilterOp::Lte(f(v)),
            FilterOp::Lt(v) => FilterOp::Lt(f(v)),
            FilterOp::In(vs) => FilterOp::In(vs.into_iter().map(&f).collect()),
            FilterOp::Nin(vs) => FilterOp::Nin(vs.into_iter().map(&f).collect()),
        }
    }
}

/// A single predicate (field + operation)
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Field name
    pub field: String,
    /// Filter operation
    pub op: FilterOp,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: FilterOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    /// Create an equality predicate
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Eq(value))
    }

    pub fn ne(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Ne(value))
    }

    pub fn gte(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Gte(value))
    }

    pub fn gt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Gt(value))
    }

    pub fn lte(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Lte(value))
    }

    pub fn lt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Lt(value))
    }

    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, FilterOp::In(values))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Field to sort by
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// `-age` sorts descending, `age` ascending
    pub fn from_prefixed(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        match spec.strip_prefix('-') {
            Some(field) if !field.is_empty() => Some(Self::desc(field)),
            Some(_) => None,
            None if spec.is_empty() => None,
            None => Some(Self::asc(spec.trim_start_matches('+'))),
        }
    }
}

/// Field projection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// All fields
    #[default]
    All,
    /// Only these fields (plus the primary key)
    Sel(Vec<String>),
    /// Every field except these
    Unsel(Vec<String>),
}

impl Projection {
    /// Whether `field` survives this projection
    pub fn includes(&self, field: &str) -> bool {
        match self {
            Projection::All => true,
            Projection::Sel(fields) => fields.iter().any(|f| f == field),
            Projection::Unsel(fields) => !fields.iter().any(|f| f == field),
        }
    }
}

/// Split `a, b,c` into trimmed, non-empty names
pub fn split_fields(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Structural description of a read
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryDescription {
    /// Predicates (AND semantics)
    pub predicates: Vec<Predicate>,
    /// Ordering by a single field
    pub order: Option<SortSpec>,
    pub projection: Projection,
    /// Records skipped after matching and ordering
    pub skip: usize,
    /// Maximum records returned; None is unlimited
    pub limit: Option<usize>,
    /// Distinct key fields, empty for none
    pub distinct: Vec<String>,
}

impl QueryDescription {
    /// Matches everything
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by(mut self, sort: SortSpec) -> Self {
        self.order = Some(sort);
        self
    }

    /// Restrict to the named fields (`"name,age"` form)
    pub fn sel(mut self, fields: &str) -> Self {
        self.projection = Projection::Sel(split_fields(fields));
        self
    }

    /// Exclude the named fields
    pub fn unsel(mut self, fields: &str) -> Self {
        self.projection = Projection::Unsel(split_fields(fields));
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// `0` means unlimited
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = if limit == 0 { None } else { Some(limit) };
        self
    }

    /// Equivalent to `skip((page - 1) * per_page).limit(per_page)`; page numbers start at 1.
    /// A skip past `usize::MAX` saturates, which reads as an empty page.
    pub fn page(self, page: usize, per_page: usize) -> Self {
        let page = page.max(1);
        self.skip((page - 1).saturating_mul(per_page)).limit(per_page)
    }

    /// Distinct on one field or a comma-separated composite key
    pub fn distinct(mut self, fields: &str) -> Self {
        self.distinct = split_fields(fields);
        self
    }

    pub fn is_distinct(&self) -> bool {
        !self.distinct.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_parse() {
        assert_eq!(FilterOp::parse("$gte", &json!(30)), Some(FilterOp::Gte(json!(30))));
        assert_eq!(
            FilterOp::parse("$in", &json!([1, 2])),
            Some(FilterOp::In(vec![json!(1), json!(2)]))
        );
        assert_eq!(FilterOp::parse("$in", &json!(1)), None);
        assert_eq!(FilterOp::parse("$regex", &json!("x")), None);
    }

    #[test]
    fn test_sort_prefix() {
        assert_eq!(SortSpec::from_prefixed("-age"), Some(SortSpec::desc("age")));
        assert_eq!(SortSpec::from_prefixed("age"), Some(SortSpec::asc("age")));
        assert_eq!(SortSpec::from_prefixed("-"), None);
    }

    #[test]
    fn test_page_matches_skip_limit() {
        let paged = QueryDescription::new().page(3, 2);
        let explicit = QueryDescription::new().skip(4).limit(2);
        assert_eq!(paged, explicit);
    }

    #[test]
    fn test_limit_zero_is_unlimited() {
        assert_eq!(QueryDescription::new().limit(0).limit, None);
    }

    #[test]
    fn test_split_fields_trims() {
        assert_eq!(split_fields("type, name"), vec!["type", "name"]);
        assert_eq!(split_fields(" ,a,"), vec!["a"]);
    }

    #[test]
    fn test_projection_includes() {
        let sel = Projection::Sel(vec!["name".into()]);
        assert!(sel.includes("name"));
        assert!(!sel.includes("age"));
        let unsel = Projection::Unsel(vec!["age".into()]);
        assert!(unsel.includes("name"));
        assert!(!unsel.includes("age"));
    }
}
