//! Query executor over an in-memory record set
//!
//! Execution flow (strict order):
//! 1. Resolve predicate fields (aliases, storage names) and coerce operands
//! 2. Filter records by predicates (AND semantics)
//! 3. Apply sort (if specified)
//! 4. Collapse to first-seen distinct keys (if specified)
//! 5. Apply skip, then limit
//! 6. Apply projection

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::filters::PredicateFilter;
use super::result::{ExecutionResult, ResultDocument};
use super::sorter::ResultSorter;
use crate::errors::ModelResult;
use crate::instance::{Instance, PrimaryKeyAlias};
use crate::model::Model;
use crate::planner::{Predicate, Projection, QueryDescription, SortSpec};

/// Evaluates query descriptions against instances of one model
pub struct QueryExecutor<'a> {
    model: &'a Model,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    /// Declared name for a query field: primary-key aliases become `id`,
    /// storage names become declared names, unknown names pass through
    fn resolve_field(&self, field: &str) -> String {
        if PrimaryKeyAlias::is_alias(field) {
            return PrimaryKeyAlias::Id.as_str().to_string();
        }
        match self.model.field_by_key(field) {
            Some(spec) => spec.name().to_string(),
            None => field.to_string(),
        }
    }

    /// Predicates with resolved fields and operands coerced to the field type
    pub fn prepare(&self, predicates: &[Predicate]) -> Vec<Predicate> {
        predicates
            .iter()
            .map(|p| {
                let field = self.resolve_field(&p.field);
                let op = match self.model.field(&field) {
                    Some(spec) => p.op.clone().map_operands(|v| spec.coerce(v)),
                    None => p.op.clone(),
                };
                Predicate::new(field, op)
            })
            .collect()
    }

    /// Matched and ordered documents
    fn select(&self, records: Vec<Instance>, query: &QueryDescription) -> (usize, Vec<ResultDocument>) {
        let scanned = records.len();
        let predicates = self.prepare(&query.predicates);

        let mut documents: Vec<ResultDocument> = records
            .into_iter()
            .map(ResultDocument::new)
            .filter(|doc| PredicateFilter::matches(&doc.body, &predicates))
            .collect();

        if let Some(order) = &query.order {
            let spec = SortSpec {
                field: self.resolve_field(&order.field),
                direction: order.direction,
            };
            ResultSorter::sort(&mut documents, &spec);
        }
        (scanned, documents)
    }

    fn distinct(&self, documents: Vec<ResultDocument>, fields: &[String]) -> Vec<ResultDocument> {
        if fields.is_empty() {
            return documents;
        }
        let fields: Vec<String> = fields.iter().map(|f| self.resolve_field(f)).collect();
        let mut seen = HashSet::new();
        documents
            .into_iter()
            .filter(|doc| {
                let key: Vec<&Value> = fields.iter().map(|f| doc.field(f)).collect();
                seen.insert(serde_json::to_string(&key).unwrap_or_default())
            })
            .collect()
    }

    /// Run a query over `records`
    pub fn execute(&self, records: Vec<Instance>, query: &QueryDescription) -> ModelResult<ExecutionResult> {
        let (scanned_count, documents) = self.select(records, query);
        let matched_count = documents.len();

        let documents = self.distinct(documents, &query.distinct);
        let page = documents
            .into_iter()
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX));

        let records = page
            .map(|doc| self.project(doc, &query.projection))
            .collect::<ModelResult<Vec<_>>>()?;

        Ok(ExecutionResult {
            records,
            scanned_count,
            matched_count,
        })
    }

    /// Matching records after distinct, ignoring skip and limit
    pub fn count(&self, records: Vec<Instance>, query: &QueryDescription) -> usize {
        let (_, documents) = self.select(records, query);
        self.distinct(documents, &query.distinct).len()
    }

    /// First record in query order
    pub fn first_match(&self, records: Vec<Instance>, query: &QueryDescription) -> Option<Instance> {
        let (_, documents) = self.select(records, query);
        documents.into_iter().next().map(|doc| doc.instance)
    }

    fn project(&self, doc: ResultDocument, projection: &Projection) -> ModelResult<Instance> {
        if *projection == Projection::All {
            return Ok(doc.instance);
        }
        let mut body = Map::new();
        if let Some(pk) = doc.instance.primary_key() {
            body.insert(PrimaryKeyAlias::Id.as_str().to_string(), pk);
        }
        let projection = match projection {
            Projection::Sel(fields) => Projection::Sel(fields.iter().map(|f| self.resolve_field(f)).collect()),
            Projection::Unsel(fields) => Projection::Unsel(fields.iter().map(|f| self.resolve_field(f)).collect()),
            Projection::All => Projection::All,
        };
        for (field, value) in doc.instance.values(false) {
            if projection.includes(&field) {
                body.insert(field, value);
            }
        }
        self.model.instance(Value::Object(body), true)
    }
}
