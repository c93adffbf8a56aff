use std::fmt;
use std::sync::{Arc, OnceLock};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::record::Record;
use crate::core::table::Model;
use crate::core::types::Value;
use crate::query::ast::{Condition, ConditionSet, Constraints, Direction, Matcher, OrderArg, OrderTerm};
use crate::query::finder::FinderSpec;
use crate::query::matcher::RecordMatcher;
use crate::query::parser::expand_order_args;
use crate::schema::schema::ClassMethod;

/// Result of a name-dispatched call on a model or relation
#[derive(Debug)]
pub enum Dispatch {
    Record(Option<Record>),
    Records(Vec<Record>),
    Relation(Relation),
}

impl Dispatch {
    pub fn into_record(self) -> Option<Record> {
        match self {
            Dispatch::Record(record) => record,
            Dispatch::Records(records) => records.into_iter().next(),
            Dispatch::Relation(relation) => relation.first(),
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            Dispatch::Record(record) => record.into_iter().collect(),
            Dispatch::Records(records) => records,
            Dispatch::Relation(relation) => relation.to_vec(),
        }
    }
}

/// Lazy, chainable view over a model's records.
///
/// A relation captures the table's record sequence when it is built and
/// filters/orders it on first access. Chaining (`filter`, `order`, ...)
/// returns a new relation with an empty cache; the `*_mut` variants change
/// this relation in place and drop its cache. Later table mutations are
/// only observed after [`Relation::reload`].
pub struct Relation {
    model: Model,
    base: Arc<Vec<Record>>,
    conditions: ConditionSet,
    order: Vec<OrderTerm>,
    cache: OnceLock<Arc<Vec<Record>>>,
}

/// Returned by [`Relation::filter_chain`]; its only operation is `not`.
pub struct WhereChain {
    relation: Relation,
}

impl WhereChain {
    /// Append an inverted condition. `None` is an argument error, an empty
    /// set of constraints leaves the relation as it was.
    pub fn not(self, constraints: impl Into<Option<Constraints>>) -> Result<Relation> {
        let constraints = constraints.into().ok_or_else(|| Error::missing_arguments("not"))?;
        let mut relation = self.relation;
        if !constraints.is_empty() {
            relation.conditions.push(Condition::inverted(constraints));
            relation.reset();
        }
        Ok(relation)
    }
}

impl Relation {
    pub(crate) fn new(model: Model, base: Arc<Vec<Record>>) -> Self {
        Relation {
            model,
            base,
            conditions: ConditionSet::new(),
            order: Vec::new(),
            cache: OnceLock::new(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    /// Ordering terms in the order they are applied; the last one is primary.
    pub fn order_terms(&self) -> &[OrderTerm] {
        &self.order
    }

    /// `where`: narrow the relation. `None` or empty constraints keep it as is.
    pub fn filter(&self, constraints: impl Into<Option<Constraints>>) -> Relation {
        let mut relation = self.clone();
        relation.filter_mut(constraints);
        relation
    }

    /// `where!`: narrow this relation in place.
    pub fn filter_mut(&mut self, constraints: impl Into<Option<Constraints>>) -> &mut Self {
        if let Some(constraints) = constraints.into() {
            if !constraints.is_empty() {
                self.conditions.push(Condition::new(constraints));
                self.reset();
            }
        }
        self
    }

    /// `where` without arguments, for `where.not(...)`.
    pub fn filter_chain(&self) -> WhereChain {
        WhereChain {
            relation: self.clone(),
        }
    }

    pub fn filter_not(&self, constraints: impl Into<Option<Constraints>>) -> Result<Relation> {
        self.filter_chain().not(constraints)
    }

    pub fn invert_where(&self) -> Relation {
        let mut relation = self.clone();
        relation.invert_where_mut();
        relation
    }

    pub fn invert_where_mut(&mut self) -> &mut Self {
        self.conditions.invert_all();
        self.reset();
        self
    }

    /// Add ordering. Within one call the first-listed key is primary; a
    /// later `order` call takes precedence over earlier ones.
    pub fn order<I, A>(&self, args: I) -> Result<Relation>
    where
        I: IntoIterator<Item = A>,
        A: Into<OrderArg>,
    {
        let mut relation = self.clone();
        relation.order_mut(args)?;
        Ok(relation)
    }

    pub fn order_mut<I, A>(&mut self, args: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<OrderArg>,
    {
        let terms = Self::order_args("order", args)?;
        self.order.extend(terms);
        self.reset();
        Ok(self)
    }

    pub fn reorder<I, A>(&self, args: I) -> Result<Relation>
    where
        I: IntoIterator<Item = A>,
        A: Into<OrderArg>,
    {
        let mut relation = self.clone();
        relation.reorder_mut(args)?;
        Ok(relation)
    }

    pub fn reorder_mut<I, A>(&mut self, args: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<OrderArg>,
    {
        self.order = Self::order_args("reorder", args)?;
        self.reset();
        Ok(self)
    }

    fn order_args<I, A>(method: &str, args: I) -> Result<Vec<OrderTerm>>
    where
        I: IntoIterator<Item = A>,
        A: Into<OrderArg>,
    {
        let args: Vec<OrderArg> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Err(Error::missing_arguments(method));
        }
        // Sorts are applied in sequence, so the first-listed key goes last.
        let mut terms = expand_order_args(args)?;
        terms.reverse();
        Ok(terms)
    }

    /// Re-read the table and drop the cached records.
    pub fn reload(&mut self) -> &mut Self {
        self.base = self.model.snapshot();
        self.reset();
        self
    }

    fn reset(&mut self) {
        self.cache = OnceLock::new();
    }

    fn record_matcher(&self) -> RecordMatcher {
        if self.conditions.has_open_range_on("id") {
            RecordMatcher::with_max_id(self.model.max_id())
        } else {
            RecordMatcher::new()
        }
    }

    fn materialize(&self) -> Vec<Record> {
        let mut records: Vec<Record> = if self.conditions.is_empty() {
            self.base.as_ref().clone()
        } else {
            let matcher = self.record_matcher();
            self.base
                .iter()
                .filter(|record| matcher.matches(record, &self.conditions))
                .cloned()
                .collect()
        };

        for term in &self.order {
            records.sort_by(|a, b| {
                let ord = a.get(&term.field).sort_cmp(b.get(&term.field));
                match term.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        tracing::trace!(
            model = self.model.name(),
            conditions = self.conditions.len(),
            order_terms = self.order.len(),
            matched = records.len(),
            "materialized relation"
        );
        records
    }

    /// Filtered and ordered records, computed once.
    pub fn records(&self) -> &[Record] {
        self.cache
            .get_or_init(|| Arc::new(self.materialize()))
            .as_slice()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records().iter()
    }

    pub fn to_vec(&self) -> Vec<Record> {
        self.records().to_vec()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn count(&self) -> usize {
        self.len()
    }

    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn first(&self) -> Option<Record> {
        self.records().first().cloned()
    }

    pub fn last(&self) -> Option<Record> {
        self.records().last().cloned()
    }

    /// `find(:all)`
    pub fn find_all(&self) -> Relation {
        self.clone()
    }

    /// `find(:first)`
    pub fn find_first(&self) -> Option<Record> {
        self.first()
    }

    /// `find(:first, conditions)`
    pub fn find_first_by(&self, constraints: impl Into<Option<Constraints>>) -> Option<Record> {
        self.filter(constraints).first()
    }

    /// `find(nil) { |record| ... }`
    pub fn find_with<F>(&self, predicate: F) -> Option<Record>
    where
        F: Fn(&Record) -> bool,
    {
        self.records().iter().find(|record| predicate(record)).cloned()
    }

    pub fn find(&self, id: impl Into<Value>) -> Result<Record> {
        let id = id.into();
        let name = self.model.name();
        if id.is_null() {
            return Err(Error::not_found_with(
                name,
                "id",
                None,
                format!("Couldn't find {} without an ID", name),
            ));
        }

        self.find_by_id(id.clone()).ok_or_else(|| {
            Error::not_found_with(
                name,
                "id",
                Some(id.canonical().into_owned()),
                format!("Couldn't find {} with ID={}", name, id),
            )
        })
    }

    /// One record per id, failing on the first id that is missing.
    pub fn find_many<I, V>(&self, ids: I) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        ids.into_iter().map(|id| self.find(id)).collect()
    }

    /// Index lookup through the table, then re-checked against this
    /// relation's conditions.
    pub fn find_by_id(&self, id: impl Into<Value>) -> Option<Record> {
        let id = id.into();
        let position = self.model.index_position(&id)?;
        let record = self.base.get(position)?;

        // the index may be newer than this relation's snapshot
        if record.id().map(|found| found.canonical() == id.canonical()) != Some(true) {
            return None;
        }

        if self.conditions.is_empty() || self.record_matcher().matches(record, &self.conditions) {
            Some(record.clone())
        } else {
            None
        }
    }

    pub fn find_by(&self, constraints: impl Into<Option<Constraints>>) -> Result<Option<Record>> {
        let constraints = constraints.into().ok_or_else(|| Error::missing_arguments("find_by"))?;
        Ok(self.filter(constraints).first())
    }

    /// `find_by!`
    pub fn find_by_strict(&self, constraints: impl Into<Option<Constraints>>) -> Result<Record> {
        let constraints = constraints.into().ok_or_else(|| Error::missing_arguments("find_by!"))?;
        let name = self.model.name();
        self.filter(constraints)
            .first()
            .ok_or_else(|| Error::not_found(name, format!("Couldn't find {}", name)))
    }

    /// One value per record for a single field, a tuple per record otherwise.
    pub fn pluck(&self, fields: &[&str]) -> Vec<Value> {
        match fields {
            [field] => self.iter().map(|record| record.get(field).clone()).collect(),
            _ => self
                .iter()
                .map(|record| {
                    Value::Array(fields.iter().map(|f| record.get(f).clone()).collect())
                })
                .collect(),
        }
    }

    pub fn pick(&self, fields: &[&str]) -> Option<Value> {
        self.pluck(fields).into_iter().next()
    }

    pub fn ids(&self) -> Vec<Value> {
        self.pluck(&["id"])
    }

    /// Resolve a method by name: named scopes, generated `find_by_<field>`
    /// finders, dynamic finders and `find_by`/`find_by!`.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Dispatch> {
        let schema = self.model.schema();

        if let Some(scope) = schema.scope(method) {
            return Ok(Dispatch::Relation(scope(self, args)?));
        }

        if let Some(class_method) = schema.class_method(method) {
            let value = args.first().cloned().unwrap_or_default();
            return Ok(match class_method {
                ClassMethod::FindBy { field } => Dispatch::Record(
                    self.filter(Constraints::new().with(field, value_matcher(value))).first(),
                ),
                ClassMethod::FindAllBy { field } => Dispatch::Records(
                    self.filter(Constraints::new().with(field, value_matcher(value))).to_vec(),
                ),
            });
        }

        if let Some(spec) = schema.resolve_finder(method) {
            return self.run_finder(&spec, args);
        }

        match method {
            "find_by" | "find_by!" => {
                let constraints = match args.first() {
                    Some(Value::Map(map)) => Some(
                        map.iter()
                            .map(|(k, v)| (k.clone(), value_matcher(v.clone())))
                            .collect::<Constraints>(),
                    ),
                    Some(_) => {
                        return Err(Error::new(
                            ErrorKind::InvalidArgument,
                            format!("The method .{}() expects a map of conditions.", method),
                        ));
                    }
                    None => None,
                };
                if method == "find_by" {
                    Ok(Dispatch::Record(self.find_by(constraints)?))
                } else {
                    Ok(Dispatch::Record(Some(self.find_by_strict(constraints)?)))
                }
            }
            _ => Err(Error::no_method(method, self.model.name())),
        }
    }

    fn run_finder(&self, spec: &FinderSpec, args: &[Value]) -> Result<Dispatch> {
        let pairs: Vec<(&str, Value)> = spec
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.as_str(), args.get(i).cloned().unwrap_or_default()))
            .collect();

        let mut matches = self.iter().filter(|record| {
            pairs
                .iter()
                .all(|(field, value)| record.read(field).canonical() == value.canonical())
        });

        if spec.returns_all() {
            return Ok(Dispatch::Records(matches.cloned().collect()));
        }

        match matches.next() {
            Some(record) => Ok(Dispatch::Record(Some(record.clone()))),
            None if spec.bang => {
                let name = self.model.name();
                let attempted = pairs
                    .iter()
                    .map(|(field, value)| format!("{} = {}", field, value))
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(Error::not_found_with(
                    name,
                    &spec.fields.join(", "),
                    Some(attempted.clone()),
                    format!("Couldn't find {} with {}", name, attempted),
                ))
            }
            None => Ok(Dispatch::Record(None)),
        }
    }
}

/// Arrays match any of their elements, everything else by equality.
fn value_matcher(value: Value) -> Matcher {
    match value {
        Value::Array(items) => Matcher::AnyOf(items.into_iter().map(value_matcher).collect()),
        other => Matcher::Eq(other),
    }
}

impl Clone for Relation {
    /// Copies conditions and ordering; the cache is not carried over.
    fn clone(&self) -> Self {
        Relation {
            model: self.model.clone(),
            base: self.base.clone(),
            conditions: self.conditions.clone(),
            order: self.order.clone(),
            cache: OnceLock::new(),
        }
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        self.records() == other.records()
    }
}

impl PartialEq<Vec<Record>> for Relation {
    fn eq(&self, other: &Vec<Record>) -> bool {
        self.records() == other.as_slice()
    }
}

impl PartialEq<[Record]> for Relation {
    fn eq(&self, other: &[Record]) -> bool {
        self.records() == other
    }
}

impl<'a> IntoIterator for &'a Relation {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Relation")
            .field("model", &self.model.name())
            .field("conditions", &self.conditions)
            .field("order", &self.order)
            .field("loaded", &self.cache.get().is_some())
            .finish()
    }
}
