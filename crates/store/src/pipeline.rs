//! Declarative aggregation pipelines.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s, each transforming the stream of documents
//! produced by the previous one. Semantics follow the usual document-database conventions:
//!
//! - `Lookup` attaches an array of joined documents (empty when nothing joins).
//! - `Unwind` emits one document per array element and drops documents with an empty or
//!   missing array.
//! - `Group` emits one document per distinct key, in first-seen order, with the key in `_id`.
//!   An empty input produces no groups at all.
//! - `Avg`, `Max` and `Min` skip missing, null and non-numeric values and yield `null` when no
//!   numeric value was seen.

use crate::document::{get_path, remove_path, set_path, values_equal, Document};
use crate::error::StoreResult;
use crate::query::Filter;
use crate::ID_FIELD;
use serde_json::{Map, Number, Value};

/// Per-group accumulator.
#[derive(Clone, Debug, PartialEq)]
pub enum Accumulator {
    /// Arithmetic mean of the numeric values at the path.
    Avg(String),
    /// Sum of the numeric values at the path (0 when none).
    Sum(String),
    /// Largest numeric value at the path.
    Max(String),
    /// Smallest numeric value at the path.
    Min(String),
    /// Number of documents in the group.
    Count,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    /// Keep only the listed paths (plus nothing else, `_id` included only when listed).
    Include(Vec<String>),
    /// Drop the listed paths.
    Exclude(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    Match(Filter),
    Lookup {
        from: String,
        local_field: String,
        foreign_field: String,
        as_field: String,
    },
    Unwind(String),
    Group {
        /// Grouping path; `None` puts every document in a single group keyed `null`.
        key: Option<String>,
        accumulators: Vec<(String, Accumulator)>,
    },
    Project(Projection),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs the pipeline over `input`.
    ///
    /// `load` returns every document of a named collection and is called once per `Lookup`.
    pub fn run<F>(&self, input: Vec<Document>, load: F) -> StoreResult<Vec<Document>>
    where
        F: Fn(&str) -> StoreResult<Vec<Document>>,
    {
        let mut documents = input;
        for stage in &self.stages {
            documents = match stage {
                Stage::Match(filter) => documents.into_iter().filter(|d| filter.matches(d)).collect(),
                Stage::Lookup {
                    from,
                    local_field,
                    foreign_field,
                    as_field,
                } => {
                    let foreign = load(from)?;
                    lookup(documents, &foreign, local_field, foreign_field, as_field)?
                }
                Stage::Unwind(path) => unwind(documents, path)?,
                Stage::Group { key, accumulators } => group(documents, key.as_deref(), accumulators),
                Stage::Project(projection) => project(documents, projection)?,
            };
        }
        Ok(documents)
    }
}

fn lookup(
    documents: Vec<Document>,
    foreign: &[Document],
    local_field: &str,
    foreign_field: &str,
    as_field: &str,
) -> StoreResult<Vec<Document>> {
    documents
        .into_iter()
        .map(|mut document| {
            let joined: Vec<Value> = match get_path(&document, local_field) {
                Some(local) => foreign
                    .iter()
                    .filter(|f| get_path(f, foreign_field).is_some_and(|v| values_equal(v, local)))
                    .cloned()
                    .map(Value::Object)
                    .collect(),
                None => Vec::new(),
            };
            set_path(&mut document, as_field, Value::Array(joined))?;
            Ok(document)
        })
        .collect()
}

fn unwind(documents: Vec<Document>, path: &str) -> StoreResult<Vec<Document>> {
    let mut out = Vec::with_capacity(documents.len());
    for document in documents {
        let items = match get_path(&document, path) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => continue,
            Some(other) => vec![other.clone()],
        };
        for item in items {
            let mut copy = document.clone();
            set_path(&mut copy, path, item)?;
            out.push(copy);
        }
    }
    Ok(out)
}

#[derive(Debug)]
struct GroupState {
    key: Value,
    count: u64,
    slots: Vec<Slot>,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Mean { sum: f64, seen: u64 },
    Sum(f64),
    Extreme(Option<f64>),
    Count,
}

fn group(
    documents: Vec<Document>,
    key: Option<&str>,
    accumulators: &[(String, Accumulator)],
) -> Vec<Document> {
    let mut groups: Vec<GroupState> = Vec::new();

    for document in &documents {
        let group_key = key
            .and_then(|path| get_path(document, path))
            .cloned()
            .unwrap_or(Value::Null);

        let position = match groups.iter().position(|g| values_equal(&g.key, &group_key)) {
            Some(position) => position,
            None => {
                groups.push(GroupState {
                    key: group_key,
                    count: 0,
                    slots: accumulators.iter().map(|(_, acc)| initial_slot(acc)).collect(),
                });
                groups.len() - 1
            }
        };

        let state = &mut groups[position];
        state.count += 1;
        for ((_, accumulator), slot) in accumulators.iter().zip(state.slots.iter_mut()) {
            accumulate(slot, accumulator, document);
        }
    }

    groups
        .into_iter()
        .map(|state| {
            let mut out = Map::new();
            out.insert(ID_FIELD.to_string(), state.key);
            for ((name, _), slot) in accumulators.iter().zip(state.slots) {
                out.insert(name.clone(), finish_slot(slot, state.count));
            }
            out
        })
        .collect()
}

fn initial_slot(accumulator: &Accumulator) -> Slot {
    match accumulator {
        Accumulator::Avg(_) => Slot::Mean { sum: 0.0, seen: 0 },
        Accumulator::Sum(_) => Slot::Sum(0.0),
        Accumulator::Max(_) | Accumulator::Min(_) => Slot::Extreme(None),
        Accumulator::Count => Slot::Count,
    }
}

fn accumulate(slot: &mut Slot, accumulator: &Accumulator, document: &Document) {
    let number = |path: &str| get_path(document, path).and_then(Value::as_f64);
    match (slot, accumulator) {
        (Slot::Mean { sum, seen }, Accumulator::Avg(path)) => {
            if let Some(value) = number(path) {
                *sum += value;
                *seen += 1;
            }
        }
        (Slot::Sum(sum), Accumulator::Sum(path)) => {
            if let Some(value) = number(path) {
                *sum += value;
            }
        }
        (Slot::Extreme(current), Accumulator::Max(path)) => {
            if let Some(value) = number(path) {
                *current = Some(current.map_or(value, |c| c.max(value)));
            }
        }
        (Slot::Extreme(current), Accumulator::Min(path)) => {
            if let Some(value) = number(path) {
                *current = Some(current.map_or(value, |c| c.min(value)));
            }
        }
        _ => {}
    }
}

fn finish_slot(slot: Slot, count: u64) -> Value {
    match slot {
        Slot::Mean { seen: 0, .. } => Value::Null,
        Slot::Mean { sum, seen } => number_value(sum / seen as f64),
        Slot::Sum(sum) => number_value(sum),
        Slot::Extreme(value) => value.map_or(Value::Null, number_value),
        Slot::Count => Value::Number(Number::from(count)),
    }
}

fn number_value(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn project(documents: Vec<Document>, projection: &Projection) -> StoreResult<Vec<Document>> {
    match projection {
        Projection::Exclude(paths) => Ok(documents
            .into_iter()
            .map(|mut document| {
                for path in paths {
                    remove_path(&mut document, path);
                }
                document
            })
            .collect()),
        Projection::Include(paths) => documents
            .into_iter()
            .map(|document| {
                let mut out = Map::new();
                for path in paths {
                    if let Some(value) = get_path(&document, path) {
                        set_path(&mut out, path, value.clone())?;
                    }
                }
                Ok(out)
            })
            .collect(),
    }
}
