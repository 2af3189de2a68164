//! Derived data-flow graph: source map, edge set, entry points.
//!
//! No step declares its downstream consumers. The graph is inferred once at
//! load from each step's declared `inputs`/`outputs`: every output registers
//! its producer, dotted inputs (`base.field`) inherit the base name's
//! producer, system inputs resolve to a null producer, and an edge exists
//! between two steps iff at least one of the target's inputs resolves to the
//! source. Unresolvable inputs are expected (literals/constants) and are
//! silently excluded, never an error.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use flowscope_model::{PipelineDoc, Step};

/// Typed key for a derived data edge. The `"src->tgt"` string form exists
/// only at the serialization boundary ([`fmt::Display`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
}

impl EdgeKey {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

// Scene output is the serialization boundary; keys cross it in string form.
impl serde::Serialize for EdgeKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Typed key for a declared validation loop. Structurally distinct from
/// [`EdgeKey`] so loop and data-edge highlight state can never be confused,
/// even when `from`/`to` match a real data-flow pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoopKey {
    pub from: String,
    pub to: String,
}

impl LoopKey {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn touches(&self, step_id: &str) -> bool {
        self.from == step_id || self.to == step_id
    }
}

impl fmt::Display for LoopKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.from, self.to)
    }
}

impl serde::Serialize for LoopKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A derived data-flow edge with the variable names it carries, in the
/// target step's input declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct DataEdge {
    pub source: String,
    pub target: String,
    pub variables: Vec<String>,
}

/// Variable name -> producing step id. `Some(None)` means the variable is a
/// declared system input (entry point); a missing key means no producer at
/// all.
pub type SourceMap = HashMap<String, Option<String>>;

fn base_name(var: &str) -> &str {
    var.split('.').next().unwrap_or(var)
}

/// Build the source map from step outputs, dotted-input inheritance, and the
/// system-inputs table, in that order (external data wins).
pub fn derive_sources(steps: &[Step], system_inputs: &[String]) -> SourceMap {
    let mut map: SourceMap = HashMap::new();

    for step in steps {
        for var in &step.outputs {
            if let Some(Some(prev)) = map.insert(var.clone(), Some(step.id.clone())) {
                // Last writer wins; never fatal.
                tracing::debug!(var = %var, prev = %prev, now = %step.id, "duplicate output producer");
            }
        }
    }

    // Dotted inputs with no exact producer inherit the base name's producer.
    for step in steps {
        for var in &step.inputs {
            if var.contains('.') && !map.contains_key(var.as_str()) {
                if let Some(producer) = map.get(base_name(var)).cloned() {
                    map.insert(var.clone(), producer);
                }
            }
        }
    }

    for name in system_inputs {
        map.insert(name.clone(), None);
    }

    map
}

/// Resolve an input variable to its producing step, trying the exact name
/// first and falling back to its dotted base. Returns `None` for system
/// inputs and unresolvable names alike; neither yields an edge.
pub fn resolve_producer(sources: &SourceMap, var: &str) -> Option<String> {
    if let Some(Some(id)) = sources.get(var) {
        return Some(id.clone());
    }
    if let Some(Some(id)) = sources.get(base_name(var)) {
        return Some(id.clone());
    }
    None
}

/// Derive the edge set. Iteration order of the result is derivation order
/// (target-major, inputs in declaration order), which downstream consumers
/// rely on for landing-point spread and export stability.
pub fn derive_edges(steps: &[Step], sources: &SourceMap) -> IndexMap<EdgeKey, DataEdge> {
    let mut edges: IndexMap<EdgeKey, DataEdge> = IndexMap::new();

    for target in steps {
        for var in &target.inputs {
            let Some(source_id) = resolve_producer(sources, var) else {
                continue;
            };
            // A step consuming a name it also outputs must not loop back
            // onto itself.
            if source_id == target.id {
                continue;
            }
            let key = EdgeKey::new(source_id.clone(), target.id.clone());
            edges
                .entry(key)
                .or_insert_with(|| DataEdge {
                    source: source_id,
                    target: target.id.clone(),
                    variables: Vec::new(),
                })
                .variables
                .push(var.clone());
        }
    }

    edges
}

/// All derived lookup tables, built once per document and immutable for the
/// rest of the session.
#[derive(Debug, Clone)]
pub struct DerivedGraph {
    pub sources: SourceMap,
    pub edges: IndexMap<EdgeKey, DataEdge>,
}

impl DerivedGraph {
    pub fn derive(doc: &PipelineDoc) -> Self {
        let sources = derive_sources(&doc.steps, &doc.system_inputs);
        let edges = derive_edges(&doc.steps, &sources);
        Self { sources, edges }
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&DataEdge> {
        self.edges.get(key)
    }

    /// Outbound data edges of a step, in derivation order.
    pub fn outbound(&self, step_id: &str) -> Vec<&DataEdge> {
        self.edges.values().filter(|e| e.source == step_id).collect()
    }

    /// Inbound data-edge count per target step id.
    pub fn inbound_counts(&self) -> HashMap<&str, usize> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for edge in self.edges.values() {
            *counts.entry(edge.target.as_str()).or_default() += 1;
        }
        counts
    }

    /// Steps that are the target of no derived edge.
    pub fn entry_steps<'a>(&self, doc: &'a PipelineDoc) -> Vec<&'a Step> {
        doc.steps
            .iter()
            .filter(|s| !self.edges.values().any(|e| e.target == s.id))
            .collect()
    }
}
