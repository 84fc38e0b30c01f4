//! Shapes graph lifecycle: load once, infer to a fixed point, freeze, compile.

use crate::error::{ShaclError, ShaclResult};
use crate::shape::{compile_shapes, CompilationWarning, Shape};
use serde::{Deserialize, Serialize};
use shapegate_store::{Fact, FactPattern, MemoryStore, QueryEngine, Snapshot, TripleSource};
use std::sync::Arc;

/// Derivation rules, applied in this order on every inference pass.
pub const INFERENCE_RULES: &[&str] = &[
    // A class that is also a node shape targets itself.
    "INSERT { ?s sh:targetClass ?s } WHERE { ?s a rdfs:Class . ?s a sh:NodeShape . NOT { ?s sh:targetClass ?s } }",
    // The property-shape analog.
    "INSERT { ?s sh:targetClass ?s } WHERE { ?s a rdfs:Class . ?s a sh:PropertyShape . NOT { ?s sh:targetClass ?s } }",
    // Path-less `sh:or` members of a property shape become property shapes on its path.
    "INSERT { ?m sh:path ?p . ?m a sh:PropertyShape } WHERE { ?s sh:path ?p . ?s sh:or/rdf:rest*/rdf:first ?m . NOT { ?m sh:path ?any } }",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaState {
    /// Nothing loaded yet.
    Empty,
    /// Raw facts loaded; inference may still add facts.
    Loaded,
    /// Read-only; compiled shapes may be handed out.
    Frozen,
}

/// Isolated scratch area holding the shapes graph.
///
/// Facts are stored without their context, so the compiler sees one flat graph.
pub struct ShapesGraph {
    scratch: MemoryStore,
    state: SchemaState,
}

impl ShapesGraph {
    pub fn new() -> Self {
        Self {
            scratch: MemoryStore::new(),
            state: SchemaState::Empty,
        }
    }

    pub fn state(&self) -> SchemaState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.scratch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scratch.is_empty()
    }

    /// Read-only view of the current scratch contents.
    pub fn source(&self) -> Snapshot {
        self.scratch.snapshot()
    }

    /// Copy schema facts into the scratch area.
    ///
    /// Only legal while the graph is empty. An empty batch leaves it empty,
    /// so a later non-empty batch still counts as the initial load.
    pub fn load(&mut self, facts: impl IntoIterator<Item = Fact>) -> ShaclResult<usize> {
        if self.state != SchemaState::Empty {
            return Err(ShaclError::SchemaLoad);
        }
        let loaded = self
            .scratch
            .insert_facts(facts.into_iter().map(|f| f.with_context(None)));
        if loaded > 0 {
            self.state = SchemaState::Loaded;
        }
        tracing::debug!(loaded, "shapes graph loaded");
        Ok(loaded)
    }

    /// Apply [`INFERENCE_RULES`] until the fact count stops changing.
    ///
    /// Returns the number of facts inferred. Running it again on a stable
    /// graph adds nothing.
    pub fn infer(&mut self, queries: &dyn QueryEngine, max_iterations: usize) -> ShaclResult<usize> {
        if self.state == SchemaState::Frozen {
            return Err(ShaclError::SchemaLoad);
        }
        let start = self.scratch.len();
        let mut size = start;
        let mut iterations = 0;
        loop {
            for rule in INFERENCE_RULES {
                let derived = queries.derive(&self.scratch.snapshot(), rule)?;
                if !derived.is_empty() {
                    self.scratch.insert_facts(derived);
                }
            }
            iterations += 1;
            let next = self.scratch.len();
            if next == size {
                break;
            }
            size = next;
            if iterations >= max_iterations {
                return Err(ShaclError::InferenceDiverged { iterations });
            }
        }
        let inferred = size - start;
        tracing::debug!(iterations, inferred, "shapes graph inference reached a fixed point");
        Ok(inferred)
    }

    /// Seal the graph; further loads and inference fail.
    pub fn freeze(&mut self) {
        self.state = SchemaState::Frozen;
    }

    /// Compile the graph into a read-only schema handle.
    pub fn compile(&self) -> ShaclResult<CompiledSchema> {
        let compiled = compile_shapes(&self.scratch.snapshot())?;
        Ok(CompiledSchema {
            shapes: compiled.shapes,
            warnings: compiled.warnings,
            facts: self.scratch.len(),
        })
    }

    /// Every fact in the scratch area, including inferred ones.
    pub fn facts(&self) -> ShaclResult<Vec<Fact>> {
        let snapshot = self.scratch.snapshot();
        let facts: Vec<Fact> = snapshot.match_facts(&FactPattern::any())?.collect();
        Ok(facts)
    }
}

impl Default for ShapesGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiled shapes shared read-only by every transaction.
#[derive(Debug, Clone, Default)]
pub struct CompiledSchema {
    pub shapes: Vec<Arc<Shape>>,
    pub warnings: Vec<CompilationWarning>,
    /// Facts in the inferred shapes graph.
    pub facts: usize,
}

impl CompiledSchema {
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// Load, infer, freeze and compile one schema batch.
pub fn build_schema(
    graph: &mut ShapesGraph,
    facts: impl IntoIterator<Item = Fact>,
    queries: &dyn QueryEngine,
    max_iterations: usize,
) -> ShaclResult<CompiledSchema> {
    graph.load(facts)?;
    if graph.is_empty() {
        return Ok(CompiledSchema::default());
    }
    graph.infer(queries, max_iterations)?;
    graph.freeze();
    graph.compile()
}
