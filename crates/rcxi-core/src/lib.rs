//! RC+ξ recursive state engine.
//!
//! An internal state vector evolves under a contractive recursive update;
//! epistemic tension ξ measures how far each step moved it. The state
//! history is clustered into attractors, checked for convergence and
//! fingerprinted spectrally. A spiderweb propagation graph spreads scalar
//! activation between nodes in a 5-D coordinate space.
//!
//! Zero I/O: pure math with no opinions about transport or persistence.

pub mod attractor;
pub mod config;
pub mod constants;
pub mod embedder;
pub mod engine;
pub mod error;
pub mod glyph;
pub mod graph;
pub mod record;
pub mod serde_compat;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod time;
pub mod vector;

pub use attractor::AttractorManifold;
pub use config::{EngineConfig, GraphConfig, Topology};
pub use constants::EPSILON;
pub use embedder::{Embedder, HashEmbedder, tokenize};
pub use engine::{EnginePhase, StateEngine};
pub use error::{RcxiError, Result};
pub use glyph::IdentityGlyph;
pub use graph::{Coordinates, PropagationGraph, SpiderwebEdge, SpiderwebNode};
pub use record::MemoryRecord;
pub use serde_compat::{CURRENT_VERSION, ImportedSession, export_json, import_json};
pub use session::{Session, StepReport};
pub use snapshot::{ConsciousnessRecord, ConsciousnessState, RcXiSnapshot};
pub use state::{RecursiveState, TensionMeasure};
