//! Pipeline document format for the Flowscope explorer.
//!
//! A document describes a fixed, statically-defined pipeline: an ordered list
//! of [`Step`] records with declared data inputs/outputs, a phase label table,
//! externally-supplied system inputs, declared validation loops, and a
//! hand-tuned diagram layout table. The document is read-only after load;
//! everything the explorer shows is derived from it.
//!
//! # Example
//! ```
//! let doc = flowscope_model::PipelineDoc::from_json(r#"{
//!     "title": "Demo",
//!     "summary": "two steps",
//!     "phases": { "main": "Main" },
//!     "steps": [
//!         { "id": "a", "num": 1, "name": "Fetch", "meta": "fetch it",
//!           "phase": "main", "type": "tool", "inputs": [], "outputs": ["DATA"] },
//!         { "id": "b", "num": 2, "name": "Report", "meta": "write it",
//!           "phase": "main", "type": ["llm", "validate"], "inputs": ["DATA"], "outputs": [] }
//!     ],
//!     "layout": { "positions": { "a": { "x": 0, "y": 0 }, "b": { "x": 0, "y": 200 } } }
//! }"#).unwrap();
//! assert_eq!(doc.steps.len(), 2);
//! assert!(doc.step("b").unwrap().is_hybrid());
//! ```

pub mod doc;
pub mod layout;
pub mod markup;
pub mod step;
mod type_list;

pub use doc::{PipelineDoc, ValidationLoop};
pub use layout::{Anchor, LayoutTable, OverlayDef, OverlayKind, PhasePad, Position};
pub use markup::{bold_to_markdown, render_bold, strip_bold};
pub use step::{ConditionalRun, EdgeCase, EdgeSeverity, RunKind, Step, StepType};
