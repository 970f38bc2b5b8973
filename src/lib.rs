//! # IFC Verifier
//!
//! Rule-based checking, filtering and aggregation of BIM element metadata.
//!
//! ## Features
//!
//! - Evaluate specifications (applicability + requirements) against elements
//! - Import IDS documents converted to JSON
//! - Group elements by building, storey and code with area/volume totals
//! - Audit property completeness
//! - Export results to CSV and JSON
//!
//! Names and values may carry the `\X2\HHHH\X0\` placeholder encoding; all
//! text matching tries the literal and decoded forms of both sides.
//!
//! ## Example
//!
//! ```no_run
//! use ifc_verifier::config::Config;
//! use ifc_verifier::loader::{load_scene, load_specifications};
//! use ifc_verifier::rules::Evaluator;
//!
//! let scene = load_scene("model.json")?;
//! let specifications = load_specifications("rules.json")?;
//! let results = Evaluator::new(&Config::default()).evaluate_all(&specifications, scene.elements());
//! for result in &results {
//!     println!("{}: {} invalid", result.specification, result.invalid_objects.len());
//! }
//! # Ok::<(), ifc_verifier::error::LoadError>(())
//! ```

pub mod accessor;
pub mod aggregate;
pub mod classifier;
pub mod codec;
pub mod completeness;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod rules;

pub use accessor::TextMatcher;
pub use aggregate::{aggregate, AggregateReport, Aggregator, GroupingRules};
pub use config::Config;
pub use model::{Element, PropertySet, PropertyValue, SceneGraph};
pub use rules::{EvaluationResult, Evaluator, Specification};
