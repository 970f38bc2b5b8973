//! Rule model, comparison operators and the specification evaluator.

pub mod comparator;
pub mod evaluator;
pub mod ids;
pub mod operator;
pub mod specification;

pub use comparator::{compare, compare_cached, parse_number, CompareOptions, PatternCache};
pub use evaluator::{
    AbortHandle, Classification, EvaluationRequest, EvaluationResult, Evaluator, FailureReason,
    IgnoreReason, IgnoredObject, InvalidObject, MissingElement,
};
pub use ids::parse_ids_document;
pub use operator::{Expected, Operator};
pub use specification::{Applicability, Cardinality, Requirement, RequirementKind, Specification};
