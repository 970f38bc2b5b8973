pub mod csv;
pub mod json;

pub use crate::error::ExportError;
pub use csv::{export_aggregate_csv, export_audit_csv, export_evaluation_csv, export_filter_csv};
pub use json::export_json;
