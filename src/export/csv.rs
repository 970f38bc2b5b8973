use crate::aggregate::AggregateReport;
use crate::completeness::{AuditReport, Status};
use crate::error::ExportError;
use crate::filter::FilterResult;
use crate::rules::EvaluationResult;
use std::fs::File;
use std::path::Path;

type Writer = csv::Writer<File>;

fn create<P: AsRef<Path>>(path: P) -> Result<Writer, ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;
    Ok(csv::Writer::from_writer(file))
}

fn finish(mut writer: Writer) -> Result<(), ExportError> {
    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })
}

/// One row per (specification, element), failures joined in `Details`.
pub fn export_evaluation_csv<P: AsRef<Path>>(results: &[EvaluationResult], path: P) -> Result<(), ExportError> {
    let mut writer = create(path)?;
    writer.write_record(["Specification", "Status", "Id", "Name", "Type", "Details"])?;

    for result in results {
        for valid in &result.valid_objects {
            writer.write_record([
                result.specification.as_str(),
                "valid",
                valid.id.as_str(),
                valid.name.as_str(),
                valid.element_type.as_str(),
                "",
            ])?;
        }
        for invalid in &result.invalid_objects {
            let details = invalid
                .missing_elements
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            writer.write_record([
                result.specification.as_str(),
                "invalid",
                invalid.element.id.as_str(),
                invalid.element.name.as_str(),
                invalid.element.element_type.as_str(),
                details.as_str(),
            ])?;
        }
        for ignored in &result.ignored_objects {
            let details = serde_json::to_string(&ignored.reason)?;
            writer.write_record([
                result.specification.as_str(),
                "ignored",
                ignored.element.id.as_str(),
                ignored.element.name.as_str(),
                ignored.element.element_type.as_str(),
                details.as_str(),
            ])?;
        }
    }

    finish(writer)
}

/// One row per building/storey/code group.
pub fn export_aggregate_csv<P: AsRef<Path>>(report: &AggregateReport, path: P) -> Result<(), ExportError> {
    let mut writer = create(path)?;
    writer.write_record(["Building", "Storey", "Code", "Count", "Area", "Volume"])?;

    for (building, entry) in &report.buildings {
        for (storey, codes) in &entry.storeys {
            for (code, totals) in codes {
                writer.write_record([
                    building,
                    storey,
                    code,
                    &totals.count.to_string(),
                    &totals.area.to_string(),
                    &totals.volume.to_string(),
                ])?;
            }
        }
    }

    finish(writer)
}

/// One row per problem found by the audit.
pub fn export_audit_csv<P: AsRef<Path>>(report: &AuditReport, path: P) -> Result<(), ExportError> {
    let mut writer = create(path)?;
    writer.write_record(["Check", "Error Rate", "Id", "Name", "Type", "Section", "Property", "Value"])?;

    for check in &report.checks {
        let rate = check.error_rate.to_string();
        for object in &check.objects {
            writer.write_record([
                check.id.as_str(),
                rate.as_str(),
                object.element.id.as_str(),
                object.element.name.as_str(),
                object.element.element_type.as_str(),
                status_code(object.section),
                status_code(object.property),
                status_code(object.value),
            ])?;
        }
    }

    finish(writer)
}

fn status_code(status: Status) -> &'static str {
    match status {
        Status::Ok => "OK",
        Status::Missing => "NOK",
        Status::NotChecked => "NC",
    }
}

pub fn export_filter_csv<P: AsRef<Path>>(result: &FilterResult, path: P) -> Result<(), ExportError> {
    let mut writer = create(path)?;
    writer.write_record(["Id"])?;
    for id in &result.ids {
        writer.write_record([id])?;
    }
    finish(writer)
}
