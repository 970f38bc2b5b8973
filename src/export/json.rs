use crate::error::ExportError;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes any report as pretty-printed JSON.
pub fn export_json<T, P>(report: &T, path: P) -> Result<(), ExportError>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path_ref = path.as_ref();
    let json = serde_json::to_string_pretty(report)?;

    let mut file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    file.write_all(json.as_bytes())
        .map_err(|e| ExportError::WriteError {
            message: e.to_string(),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::EvaluationResult;

    #[test]
    fn writes_camel_case_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let results = vec![EvaluationResult {
            specification: "walls".into(),
            ..EvaluationResult::default()
        }];

        export_json(&results, &path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written[0]["specification"], "walls");
        assert!(written[0]["validObjects"].is_array());
        assert!(written[0]["ignoredObjects"].is_array());
    }

    #[test]
    fn missing_directory_is_reported() {
        let err = export_json(&1, "/no/such/dir/out.json").unwrap_err();
        assert!(matches!(err, ExportError::FileCreate { .. }));
    }
}
