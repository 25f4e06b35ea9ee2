//! Export helpers for CSV and JSON artifacts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod summary {
    use std::io::Write;
    use std::path::Path;

    use composer_mission::SuperProblem;
    use serde_json::to_writer_pretty;

    use super::{ExportError, writer_for_path};

    /// Write the structure of an assembled super-problem as pretty JSON.
    pub fn write_summary(path: &Path, problem: &SuperProblem) -> Result<(), ExportError> {
        let mut writer = writer_for_path(path)?;
        to_writer_pretty(&mut writer, &problem.summary())?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

pub mod table {
    use std::io::Write;

    use composer_core::CaseReader;
    use composer_mission::SuperProblem;

    use super::ExportError;

    const FIXED_COLUMNS: [&str; 9] = [
        "namespace",
        "mission",
        "weight",
        "phases",
        "design_variables",
        "fixed_parameters",
        "constraints",
        "terminal_output",
        "terminal_value",
    ];

    /// One CSV row per mission, followed by a column per verified shared output.
    /// Values missing from `reader` are left blank.
    pub fn write_mission_table(
        writer: &mut dyn Write,
        problem: &SuperProblem,
        reader: &impl CaseReader,
    ) -> Result<(), ExportError> {
        let mut csv = csv::Writer::from_writer(writer);
        let mut header: Vec<&str> = FIXED_COLUMNS.to_vec();
        header.extend(problem.verified_outputs().iter().map(String::as_str));
        csv.write_record(&header)?;

        for (mission, weight) in problem.missions().iter().zip(problem.weights()) {
            let terminal = mission.terminal_output().unwrap_or_default();
            let mut row = vec![
                mission.namespace().to_string(),
                mission.name().to_string(),
                weight.to_string(),
                mission
                    .trajectory()
                    .phases()
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>()
                    .join(";"),
                mission.design_variables().len().to_string(),
                mission.fixed_parameters().len().to_string(),
                mission.constraints().len().to_string(),
                terminal.to_string(),
                format_value(reader.terminal(terminal)),
            ];
            for output in problem.verified_outputs() {
                row.push(format_value(reader.scalar(&mission.path(output))));
            }
            csv.write_record(&row)?;
        }
        csv.flush()?;
        Ok(())
    }

    fn format_value(value: Option<f64>) -> String {
        value.map(|v| format!("{v:.6}")).unwrap_or_default()
    }
}

pub mod cases {
    use std::fs::File;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use chrono::Utc;
    use composer_core::{Case, CaseReader, CaseRecorder};
    use serde::{Deserialize, Serialize};
    use serde_json::to_writer_pretty;

    use super::{ExportError, writer_for_path};

    /// A case stored together with its label and UTC timestamp.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct RecordedCase {
        pub label: String,
        pub recorded_at: String,
        pub case: Case,
    }

    impl CaseReader for RecordedCase {
        fn values(&self, path: &str) -> Option<&[f64]> {
            self.case.values(path)
        }
    }

    /// Keeps every recorded case in memory and rewrites the JSON file on each record.
    #[derive(Debug)]
    pub struct JsonCaseRecorder {
        path: PathBuf,
        cases: Vec<RecordedCase>,
    }

    impl JsonCaseRecorder {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self {
                path: path.into(),
                cases: Vec::new(),
            }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        pub fn cases(&self) -> &[RecordedCase] {
            &self.cases
        }
    }

    impl CaseRecorder for JsonCaseRecorder {
        type Error = ExportError;

        fn record(&mut self, label: &str, case: &Case) -> Result<(), Self::Error> {
            self.cases.push(RecordedCase {
                label: label.to_string(),
                recorded_at: Utc::now().to_rfc3339(),
                case: case.clone(),
            });
            let mut writer = writer_for_path(&self.path)?;
            to_writer_pretty(&mut writer, &self.cases)?;
            writer.flush()?;
            Ok(())
        }
    }

    /// Read back a file written by [`JsonCaseRecorder`].
    pub fn load_cases(path: &Path) -> Result<Vec<RecordedCase>, ExportError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    /// Last case recorded under `label`.
    pub fn find_case<'a>(cases: &'a [RecordedCase], label: &str) -> Option<&'a RecordedCase> {
        cases.iter().rev().find(|c| c.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::cases::{JsonCaseRecorder, find_case, load_cases};
    use composer_core::{Case, CaseReader, CaseRecorder};

    #[test]
    fn recorder_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cases.json");
        let mut recorder = JsonCaseRecorder::new(&path);

        let mut case = Case::new();
        case.set_scalar("radius", 0.05);
        recorder.record("initial", &case).unwrap();
        case.set_scalar("radius", 0.07);
        recorder.record("final", &case).unwrap();

        let loaded = load_cases(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        let last = find_case(&loaded, "final").unwrap();
        assert_eq!(last.scalar("radius"), Some(0.07));
        assert!(!last.recorded_at.is_empty());
    }
}
