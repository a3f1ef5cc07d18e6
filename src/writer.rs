use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;

use crate::record::GradingRecord;

pub struct ResultWriter {
    path: PathBuf,
}

impl ResultWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the absolute path written to.
    pub fn write(&self, record: &GradingRecord) -> io::Result<PathBuf> {
        let path = absolute(&self.path)?;
        let json = serde_json::to_string(record)?;
        fs::write(&path, json)?;
        info!("wrote grading record to {}", path.display());
        Ok(path)
    }
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

pub fn summary(record: &GradingRecord, path: &Path) -> String {
    let rule = "#".repeat(55);
    let mut lines = vec![
        rule.clone(),
        "The autograder has completed grading your assignment!".to_owned(),
        format!(" * Outfile location: {}", path.display()),
    ];
    match record.error() {
        Some(err) => {
            lines.push(" ** Issue detected **".to_owned());
            lines.push(format!("    - {err}"));
            lines.push(" * Your grade could be impacted if error is not corrected.".to_owned());
        }
        None => lines.push(" ** No issue detected **".to_owned()),
    }
    lines.push(rule);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::config::{Config, Scheme, Workshop};
    use crate::record::{default_get_payload, default_post_payload, GradingKey};

    fn record(error: Option<&str>) -> GradingRecord {
        let config = Config {
            name: "ada".into(),
            workshop: Workshop::One,
            scheme: Scheme::Http,
            host: "127.0.0.1".into(),
            port: "8000".into(),
        };
        GradingRecord::new(
            &config,
            &GradingKey::generate(),
            default_post_payload(),
            default_get_payload(),
            0,
            error.map(str::to_owned),
        )
    }

    #[test]
    fn write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("results.json");
        fs::write(&target, "stale contents that are longer than nothing").unwrap();

        let written = ResultWriter::new(&target).write(&record(None)).unwrap();

        assert_eq!(written, target);
        let saved: Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(saved["STUDENT"], "ada");
        assert_eq!(saved["ERROR"], Value::Null);
    }

    #[test]
    fn summary_reports_issue() {
        let text = summary(&record(Some("connection refused")), Path::new("/tmp/results.json"));

        assert!(text.contains(" * Outfile location: /tmp/results.json"));
        assert!(text.contains(" ** Issue detected **"));
        assert!(text.contains("    - connection refused"));
    }

    #[test]
    fn summary_reports_clean_run() {
        let text = summary(&record(None), Path::new("/tmp/results.json"));

        assert!(text.contains(" ** No issue detected **"));
        assert!(!text.contains("Your grade could be impacted"));
        assert!(text.starts_with(&"#".repeat(55)));
    }
}
