use nalgebra::Vector3;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Something that can describe itself as CSV columns.
pub trait Loggable {
    fn log_header(&self) -> String;
    fn log_value(&self) -> String;
}

/// Destination that owns the header/value layout of emitted logs.
pub trait LogSink {
    fn add_log_list(&mut self, loggable: &dyn Loggable);
    fn copy_file_to_log_directory(&mut self, path: &Path);
}

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDirectory { path: PathBuf, source: std::io::Error },
    #[error("failed to write log file: {0}")]
    Write(#[from] std::io::Error),
}

/// Column header for a 3-vector, e.g. `force_b_x[N],force_b_y[N],force_b_z[N],`.
pub fn vector_header(name: &str, frame: &str, unit: &str) -> String {
    ["x", "y", "z"]
        .iter()
        .map(|axis| format!("{name}_{frame}_{axis}[{unit}],"))
        .collect()
}

pub fn vector_value(vector: &Vector3<f64>) -> String {
    vector.iter().map(|v| format!("{v:.10e},")).collect()
}

pub fn scalar_header(name: &str, unit: &str) -> String {
    format!("{name}[{unit}],")
}

pub fn scalar_value(value: f64) -> String {
    format!("{value:.10e},")
}

/// Row-oriented CSV collector.
///
/// Rows are always kept in memory; with a log directory they are also
/// written to `<directory>/<file_name>`. Trials after the first are
/// separated in the file by a `# trial <n>` line.
#[derive(Debug)]
pub struct Logger {
    file_name: String,
    directory: Option<PathBuf>,
    enabled: bool,
    headers: Vec<String>,
    rows: Vec<String>,
    trial: u32,
    trial_start: usize,
    archived: Vec<PathBuf>,
    file: Option<File>,
}

impl Logger {
    pub fn in_memory(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            directory: None,
            enabled: true,
            headers: Vec::new(),
            rows: Vec::new(),
            trial: 0,
            trial_start: 0,
            archived: Vec::new(),
            file: None,
        }
    }

    pub fn with_directory(file_name: &str, directory: &Path) -> Result<Self, LoggerError> {
        fs::create_dir_all(directory).map_err(|source| LoggerError::CreateDirectory {
            path: directory.to_path_buf(),
            source,
        })?;
        let file = File::create(directory.join(file_name))?;
        info!("Logging to {}", directory.join(file_name).display());

        Ok(Self {
            directory: Some(directory.to_path_buf()),
            file: Some(file),
            ..Self::in_memory(file_name)
        })
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Add a column block that is not tied to a registered loggable.
    pub fn add_header(&mut self, header: String) {
        self.headers.push(header);
    }

    pub fn header_line(&self) -> String {
        self.headers.concat()
    }

    pub fn write_headers(&mut self) -> Result<(), LoggerError> {
        let line = self.header_line();
        self.write_line(&line)
    }

    /// Append one row built from `loggables`, in the order they are given.
    pub fn write_values<'a, I>(&mut self, loggables: I) -> Result<(), LoggerError>
    where
        I: IntoIterator<Item = &'a dyn Loggable>,
    {
        if !self.enabled {
            return Ok(());
        }
        let row: String = loggables.into_iter().map(|l| l.log_value()).collect();
        self.write_line(&row)?;
        self.rows.push(row);
        Ok(())
    }

    /// Append a pre-formatted row.
    pub fn write_row(&mut self, row: String) -> Result<(), LoggerError> {
        if !self.enabled {
            return Ok(());
        }
        self.write_line(&row)?;
        self.rows.push(row);
        Ok(())
    }

    /// Start a new trial: rows written from here on belong to it.
    pub fn begin_trial(&mut self) -> Result<(), LoggerError> {
        self.trial += 1;
        self.trial_start = self.rows.len();
        if self.enabled {
            let marker = format!("# trial {}", self.trial);
            self.write_line(&marker)?;
        }
        Ok(())
    }

    /// Every row since creation, across trials.
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn trial_rows(&self) -> &[String] {
        &self.rows[self.trial_start..]
    }

    /// Zero-based index of the current trial.
    pub fn trial(&self) -> u32 {
        self.trial
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn archived_files(&self) -> &[PathBuf] {
        &self.archived
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    fn write_line(&mut self, line: &str) -> Result<(), LoggerError> {
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}

impl LogSink for Logger {
    fn add_log_list(&mut self, loggable: &dyn Loggable) {
        self.headers.push(loggable.log_header());
    }

    fn copy_file_to_log_directory(&mut self, path: &Path) {
        let Some(directory) = self.directory.as_ref() else {
            self.archived.push(path.to_path_buf());
            return;
        };
        let Some(file_name) = path.file_name() else {
            warn!("Cannot archive {}: not a file path", path.display());
            return;
        };

        let destination = directory.join(file_name);
        match fs::copy(path, &destination) {
            Ok(_) => self.archived.push(destination),
            Err(e) => warn!("Failed to archive {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(Vector3<f64>);

    impl Loggable for Constant {
        fn log_header(&self) -> String {
            vector_header("constant", "b", "N")
        }

        fn log_value(&self) -> String {
            vector_value(&self.0)
        }
    }

    #[test]
    fn test_vector_header() {
        assert_eq!(
            vector_header("torque", "b", "Nm"),
            "torque_b_x[Nm],torque_b_y[Nm],torque_b_z[Nm],"
        );
    }

    #[test]
    fn test_rows_follow_registration() {
        let a = Constant(Vector3::new(1.0, 2.0, 3.0));
        let b = Constant(Vector3::zeros());
        let mut logger = Logger::in_memory("test.csv");

        logger.add_log_list(&a);
        logger.add_log_list(&b);
        logger.write_values([&a as &dyn Loggable, &b]).unwrap();

        assert_eq!(logger.headers().len(), 2);
        assert_eq!(logger.rows().len(), 1);
        assert!(logger.rows()[0].starts_with("1.0000000000e0,"));
        assert_eq!(logger.rows()[0].matches(',').count(), 6);
    }

    #[test]
    fn test_disabled_logger_skips_rows() {
        let mut logger = Logger::in_memory("test.csv");
        logger.set_enabled(false);
        logger.write_row("1,2,".to_string()).unwrap();
        assert!(logger.rows().is_empty());
    }

    #[test]
    fn test_trial_rows_restart_per_trial() {
        let mut logger = Logger::in_memory("test.csv");
        logger.write_row("1,".to_string()).unwrap();
        logger.write_row("2,".to_string()).unwrap();

        logger.begin_trial().unwrap();
        logger.write_row("3,".to_string()).unwrap();

        assert_eq!(logger.trial(), 1);
        assert_eq!(logger.rows().len(), 3);
        assert_eq!(logger.trial_rows(), &["3,".to_string()]);
    }

    #[test]
    fn test_archive_without_directory_records_path() {
        let mut logger = Logger::in_memory("test.csv");
        logger.copy_file_to_log_directory(Path::new("config/disturbances.json"));
        assert_eq!(logger.archived_files(), &[PathBuf::from("config/disturbances.json")]);
    }
}
