//! Moves report text between the store and external files.

use std::path::{Path, PathBuf};

use super::ReportService;
use crate::{
    ReportId,
    error::{ReportDbError, Result},
    utils::read_text_lossy,
};

impl ReportService {
    /// Writes the stored content of a report verbatim to `destination`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the report does not exist
    /// - `Io` if the file cannot be written
    pub fn export_report(&self, id: ReportId, destination: impl AsRef<Path>) -> Result<PathBuf> {
        let report = self.get_report(id)?;
        let destination = destination.as_ref();

        std::fs::write(destination, report.content()).map_err(|source| ReportDbError::Io {
            path: destination.to_path_buf(),
            source,
        })?;

        log::info!("exported report {id} to {}", destination.display());
        Ok(destination.to_path_buf())
    }

    /// Creates a report from a text file and remembers where it came from.
    ///
    /// Undecodable bytes are replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// - `Io` if the file cannot be read
    /// - `UnknownTag` / `AmbiguousTag` if a tag reference does not resolve
    pub fn import_report(
        &self,
        title: &str,
        source: impl AsRef<Path>,
        tags: &[&str],
    ) -> Result<ReportId> {
        let source = source.as_ref();
        let content = read_text_lossy(source)?;
        let source_label = source.to_string_lossy();

        self.insert_report(title, &content, Some(source_label.as_ref()), tags)
    }
}
