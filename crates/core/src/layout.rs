use std::path::{Path, PathBuf};

/// Logical layout of a survey output root on disk.
///
/// This is derived from a chosen root path. It does *not* perform any IO
/// itself; the CLI or other frontends create the directories.
#[derive(Debug, Clone)]
pub struct SurveyLayout {
    /// Root directory of the survey output.
    pub root: PathBuf,
    /// Directory for extracted module sections (modules).
    pub modules_dir: PathBuf,
    /// Path to the scan report (scan_report.txt).
    pub scan_report_path: PathBuf,
    /// Path to the correlated handler report (handler_report.txt).
    pub handler_report_path: PathBuf,
    /// Path to the scan run metadata (run_metadata.json).
    pub run_metadata_path: PathBuf,
}

impl SurveyLayout {
    /// Compute the default layout for a survey rooted at `root`.
    ///
    /// This does *not* touch the filesystem.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let modules_dir = root.join("modules");
        let scan_report_path = root.join("scan_report.txt");
        let handler_report_path = root.join("handler_report.txt");
        let run_metadata_path = root.join("run_metadata.json");

        Self {
            root,
            modules_dir,
            scan_report_path,
            handler_report_path,
            run_metadata_path,
        }
    }

    /// Path of an extracted artifact inside the modules directory.
    pub fn artifact_path(&self, artifact_name: &str) -> PathBuf {
        self.modules_dir.join(artifact_name)
    }
}
