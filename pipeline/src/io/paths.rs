//! Artifact locations inside the public directory.

use std::path::PathBuf;

/// All artifact paths for one public directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPaths {
    pub public_dir: PathBuf,
    pub request_path: PathBuf,
    pub request_log_path: PathBuf,
    pub result_path: PathBuf,
    pub result_log_path: PathBuf,
    pub evaluation_path: PathBuf,
    pub evaluation_log_path: PathBuf,
}

impl PublicPaths {
    pub fn new(public_dir: impl Into<PathBuf>) -> Self {
        let public_dir = public_dir.into();
        Self {
            request_path: public_dir.join("last_execution_request.json"),
            request_log_path: public_dir.join("execution_requests.ndjson"),
            result_path: public_dir.join("last_execution_result.json"),
            result_log_path: public_dir.join("execution_results.ndjson"),
            evaluation_path: public_dir.join("last_evaluation_result.json"),
            evaluation_log_path: public_dir.join("evaluation_results.ndjson"),
            public_dir,
        }
    }
}
