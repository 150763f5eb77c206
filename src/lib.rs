pub mod batch;
pub mod error;
pub mod heuristics;
pub mod io;
pub mod jobs;
pub mod models;
pub mod pipeline;

pub use batch::{run_batch, BatchConfig, BatchFailure, BatchReport};
pub use error::ExportError;
pub use heuristics::{is_duplicate, DetectorConfig, DuplicationDetector, Verdict};
pub use io::{expand_patterns, parse_export_json, parse_html, read_export_file, write_json};
pub use jobs::{clean_file, diagnose_file, reconcile_file, recover_file, OutputOptions};
pub use models::{DiagnosticRecord, DiagnosticSummary, DocumentNode, Export, RecoveryRecord, Stage};
pub use pipeline::{
    diagnose, summarize, AmbiguityPolicy, AsBody, AsHeader, CleanStats, Reconciler,
    RecoveryOutcome, Segmenter, SplitLeadIn,
};
