//! Library side of the `clade-export` command: input parsing, settings,
//! logging setup and the export run itself.

pub mod input;
pub mod logging;
pub mod pipeline;
pub mod settings;

pub use pipeline::{ArtifactRow, ArtifactStatus, ExportReport, ExportRequest, run_export};
pub use settings::Settings;
