pub mod columns;
pub mod dataset;
pub mod error;
pub mod outcome;
pub mod params;
pub mod partition;
pub mod selection;

pub use columns::{ColumnCategories, ColumnFlag, CsvColumnConfig, default_categories};
pub use dataset::{
    AaMotifsDesc, CladeNodeAttrDesc, DatasetBundle, DatasetCatalog, Descriptors,
    PhenotypeAttrDesc, RefNodeSearchDesc, RefNodesDesc,
};
pub use error::{ModelError, Result};
pub use outcome::{
    AnalysisOutcome, AnalysisResult, FailureOutcome, FeatureAnnotation, GeneTranslation,
    RawOutcome, Strand, SuccessOutcome, Translation,
};
pub use params::{ExportParams, ZipData, ZipEntries, ZipEntry, mime};
pub use partition::{
    Partitioned, dataset_names, map_failures, map_successes, outcomes_without_dataset_suggestion,
    partition_by_dataset, partition_by_outcome,
};
pub use selection::TriState;
