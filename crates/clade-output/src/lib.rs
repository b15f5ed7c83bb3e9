//! Result formatters for clade exports.
//!
//! Every writer takes already partitioned, in-memory results and returns the
//! file contents. Nothing here touches the filesystem.
//!
//! # Formats
//!
//! - **CSV / TSV** with a column layout driven by [`CsvColumnConfig`](clade_model::CsvColumnConfig)
//! - **JSON** document and **NDJSON** stream
//! - **GFF3** and NCBI **feature table** for annotated query features
//! - **Excel** workbook with one sheet per dataset

pub mod delimited;
pub mod error;
pub mod excel;
pub mod features;
pub mod json;
pub mod table;
pub mod value;

pub use delimited::{
    CSV_DELIMITER, TSV_DELIMITER, results_to_csv_string, unclassified_to_csv_string,
};
pub use error::{FormatError, Result};
pub use excel::{ExcelSheet, results_to_excel_bytes};
pub use features::{results_to_gff_string, results_to_tbl_string};
pub use json::{ErrorRecord, ResultsJson, results_to_json_string, results_to_ndjson_string};
pub use table::{Column, ColumnSource, prepare_columns};
pub use value::Cell;
