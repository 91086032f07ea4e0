//! Reading particle tables and writing per-particle contact results.
//!
//! Both directions use comma-separated tables with a header row, so the files
//! can be produced and inspected with ordinary spreadsheet or dataframe tools.

pub mod table;
