//! Data loading, cleaning and feature selection
//!
//! `RawTable` holds the delimited file as text cells and performs the
//! cleaning steps; `LabeledData` is the numeric feature matrix and label
//! vector selected from the cleaned table.

pub mod labeled;
pub mod table;

pub use self::labeled::*;
pub use self::table::*;
