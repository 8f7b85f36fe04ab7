//! I/O Module: batch inputs and output artifacts
//!
//! Inputs are an identifier list and one coordinate table per structure.
//! Outputs are the results and times tables, one landscape file per
//! computed structure, and the list of structures lacking the required
//! Betti dimension with a companion diagram table.

mod coordinates;
mod tables;

pub use coordinates::{clean_coordinate, parse_coordinates, read_identifier_list, CoordinateSource, CsvDirectory};
pub use tables::{
    read_results_table, read_two_column, write_lacking_dimension, BatchWriter, TableWriter, LANDSCAPE_DIR,
    RESULTS_TABLE, TIMES_TABLE,
};
