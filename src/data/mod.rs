//! Data structures: tables, metadata, allelic profiles and distance matrices.

mod matrix;
mod metadata;
mod profiles;
mod table;

pub use matrix::{format_number, DistanceMatrix, MATRIX_INDEX_HEADER};
pub use metadata::{is_missing, Metadata, MISSING_TOKENS};
pub use profiles::{AlleleMap, AllelicProfiles, MISSING_ALLELE};
pub use table::Table;
