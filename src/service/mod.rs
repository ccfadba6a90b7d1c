pub mod importer;
pub mod normalizer;

pub use importer::ImportService;
pub use normalizer::{normalize, Normalized};
