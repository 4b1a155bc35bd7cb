//! Episode data model, dataset concatenation, and the persistence seam.

pub mod assembler;
pub mod episode;

pub use assembler::{ConcatenatedDataset, DatasetAssembler, DatasetStore, JsonDatasetStore};
pub use episode::Episode;
