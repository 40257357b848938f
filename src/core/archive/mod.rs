pub mod extract;

pub use extract::{extract_zip, ArchiveExtractor, ExtractOutcome};
