pub mod types;
pub mod fields;
pub mod patterns;
pub mod extractor;
pub mod validation;

pub use types::*;
pub use extractor::extract_entities;
pub use validation::validate_extracted_entities;
