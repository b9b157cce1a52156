// External collaborators: AI field extraction and the registry lookup
pub mod ai_extraction;
pub mod registry;

pub use ai_extraction::{ChatCompletionsExtractor, ExtractionRequest, FieldExtractor};
pub use registry::{CommandRegistry, RegistryLookup, RegistryProbe, RegistryStatus};
