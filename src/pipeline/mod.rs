// Verification pipeline stages
pub mod batch;
pub mod decision;
pub mod forensics;
pub mod normalizer;
pub mod ocr_engine;
pub mod patterns;
pub mod preprocess;
pub mod verifier;

pub use batch::{BatchEntry, BatchInput, BatchReport, BatchSummary};
pub use decision::{DecisionEngine, DecisionInputs, DecisionOutcome};
pub use forensics::ForensicAnalyzer;
pub use normalizer::PageNormalizer;
pub use ocr_engine::{TesseractCli, TextRecognizer};
pub use patterns::PatternValidator;
pub use preprocess::Preprocessor;
pub use verifier::DocumentVerifier;
