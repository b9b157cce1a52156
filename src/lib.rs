// docverify: forensic + OCR document verification
pub mod collaborators;
pub mod config;
pub mod pipeline;
pub mod types;

pub use config::VerifierConfig;
pub use pipeline::{BatchReport, DocumentVerifier};
pub use types::{
    CrossReference, Decision, Document, ErrorReport, Result, VerificationStatus, VerificationVerdict, VerifyError,
};
