//! Verification backend client: the seam used by the workflow and its
//! HTTP implementation.

mod backend;
mod http;
mod response;

pub use backend::{
    Credential, DocumentReceipt, SessionStarted, VerificationBackend, VerifiedCredential,
};
pub use http::HttpVerificationClient;
