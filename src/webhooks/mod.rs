//! Webhook intake: signature verification, payload parsing and the decision
//! whether a pull request event warrants a version bump.

pub mod classify;
pub mod events;
pub mod parser;
pub mod signature;

pub use classify::{ActionDecision, ClassifyPolicy, IgnoreReason, classify};
pub use events::{CommitAuthor, PrAction, PrRef, PullRequestEvent};
pub use parser::{ParseError, parse_pull_request};
pub use signature::{
    AuthenticationError, SignatureAlgorithm, SignaturePolicy, compute_sha1_signature,
    compute_signature, format_sha1_signature_header, format_signature_header,
    parse_signature_header, verify_signature,
};
