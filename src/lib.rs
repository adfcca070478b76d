pub mod action;
pub mod codec;
pub mod command;
pub mod config;
pub mod correlate;
pub mod error;
pub mod payload;
pub mod query;
pub mod record;
pub mod slog;
pub mod submit;
pub mod transport;
pub mod value;

// Re-exports
pub use action::{prepare_offer, OfferRequest, Submission, WalletAction};
pub use codec::{decode, encode, parse_reference, ReferenceToken};
pub use correlate::{resolve, resolve_in, Resolution};
pub use error::*;
pub use payload::{OutboundPayload, PayloadBuilder};
pub use record::{CapData, CapabilityId, Record};
pub use value::{walk, Value};
