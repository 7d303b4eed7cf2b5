//! Notification domain - decoding of platform push payloads.

pub(crate) mod apple;
mod errors;
mod fields;
pub(crate) mod google;
pub(crate) mod jws;
mod normalizer;

pub use errors::ParseError;
pub use jws::{decode_verified, JwsHeader};
pub use normalizer::{InboundNotification, NormalizerSettings, NotificationNormalizer};
