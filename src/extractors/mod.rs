//! Request extractors.

mod origin;

pub use origin::{Origin, FORWARDED_FOR_HEADER, UNKNOWN_IP, UNKNOWN_USER_AGENT};
