//! Request and response bodies
//!
//! Ids are plain UUIDs on the wire and decimals are serialized as strings.

pub mod provider;
pub mod barrel;
pub mod invoice;
