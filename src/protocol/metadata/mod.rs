//! Query cluster metadata.

pub mod request;
pub mod response;
