//! Fetch the committed offsets for a group.

pub mod request;
pub mod response;
