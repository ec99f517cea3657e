//! Wire types for the JSON / form API.

pub mod messages;
