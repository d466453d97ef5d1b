//! Core data model types for decoded messages and their parts.

pub mod message;
