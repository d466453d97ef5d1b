//! `emlgrab`: batch extractor for attachments embedded in EML files.
//!
//! This crate provides the core library for decoding EML message containers,
//! recovering internationalized subjects and attachment filenames, and
//! writing attachment payloads into a collision-safe output tree.

pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;
