//! Core XML parsing primitives
//!
//! This module contains the building blocks the event source is made of:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: lenient, region-at-a-time token extraction
//! - Entities: entity decoding and markup escaping with Cow
//! - Attributes: attribute list parsing
//! - Encoding: charset decoding/encoding around the UTF-8 tokenizer

pub mod attributes;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
