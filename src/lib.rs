//! # bitstep
//!
//! Declarative decoding of binary buffers into trees of named values.
//!
//! A [spec::Spec] is an ordered list of steps assembled with a
//! [builder::SpecBuilder]: fields read bits through a [bit_reader::BitReader],
//! branches and guards make steps conditional, sub-specs nest or splice their
//! fields, and assertions reject malformed input. A spec is built once and can
//! decode any number of buffers, each into a fresh [tree::NamedTree].
//!
//! ## Example
//!
//! ```
//! use bitstep::{spec::Spec, value::Value};
//!
//! let mut header = Spec::builder();
//! header
//!     .name("header")
//!     .field("version", |r, _| Ok(r.read_few_bits(3)?))
//!     .field("long", |r, _| Ok(r.read_bit()?))
//!     .field("kind", |r, _| Ok(r.read_few_bits(4)?));
//!
//! let spec = Spec::define(|b| {
//!     b.nested(&header)
//!         .field("length", |r, tree| {
//!             let long = tree.get_path("header.long").and_then(Value::as_bool);
//!             Ok(if long == Some(true) { r.read_bits(16)? } else { r.read_byte()? as u32 })
//!         })
//!         .assert_previous(|len| len.and_then(Value::as_u64) != Some(0), "empty packet");
//! });
//!
//! let tree = spec.decode(&[0b010_1_0011, 0x01, 0x00]).unwrap();
//! assert_eq!(tree.get_path("header.version"), Some(&Value::U64(2)));
//! assert_eq!(tree.get("length"), Some(&Value::U64(256)));
//! ```

pub mod bit_reader;
pub mod builder;
pub mod errors;
#[cfg(feature = "serde")]
pub mod serde;
pub mod spec;
pub mod step;
pub mod tree;
pub mod value;
