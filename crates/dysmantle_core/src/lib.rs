//! Save container codec and editing core for Dysmantle saves.
//!
//! A save file is a 12-byte header plus a zlib payload whose decompressed
//! form embeds an XML document between opaque binary runs. [`core_api`]
//! is the host-facing surface; the remaining modules implement the codec
//! pipeline it drives.

pub mod catalog;
pub mod container;
pub mod core_api;
pub mod document;
pub mod layout;
