//! Audio stages: concatenation, decoding/format analysis, and encoding

pub mod concat;
pub mod decoder;
pub mod encoder;

pub use concat::concatenate;
pub use decoder::decode;
pub use encoder::{encode, output_path};
