//! Text and binary interchange formats.

mod att;
mod binary;

pub use att::{AttReadOptions, AttReader, AttWriteOptions, read_att_str, to_att_string, write_att, write_att_stream};
pub use binary::{BinaryReader, PackedFinal, PackedTransition, RecordHeader, read_binary_all, write_binary};
