//! Wire encoder/decoder for `TransferBatch`: a length-delimited tag-value
//! scheme implementing the contracts in component 4.1 -- widened integer
//! widths, `"service"` label injection, the depth-one struct restriction,
//! and never-fail decode for unrecognized value tags.

mod batch_codec;
mod item_codec;
mod map_codec;
mod tag;
mod value_codec;
mod varint;

pub use batch_codec::{assemble_unified_frame, decode_batch, encode_batch, encode_legacy_batch, item_delta_ms, EncodeStats};
pub use item_codec::encode_item_bytes;
pub use value_codec::{decode_value, encode_value};
pub use varint::{get_string, put_string};
