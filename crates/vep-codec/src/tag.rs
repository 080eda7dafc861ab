//! Wire tag constants. A tag is a single byte; unrecognized tags decode to
//! the corresponding "empty"/fallback variant rather than an error.

pub const VALUE_EMPTY: u8 = 0;
pub const VALUE_BOOL: u8 = 1;
pub const VALUE_INT32: u8 = 2;
pub const VALUE_INT64: u8 = 3;
pub const VALUE_UINT32: u8 = 4;
pub const VALUE_UINT64: u8 = 5;
pub const VALUE_FLOAT: u8 = 6;
pub const VALUE_DOUBLE: u8 = 7;
pub const VALUE_STRING: u8 = 8;
pub const VALUE_BOOL_ARRAY: u8 = 9;
pub const VALUE_INT32_ARRAY: u8 = 10;
pub const VALUE_INT64_ARRAY: u8 = 11;
pub const VALUE_UINT32_ARRAY: u8 = 12;
pub const VALUE_UINT64_ARRAY: u8 = 13;
pub const VALUE_FLOAT_ARRAY: u8 = 14;
pub const VALUE_DOUBLE_ARRAY: u8 = 15;
pub const VALUE_STRING_ARRAY: u8 = 16;
pub const VALUE_STRUCT: u8 = 17;
pub const VALUE_STRUCT_ARRAY: u8 = 18;

/// [`vep_core::IngestRecord`]/[`vep_core::TransferItem`] kind discriminant.
pub const ITEM_SIGNAL: u8 = 1;
pub const ITEM_EVENT: u8 = 2;
pub const ITEM_METRIC: u8 = 3;
pub const ITEM_LOG: u8 = 4;

pub const QUALITY_VALID: u8 = 1;
pub const QUALITY_INVALID: u8 = 2;
pub const QUALITY_NOT_AVAILABLE: u8 = 3;

pub const SEVERITY_INFO: u8 = 1;
pub const SEVERITY_WARN: u8 = 2;
pub const SEVERITY_ERROR: u8 = 3;
pub const SEVERITY_CRITICAL: u8 = 4;

pub const LOG_DEBUG: u8 = 1;
pub const LOG_INFO: u8 = 2;
pub const LOG_WARN: u8 = 3;
pub const LOG_ERROR: u8 = 4;

pub const METRIC_GAUGE: u8 = 1;
pub const METRIC_COUNTER: u8 = 2;
pub const METRIC_HISTOGRAM: u8 = 3;
