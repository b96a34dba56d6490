use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XdrError {
    #[error("Unexpected end of input: needed {needed} bytes at offset {offset}")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("Length {len} exceeds maximum {max}")]
    LengthExceeded { len: usize, max: usize },

    #[error("Unknown discriminant {value} for {type_name}")]
    UnknownDiscriminant { type_name: &'static str, value: i32 },

    #[error("Non-zero padding at offset {offset}")]
    NonZeroPadding { offset: usize },

    #[error("Invalid boolean value: {value}")]
    InvalidBool { value: u32 },

    #[error("Invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("{remaining} trailing bytes after value")]
    TrailingBytes { remaining: usize },

    #[error("Invalid record mark: {reason}")]
    InvalidRecordMark { reason: String },

    #[error("Gzip error: {reason}")]
    Gzip { reason: String },

    #[error("Invalid strkey: {reason}")]
    InvalidStrKey { reason: String },

    #[error("Invalid asset code: {code}")]
    InvalidAssetCode { code: String },
}
