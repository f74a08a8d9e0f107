use std::io::Error as IoError;
use std::string::FromUtf8Error;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unexpected end of buffer")]
    Eof,
    #[error("varint exceeds 5 bytes")]
    VarIntTooBig,
    #[error("invalid length field: {0}")]
    InvalidLength(i32),
    #[error("unknown packet id {0:#04x}")]
    InvalidPacketId(i32),
    #[error("invalid UTF-8 string: {0}")]
    Utf8(#[from] FromUtf8Error),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("read timed out")]
    Timeout,
}
