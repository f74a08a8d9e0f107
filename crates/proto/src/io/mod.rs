pub use crate::io::array::RemainingBytes;
pub use crate::io::error::Error;
pub use crate::io::var::VarInt;

mod array;
mod error;
mod primitives;
mod var;

use std::io::{Read, Write};

/// Reads itself from the passed instance of [`Read`].
///
/// Implemented by every value (primitives included) that can arrive from
/// the peer over the wire. Reading is fully synchronous: the source is
/// always an in-memory buffer that the codec has already framed, never
/// the Tokio stream itself.
pub trait Readable {
    fn read<R: Read>(buf: &mut R) -> Result<Self, Error>
        where Self: Sized;
}

/// Writes itself to the passed instance of [`Write`].
///
/// Implemented by every value that can be sent to the peer. Writing is
/// fully synchronous and targets an in-memory buffer; the codec frames
/// and flushes it afterwards.
///
/// On success returns the number of written bytes.
pub trait Writable {
    fn write<W: Write>(&self, buf: &mut W) -> Result<usize, Error>;
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fmt::Debug;
    use std::io::Cursor;

    use crate::io::{Readable, Writable};

    pub(crate) fn assert_roundtrip<RW>(value: &RW)
        where RW: Readable + Writable + PartialEq + Debug
    {
        let mut buf = Vec::new();
        let written = value.write(&mut buf).unwrap();
        assert_eq!(written, buf.len());

        let read = RW::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(*value, read);
    }
}
