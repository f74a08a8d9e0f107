use std::io::{Read, Write};
use std::ops::Deref;

use crate::io::error::Error;
use crate::io::var::VarInt;
use crate::io::{Readable, Writable};

impl Readable for Box<[u8]> {
    fn read<R: Read>(buf: &mut R) -> Result<Self, Error> {
        let len = VarInt::read(buf)?.0;
        if len < 0 {
            return Err(Error::InvalidLength(len));
        }

        // take() instead of a pre-sized allocation: the length field is
        // attacker-controlled and must not drive a huge reservation.
        let mut bytes = Vec::new();
        buf.take(len as u64).read_to_end(&mut bytes)?;
        if bytes.len() != len as usize {
            return Err(Error::Eof);
        }

        Ok(bytes.into_boxed_slice())
    }
}

impl Writable for Box<[u8]> {
    fn write<W: Write>(&self, buf: &mut W) -> Result<usize, Error> {
        let written = VarInt(self.len() as i32).write(buf)?;
        buf.write_all(self)?;

        Ok(written + self.len())
    }
}

/// Byte run with no length prefix, read until the end of the enclosing
/// packet frame. Reserved for packets whose trailing payload is opaque
/// (plugin request/response channels).
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq, Default))]
pub struct RemainingBytes(pub Vec<u8>);

impl Deref for RemainingBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<u8>> for RemainingBytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl Readable for RemainingBytes {
    fn read<R: Read>(buf: &mut R) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        buf.read_to_end(&mut bytes)?;

        Ok(Self(bytes))
    }
}

impl Writable for RemainingBytes {
    fn write<W: Write>(&self, buf: &mut W) -> Result<usize, Error> {
        buf.write_all(&self.0)?;

        Ok(self.0.len())
    }
}
