use std::io::{Read, Write};
use std::mem;

use uuid::Uuid;

use crate::io::error::Error;
use crate::io::var::VarInt;
use crate::io::{Readable, Writable};

/// Protocol strings are length-prefixed with a 32767-character cap; UTF-8
/// may take up to three bytes per character.
const STRING_MAX_BYTES: i32 = 32767 * 3;

macro_rules! big_endian_impl {
    ($($t:ty),*) => {
        $(
            impl Readable for $t {
                fn read<R: Read>(buf: &mut R) -> Result<Self, Error> {
                    let mut bytes = [0u8; mem::size_of::<$t>()];
                    buf.read_exact(&mut bytes).map_err(|_| Error::Eof)?;

                    Ok(<$t>::from_be_bytes(bytes))
                }
            }

            impl Writable for $t {
                fn write<W: Write>(&self, buf: &mut W) -> Result<usize, Error> {
                    let bytes = self.to_be_bytes();
                    buf.write_all(&bytes)?;

                    Ok(bytes.len())
                }
            }
        )*
    }
}

big_endian_impl!(u8, i8, u16, i16, i32, i64);

impl Readable for bool {
    fn read<R: Read>(buf: &mut R) -> Result<Self, Error> {
        Ok(u8::read(buf)? != 0x00)
    }
}

impl Writable for bool {
    fn write<W: Write>(&self, buf: &mut W) -> Result<usize, Error> {
        (if *self { 0x01u8 } else { 0x00u8 }).write(buf)
    }
}

impl Readable for String {
    fn read<R: Read>(buf: &mut R) -> Result<Self, Error> {
        let len = VarInt::read(buf)?.0;
        if !(0..=STRING_MAX_BYTES).contains(&len) {
            return Err(Error::InvalidLength(len));
        }

        let mut bytes = vec![0; len as usize];
        buf.read_exact(&mut bytes).map_err(|_| Error::Eof)?;

        Ok(String::from_utf8(bytes)?)
    }
}

impl Writable for String {
    fn write<W: Write>(&self, buf: &mut W) -> Result<usize, Error> {
        let written = VarInt(self.len() as i32).write(buf)?;
        buf.write_all(self.as_bytes())?;

        Ok(written + self.len())
    }
}

impl Readable for Uuid {
    fn read<R: Read>(buf: &mut R) -> Result<Self, Error> {
        let mut bytes = [0u8; 16];
        buf.read_exact(&mut bytes).map_err(|_| Error::Eof)?;

        Ok(Uuid::from_bytes(bytes))
    }
}

impl Writable for Uuid {
    fn write<W: Write>(&self, buf: &mut W) -> Result<usize, Error> {
        buf.write_all(self.as_bytes())?;

        Ok(self.as_bytes().len())
    }
}
