use std::fmt::{Display, Formatter};
use std::io::{Read, Write};

use crate::io::error::Error;
use crate::io::{Readable, Writable};

const SEGMENT_BITS: u32 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Compact i32 whose small values occupy less space on the wire.
///
/// [`Read more`] about it.
///
/// [`Read more`]: https://wiki.vg/Protocol#VarInt_and_VarLong
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
#[cfg_attr(test, derive(Default))]
pub struct VarInt(pub i32);

impl VarInt {
    pub const MAX_LENGTH: usize = 5;
}

impl Display for VarInt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for VarInt {
    fn from(value: i32) -> Self {
        VarInt(value)
    }
}

impl PartialEq<i32> for VarInt {
    fn eq(&self, other: &i32) -> bool {
        self.0 == *other
    }
}

impl Readable for VarInt {
    fn read<R: Read>(buf: &mut R) -> Result<Self, Error> {
        let mut value: u32 = 0;

        for shift in (0..Self::MAX_LENGTH as u32 * 7).step_by(7) {
            let mut byte = [0u8];
            buf.read_exact(&mut byte).map_err(|_| Error::Eof)?;

            value |= (u32::from(byte[0]) & SEGMENT_BITS) << shift;

            if byte[0] & CONTINUE_BIT == 0 {
                return Ok(VarInt(value as i32));
            }
        }

        Err(Error::VarIntTooBig)
    }
}

impl Writable for VarInt {
    fn write<W: Write>(&self, buf: &mut W) -> Result<usize, Error> {
        let mut value = self.0 as u32;
        let mut written = 0;

        loop {
            let mut byte = (value & SEGMENT_BITS) as u8;
            value >>= 7;

            if value != 0 {
                byte |= CONTINUE_BIT;
            }

            buf.write_all(&[byte])?;
            written += 1;

            if value == 0 {
                return Ok(written);
            }
        }
    }
}
