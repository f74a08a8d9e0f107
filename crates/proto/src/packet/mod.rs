pub mod clientbound;
pub mod serverbound;

/// Declares packet structs together with their [`Readable`]/[`Writable`]
/// implementations. A synthetic encode-then-decode test is generated for
/// every packet.
///
/// [`Readable`]: crate::io::Readable
/// [`Writable`]: crate::io::Writable
macro_rules! packet {
    (
        $(
            $packet:ident {
                $($field:ident: $t:ty),* $(,)?
            }
        )*
    ) => {
        $(
            #[derive(Debug, Clone)]
            #[cfg_attr(test, derive(PartialEq, Default))]
            pub struct $packet {
                $(pub $field: $t,)*
            }

            impl crate::io::Readable for $packet {
                #[allow(unused_variables)]
                fn read<R: std::io::Read>(buf: &mut R) -> Result<Self, crate::io::Error> {
                    Ok(Self {
                        $($field: <$t as crate::io::Readable>::read(buf)?,)*
                    })
                }
            }

            impl crate::io::Writable for $packet {
                #[allow(unused_variables, unused_mut)]
                fn write<W: std::io::Write>(&self, buf: &mut W) -> Result<usize, crate::io::Error> {
                    let mut written = 0;

                    $(written += crate::io::Writable::write(&self.$field, buf)?;)*

                    Ok(written)
                }
            }
        )*

        paste::paste! {
            $(
                #[cfg(test)]
                mod [< tests_ $packet:snake >] {
                    #[test]
                    fn [< $packet:snake _roundtrip >]() {
                        crate::packet::tests::synthetic_roundtrip::<super::$packet>();
                    }
                }
            )*
        }
    };
}

/// Binds packets of one connection state and direction to their numeric
/// ids, producing an enum that reads and writes the id prefix.
macro_rules! packet_mapping {
    (
        $mapping:ident {
            $($id:literal = $packet:ident),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone)]
        pub enum $mapping {
            $($packet($packet),)*
        }

        impl $mapping {
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$packet(_) => stringify!($packet),)*
                }
            }
        }

        impl crate::io::Readable for $mapping {
            fn read<R: std::io::Read>(buf: &mut R) -> Result<Self, crate::io::Error> {
                let id = crate::io::VarInt::read(buf)?;

                match id.0 {
                    $($id => Ok(Self::$packet(<$packet as crate::io::Readable>::read(buf)?)),)*
                    other => Err(crate::io::Error::InvalidPacketId(other)),
                }
            }
        }

        impl crate::io::Writable for $mapping {
            fn write<W: std::io::Write>(&self, buf: &mut W) -> Result<usize, crate::io::Error> {
                match self {
                    $(
                        Self::$packet(p) => {
                            let written = crate::io::Writable::write(&crate::io::VarInt($id), buf)?;
                            Ok(written + crate::io::Writable::write(p, buf)?)
                        }
                    )*
                }
            }
        }
    };
}

pub(crate) use packet;
pub(crate) use packet_mapping;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;
    use std::io::Cursor;

    use crate::io::{Readable, Writable};

    pub(crate) fn synthetic_roundtrip<P>()
        where P: Default + Readable + Writable + PartialEq + Debug
    {
        let packet = P::default();

        let mut buf = Vec::new();
        let written = packet.write(&mut buf).unwrap();
        assert_eq!(written, buf.len());

        let read = P::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(packet, read);
    }
}
