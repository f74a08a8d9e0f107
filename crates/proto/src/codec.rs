use std::io::{Cursor, Read};

use aes::Aes128;
use cfb8::cipher::{AsyncStreamCipher, NewCipher};
use cfb8::Cfb8;
use flate2::bufread::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;

use crate::io::{Error, Readable, VarInt, Writable};

/// 16-byte shared secret key as described [`here`].
///
/// The secret doubles as the IV: both CFB8 streams are initialized with
/// `key = iv = secret`.
///
/// [`here`]: https://wiki.vg/Protocol_Encryption#Symmetric_Encryption
pub type CipherKey = [u8; 16];

pub struct CipherContext {
    cipher: Cfb8<Aes128>,
}

impl CipherContext {
    pub fn new(key: CipherKey) -> Self {
        Self {
            cipher: Cfb8::new_from_slices(&key, &key).expect("key and iv are exactly 16 bytes"),
        }
    }

    pub fn encrypt(&mut self, buf: &mut [u8]) {
        self.cipher.encrypt(buf)
    }

    pub fn decrypt(&mut self, buf: &mut [u8]) {
        self.cipher.decrypt(buf)
    }
}

pub struct CompressionContext {
    threshold: usize,
    compression: Compression,
    scratch: Vec<u8>,
}

impl CompressionContext {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            compression: Compression::default(),
            scratch: Vec::new(),
        }
    }
}

pub struct ReadableCodec {
    // Accumulates raw input until at least one whole frame is present
    buf: Vec<u8>,
    compression: Option<CompressionContext>,
    cipher: Option<CipherContext>,
}

impl ReadableCodec {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            // Both codec features start disabled; the login state machine
            // switches them on mid-stream.
            compression: None,
            cipher: None,
        }
    }

    pub fn enable_compression(&mut self, context: CompressionContext) {
        self.compression = Some(context)
    }

    /// Switches decryption on. Bytes already buffered at this point were
    /// written by the peer after it enabled its own cipher (the packet
    /// that triggered the switch has been consumed), so they are
    /// decrypted here rather than left as plaintext residue.
    pub fn enable_encryption(&mut self, mut context: CipherContext) {
        context.decrypt(&mut self.buf);
        self.cipher = Some(context)
    }

    pub fn append(&mut self, bytes: &[u8]) {
        let start = self.buf.len();
        self.buf.extend_from_slice(bytes);

        if let Some(cipher) = &mut self.cipher {
            cipher.decrypt(&mut self.buf[start..])
        }
    }

    /// Extracts the next whole packet from the buffer, or `None` if more
    /// input is needed.
    pub fn next<P: Readable>(&mut self) -> Result<Option<P>, Error> {
        let mut cursor = Cursor::new(self.buf.as_slice());

        let length = match VarInt::read(&mut cursor) {
            Ok(length) => length.0,
            Err(Error::Eof) => return Ok(None),
            Err(e) => return Err(e),
        };
        if length < 0 {
            return Err(Error::InvalidLength(length));
        }

        let header = cursor.position() as usize;
        let length = length as usize;
        if self.buf.len() - header < length {
            return Ok(None);
        }

        let frame = &self.buf[header..header + length];

        let packet = if let Some(ctx) = &mut self.compression {
            let mut frame = Cursor::new(frame);
            let data_length = VarInt::read(&mut frame)?;

            if data_length == 0 {
                P::read(&mut frame)?
            } else {
                ctx.scratch.clear();
                let at = frame.position() as usize;
                ZlibDecoder::new(&frame.get_ref()[at..]).read_to_end(&mut ctx.scratch)?;

                P::read(&mut Cursor::new(ctx.scratch.as_slice()))?
            }
        } else {
            P::read(&mut Cursor::new(frame))?
        };

        self.buf.drain(..header + length);

        Ok(Some(packet))
    }

    pub fn buf(&self) -> &[u8] {
        &self.buf
    }
}

pub struct WritableCodec {
    // Holds the serialized packet body between write() entry and framing;
    // cleared before the method returns
    buf: Vec<u8>,
    compression: Option<CompressionContext>,
    cipher: Option<CipherContext>,
}

impl WritableCodec {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            compression: None,
            cipher: None,
        }
    }

    pub fn enable_compression(&mut self, context: CompressionContext) {
        self.compression = Some(context)
    }

    pub fn enable_encryption(&mut self, context: CipherContext) {
        self.cipher = Some(context)
    }

    /// Serializes, frames, and (when enabled) compresses and encrypts a
    /// packet into `out`, ready to be flushed to the stream.
    pub fn write(&mut self, packet: &impl Writable, out: &mut Vec<u8>) -> Result<(), Error> {
        let start = out.len();
        packet.write(&mut self.buf)?;

        if let Some(ctx) = &mut self.compression {
            let (data_length, data) = if self.buf.len() >= ctx.threshold {
                ctx.scratch.clear();
                ZlibEncoder::new(self.buf.as_slice(), ctx.compression)
                    .read_to_end(&mut ctx.scratch)?;

                (self.buf.len(), ctx.scratch.as_slice())
            } else {
                (0, self.buf.as_slice())
            };

            let mut data_length_field = [0u8; VarInt::MAX_LENGTH];
            let data_length_len =
                VarInt(data_length as i32).write(&mut data_length_field.as_mut_slice())?;

            VarInt((data_length_len + data.len()) as i32).write(out)?;
            out.extend_from_slice(&data_length_field[..data_length_len]);
            out.extend_from_slice(data);
        } else {
            VarInt(self.buf.len() as i32).write(out)?;
            out.extend_from_slice(&self.buf);
        }

        self.buf.clear();

        if let Some(cipher) = &mut self.cipher {
            cipher.encrypt(&mut out[start..]);
        }

        Ok(())
    }
}
