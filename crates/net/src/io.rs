use std::fmt::Debug;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::trace;

use basalt_proto::codec::{ReadableCodec, WritableCodec};
use basalt_proto::io::{Error, Readable, Writable};

const READER_BUF_SIZE: usize = 512;

/// How long a connection may sit silent mid-exchange before it is
/// written off.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Reader<S> {
    conn_id: i32,
    stream: S,
    codec: ReadableCodec,
    buf: [u8; READER_BUF_SIZE],
}

impl<S: AsyncRead + Unpin> Reader<S> {
    pub fn new(conn_id: i32, stream: S, codec: ReadableCodec) -> Self {
        Self {
            conn_id,
            stream,
            codec,
            buf: [0; READER_BUF_SIZE],
        }
    }

    /// Reads frames off the stream until a whole packet of type `P` is
    /// available.
    pub async fn read<P: Readable + Debug>(&mut self) -> Result<P, Error> {
        loop {
            if let Some(packet) = self.codec.next()? {
                trace!("[{}] < {:?}", self.conn_id, packet);

                return Ok(packet);
            }

            match timeout(READ_TIMEOUT, self.stream.read(&mut self.buf)).await {
                Ok(read) => {
                    let read = read?;
                    if read == 0 {
                        return Err(Error::Eof);
                    }

                    self.codec.append(&self.buf[..read]);
                }
                Err(_) => return Err(Error::Timeout),
            }
        }
    }

    /// Consumes the stream until the peer hangs up, discarding input.
    pub async fn drain(&mut self) -> Result<(), Error> {
        loop {
            if self.stream.read(&mut self.buf).await? == 0 {
                return Ok(());
            }
        }
    }

    pub fn codec(&mut self) -> &mut ReadableCodec {
        &mut self.codec
    }
}

pub struct Writer<S> {
    conn_id: i32,
    stream: S,
    codec: WritableCodec,
    buf: Vec<u8>,
}

impl<S: AsyncWrite + Unpin> Writer<S> {
    pub fn new(conn_id: i32, stream: S, codec: WritableCodec) -> Self {
        Self {
            conn_id,
            stream,
            codec,
            buf: Vec::new(),
        }
    }

    pub async fn write<P: Writable + Debug>(&mut self, packet: P) -> Result<(), Error> {
        trace!("[{}] > {:?}", self.conn_id, packet);

        self.codec.write(&packet, &mut self.buf)?;
        self.stream.write_all(&self.buf).await?;
        self.stream.flush().await?;
        self.buf.clear();

        Ok(())
    }

    pub fn codec(&mut self) -> &mut WritableCodec {
        &mut self.codec
    }
}
