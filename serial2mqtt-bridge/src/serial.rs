//! Serial gateway transport.
//!
//! The device is opened with `tokio-serial` and split into a line reader and a
//! line writer so that reading and writing can happen from different tasks.

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio_serial::SerialStream;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{BridgeError, Result};

/// Line terminator on the serial gateway.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Longest accepted serial line, terminator excluded. Longer lines are dropped.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Open the serial device described by `config`.
pub fn open(config: &SerialConfig) -> Result<SerialStream> {
    let parity = match config.parity.to_lowercase().as_str() {
        "even" => tokio_serial::Parity::Even,
        "odd" => tokio_serial::Parity::Odd,
        _ => tokio_serial::Parity::None,
    };

    let stop_bits = match config.stop_bits {
        2 => tokio_serial::StopBits::Two,
        _ => tokio_serial::StopBits::One,
    };

    let data_bits = match config.data_bits {
        5 => tokio_serial::DataBits::Five,
        6 => tokio_serial::DataBits::Six,
        7 => tokio_serial::DataBits::Seven,
        _ => tokio_serial::DataBits::Eight,
    };

    let builder = tokio_serial::new(&config.device, config.baud_rate)
        .parity(parity)
        .stop_bits(stop_bits)
        .data_bits(data_bits);

    let stream = SerialStream::open(&builder).map_err(|e| BridgeError::SerialOpen {
        device: config.device.clone(),
        message: e.to_string(),
    })?;

    info!(
        device = %config.device,
        baud_rate = config.baud_rate,
        "Opened serial device"
    );

    Ok(stream)
}

/// Split a serial stream into its reading and writing sides.
pub fn split<S>(stream: S) -> (LineReader<ReadHalf<S>>, LineWriter<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite,
{
    let (read_half, write_half) = tokio::io::split(stream);
    (LineReader::new(read_half), LineWriter::new(write_half))
}

/// Reads `\n`-terminated lines.
///
/// Partially received lines are kept between calls, so [`next_line`](Self::next_line)
/// can be used as a branch of `tokio::select!` without losing data.
pub struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    /// Skipping the rest of an overlong line.
    discarding: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
            discarding: false,
        }
    }

    /// Read the next line, without its terminator.
    ///
    /// Returns `Ok(None)` at end of stream. Lines that are not valid UTF-8 or
    /// longer than [`MAX_LINE_LENGTH`] are logged and skipped.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            let available = self.reader.fill_buf().await?;

            if available.is_empty() {
                if !self.buf.is_empty() {
                    debug!(bytes = self.buf.len(), "Discarding unterminated serial line");
                    self.buf.clear();
                }
                self.discarding = false;
                return Ok(None);
            }

            let (chunk, terminated) = match available.iter().position(|&b| b == LINE_TERMINATOR) {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };

            if !self.discarding {
                self.buf.extend_from_slice(&available[..chunk]);
            }
            self.reader.consume(chunk);

            if self.discarding {
                self.discarding = !terminated;
                continue;
            }

            let length = self.buf.len() - usize::from(terminated);
            if length > MAX_LINE_LENGTH {
                warn!(
                    bytes = length,
                    max = MAX_LINE_LENGTH,
                    "Dropping overlong serial line"
                );
                self.buf.clear();
                self.discarding = !terminated;
                continue;
            }

            if !terminated {
                continue;
            }

            self.buf.pop();
            let bytes = std::mem::take(&mut self.buf);

            match String::from_utf8(bytes) {
                Ok(line) => return Ok(Some(line)),
                Err(e) => {
                    warn!(
                        line = %String::from_utf8_lossy(e.as_bytes()),
                        "Dropping serial line that is not valid UTF-8"
                    );
                }
            }
        }
    }
}

/// Writes `\n`-terminated lines.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write `line` followed by the line terminator.
    pub async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.push(LINE_TERMINATOR);

        self.writer.write_all(&frame).await?;
        self.writer.flush().await
    }
}
