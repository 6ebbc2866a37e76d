//! Serial line abstraction
//!
//! The session talks to a [`FrameTransport`], which reads CRLF-terminated
//! frames and writes raw bytes over any [`SerialLine`]. A real port is a
//! `tokio_serial::SerialStream`; tests use a [`SimulatedLine`] around an
//! in-memory duplex stream.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use tracing::{debug, trace};

/// A byte stream whose speed can be changed on the fly
pub trait SerialLine: AsyncRead + AsyncWrite + Unpin + Send {
    /// Reconfigure the line speed
    fn set_baud_rate(&mut self, baud: u32) -> io::Result<()>;
}

impl SerialLine for tokio_serial::SerialStream {
    fn set_baud_rate(&mut self, baud: u32) -> io::Result<()> {
        tokio_serial::SerialPort::set_baud_rate(self, baud).map_err(io::Error::from)
    }
}

/// Serial line stand-in over any async stream
///
/// Speed changes always succeed and are recorded in order. Reads and writes
/// can be made to fail a given number of times to exercise line faults.
#[derive(Debug)]
pub struct SimulatedLine<S> {
    inner: S,
    baud_history: Vec<u32>,
    read_faults: usize,
    write_faults: usize,
}

impl<S> SimulatedLine<S> {
    /// Wrap a stream, starting with no recorded speed changes
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            baud_history: Vec::new(),
            read_faults: 0,
            write_faults: 0,
        }
    }

    /// Fail the next `count` reads with an I/O error
    pub fn fail_next_reads(&mut self, count: usize) {
        self.read_faults = count;
    }

    /// Fail the next `count` writes with an I/O error
    pub fn fail_next_writes(&mut self, count: usize) {
        self.write_faults = count;
    }

    /// Every speed set so far, oldest first
    pub fn baud_history(&self) -> &[u32] {
        &self.baud_history
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for SimulatedLine<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.read_faults > 0 {
            self.read_faults -= 1;
            return Poll::Ready(Err(line_fault("read")));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for SimulatedLine<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.write_faults > 0 {
            self.write_faults -= 1;
            return Poll::Ready(Err(line_fault("write")));
        }
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

fn line_fault(op: &str) -> io::Error {
    io::Error::other(format!("simulated {} fault", op))
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> SerialLine for SimulatedLine<S> {
    fn set_baud_rate(&mut self, baud: u32) -> io::Result<()> {
        self.baud_history.push(baud);
        Ok(())
    }
}

/// Frame-oriented access to a serial line
pub struct FrameTransport<L> {
    reader: BufReader<L>,
    baud_rate: u32,
}

impl<L: SerialLine> FrameTransport<L> {
    /// Wrap a line that is already running at `baud_rate`
    pub fn new(line: L, baud_rate: u32) -> Self {
        Self {
            reader: BufReader::new(line),
            baud_rate,
        }
    }

    /// Wait for the next frame
    ///
    /// The returned bytes include the terminating LF if one was received.
    /// `Ok(None)` means the stream ended.
    pub async fn read_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut frame = Vec::new();
        let n = self.reader.read_until(b'\n', &mut frame).await?;
        if n == 0 {
            return Ok(None);
        }
        trace!("Read {} bytes: {:02X?}", n, frame);
        Ok(Some(frame))
    }

    /// Hand bytes to the line
    ///
    /// Returning does not mean the bytes have left the UART.
    pub async fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.reader.get_mut().write_all(bytes).await
    }

    /// Push out anything still buffered on our side
    pub async fn flush(&mut self) -> io::Result<()> {
        self.reader.get_mut().flush().await
    }

    /// Change the line speed
    pub fn set_baud(&mut self, baud: u32) -> io::Result<()> {
        self.reader.get_mut().set_baud_rate(baud)?;
        debug!("Line speed {} -> {} baud", self.baud_rate, baud);
        self.baud_rate = baud;
        Ok(())
    }

    /// Current line speed
    pub fn baud(&self) -> u32 {
        self.baud_rate
    }

    pub fn line(&self) -> &L {
        self.reader.get_ref()
    }

    pub fn line_mut(&mut self) -> &mut L {
        self.reader.get_mut()
    }

    pub fn into_inner(self) -> L {
        self.reader.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_read_frames_split_at_lf() {
        let (mut master, line) = tokio::io::duplex(256);
        let mut transport = FrameTransport::new(SimulatedLine::new(line), 300);

        master.write_all(b"/?00000001!\r\n\x06050\r\n").await.unwrap();
        drop(master);

        assert_eq!(
            transport.read_frame().await.unwrap().unwrap(),
            b"/?00000001!\r\n"
        );
        assert_eq!(transport.read_frame().await.unwrap().unwrap(), b"\x06050\r\n");
        assert_eq!(transport.read_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_a_frame() {
        let (mut master, line) = tokio::io::duplex(256);
        let mut transport = FrameTransport::new(SimulatedLine::new(line), 300);

        master.write_all(b"/?!").await.unwrap();
        drop(master);

        assert_eq!(transport.read_frame().await.unwrap().unwrap(), b"/?!");
    }

    #[tokio::test]
    async fn test_set_baud_is_recorded() {
        let (_master, line) = tokio::io::duplex(256);
        let mut transport = FrameTransport::new(SimulatedLine::new(line), 300);

        transport.set_baud(9600).unwrap();
        transport.set_baud(300).unwrap();

        assert_eq!(transport.baud(), 300);
        assert_eq!(transport.line().baud_history(), &[9600, 300]);
    }

    #[tokio::test]
    async fn test_injected_faults_fail_once() {
        let (mut master, line) = tokio::io::duplex(256);
        let mut line = SimulatedLine::new(line);
        line.fail_next_reads(1);
        line.fail_next_writes(1);
        let mut transport = FrameTransport::new(line, 300);

        master.write_all(b"/?!\r\n").await.unwrap();
        assert_eq!(
            transport.read_frame().await.unwrap_err().kind(),
            io::ErrorKind::Other
        );
        assert_eq!(transport.read_frame().await.unwrap().unwrap(), b"/?!\r\n");

        assert!(transport.write_bytes(b"\r\n").await.is_err());
        transport.write_bytes(b"\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_write_reaches_peer() {
        let (mut master, line) = tokio::io::duplex(256);
        let mut transport = FrameTransport::new(SimulatedLine::new(line), 300);

        transport.write_bytes(b"/LUN5<1>LUN00000001\r\n").await.unwrap();
        transport.flush().await.unwrap();

        let mut buf = [0u8; 21];
        master.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"/LUN5<1>LUN00000001\r\n");
    }
}
