//! Pipe Transport: a blocking, byte-oriented channel between threads.
//!
//! The I/O workers and the gameplay thread never share packet memory.  They
//! hand bytes to each other through pipes instead:
//!
//! ```text
//!  receive worker ──(inbound pipe)──▶ gameplay thread
//!  gameplay thread ──(outbound pipe)──▶ send worker
//! ```
//!
//! A pipe has no message boundaries.  Callers impose framing by writing
//! fixed-size headers (a packet count, a type word) before variable payloads,
//! and the reader pulls exactly the number of bytes it expects.
//!
//! # How it works (for beginners)
//!
//! Under the hood each `write_all` sends one owned chunk of bytes over an
//! `std::sync::mpsc` channel.  The reader keeps a *carry* buffer holding the
//! unread tail of the last chunk, so `read_exact` can stitch a request
//! together from several chunks, or satisfy several small requests from one
//! chunk.  When every writer has been dropped the channel disconnects and
//! reads fail with [`PipeError::Closed`] instead of blocking forever.
//!
//! A pipe is safe for one writer and one reader per direction.  The writer is
//! `Clone` so ownership can move between threads, but two threads writing
//! framed data at the same time would interleave their frames.

use std::sync::mpsc;

use thiserror::Error;

/// Errors raised by pipe reads and writes.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PipeError {
    /// The other end of the pipe has been dropped.
    #[error("pipe closed by peer")]
    Closed,
}

/// Creates a one-directional pipe.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel();
    (
        PipeWriter { tx },
        PipeReader {
            rx,
            carry: Vec::new(),
            pos: 0,
        },
    )
}

/// Creates a full-duplex pipe: whatever one end writes, the other end reads.
pub fn duplex() -> (PipeEnd, PipeEnd) {
    let (a_writer, b_reader) = pipe();
    let (b_writer, a_reader) = pipe();
    (
        PipeEnd {
            writer: a_writer,
            reader: a_reader,
        },
        PipeEnd {
            writer: b_writer,
            reader: b_reader,
        },
    )
}

/// One end of a [`duplex`] pipe.
#[derive(Debug)]
pub struct PipeEnd {
    pub writer: PipeWriter,
    pub reader: PipeReader,
}

// ── Writer ────────────────────────────────────────────────────────────────────

/// Sending half of a pipe.
#[derive(Debug, Clone)]
pub struct PipeWriter {
    tx: mpsc::Sender<Vec<u8>>,
}

impl PipeWriter {
    /// Writes all of `bytes` as one chunk.
    ///
    /// A single call is never split or interleaved with another writer's
    /// bytes, so a caller that builds a whole frame first and writes it once
    /// keeps the frame contiguous.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Closed`] if the reader has been dropped.
    pub fn write_all(&self, bytes: &[u8]) -> Result<(), PipeError> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.tx.send(bytes.to_vec()).map_err(|_| PipeError::Closed)
    }

    /// Writes a big-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Closed`] if the reader has been dropped.
    pub fn write_u32(&self, value: u32) -> Result<(), PipeError> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes a big-endian `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Closed`] if the reader has been dropped.
    pub fn write_u64(&self, value: u64) -> Result<(), PipeError> {
        self.write_all(&value.to_be_bytes())
    }
}

// ── Reader ────────────────────────────────────────────────────────────────────

/// Receiving half of a pipe.
#[derive(Debug)]
pub struct PipeReader {
    rx: mpsc::Receiver<Vec<u8>>,
    /// Unread tail of the most recent chunk starts at `carry[pos]`.
    carry: Vec<u8>,
    pos: usize,
}

impl PipeReader {
    /// Blocks until exactly `buf.len()` bytes have been read.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Closed`] if every writer is dropped before the
    /// request is satisfied.  Bytes read so far are discarded.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), PipeError> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.pos == self.carry.len() {
                self.carry = self.rx.recv().map_err(|_| PipeError::Closed)?;
                self.pos = 0;
                continue;
            }
            let n = (buf.len() - filled).min(self.carry.len() - self.pos);
            buf[filled..filled + n].copy_from_slice(&self.carry[self.pos..self.pos + n]);
            filled += n;
            self.pos += n;
        }
        Ok(())
    }

    /// Reads exactly `count` bytes into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Closed`] as for [`PipeReader::read_exact`].
    pub fn read_vec(&mut self, count: usize) -> Result<Vec<u8>, PipeError> {
        let mut buf = vec![0u8; count];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads a big-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Closed`] as for [`PipeReader::read_exact`].
    pub fn read_u32(&mut self) -> Result<u32, PipeError> {
        let mut word = [0u8; 4];
        self.read_exact(&mut word)?;
        Ok(u32::from_be_bytes(word))
    }

    /// Reads a big-endian `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Closed`] as for [`PipeReader::read_exact`].
    pub fn read_u64(&mut self) -> Result<u64, PipeError> {
        let mut word = [0u8; 8];
        self.read_exact(&mut word)?;
        Ok(u64::from_be_bytes(word))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_read_exact_stitches_request_across_chunks() {
        // Arrange
        let (w, mut r) = pipe();
        w.write_all(&[1, 2]).unwrap();
        w.write_all(&[3]).unwrap();
        w.write_all(&[4, 5, 6]).unwrap();

        // Act
        let got = r.read_vec(5).unwrap();

        // Assert – the sixth byte is still buffered for the next read
        assert_eq!(got, vec![1, 2, 3, 4, 5]);
        assert_eq!(r.read_vec(1).unwrap(), vec![6]);
    }

    #[test]
    fn test_small_reads_are_served_from_one_chunk() {
        let (w, mut r) = pipe();
        let mut chunk = 7u32.to_be_bytes().to_vec();
        chunk.extend_from_slice(&0xDEAD_BEEF_u64.to_be_bytes());
        w.write_all(&chunk).unwrap();

        assert_eq!(r.read_u32().unwrap(), 7);
        assert_eq!(r.read_u64().unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_read_fails_once_writer_is_dropped() {
        let (w, mut r) = pipe();
        w.write_u32(1).unwrap();
        drop(w);

        assert_eq!(r.read_u32(), Ok(1));
        assert_eq!(r.read_u32(), Err(PipeError::Closed));
    }

    #[test]
    fn test_write_fails_once_reader_is_dropped() {
        let (w, r) = pipe();
        drop(r);
        assert_eq!(w.write_u32(1), Err(PipeError::Closed));
    }

    #[test]
    fn test_empty_write_is_a_no_op() {
        let (w, mut r) = pipe();
        w.write_all(&[]).unwrap();
        w.write_all(&[9]).unwrap();
        assert_eq!(r.read_vec(1).unwrap(), vec![9]);
    }

    #[test]
    fn test_read_blocks_until_another_thread_writes() {
        // Arrange
        let (w, mut r) = pipe();

        // Act – writer on another thread, reader blocks here
        let handle = thread::spawn(move || {
            for i in 0..100u32 {
                w.write_u32(i).unwrap();
            }
        });
        let values: Vec<u32> = (0..100).map(|_| r.read_u32().unwrap()).collect();
        handle.join().unwrap();

        // Assert – order is preserved
        assert_eq!(values, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_duplex_ends_talk_to_each_other() {
        let (mut a, mut b) = duplex();
        a.writer.write_u32(10).unwrap();
        b.writer.write_u32(20).unwrap();
        assert_eq!(b.reader.read_u32().unwrap(), 10);
        assert_eq!(a.reader.read_u32().unwrap(), 20);
    }
}
