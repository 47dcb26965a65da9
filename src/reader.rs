use nom::bytes::complete::take;
use nom::number::complete::{le_i32, le_u8};

use crate::{ReplayError, Result};

/// Sequential cursor over a fully-buffered capture.
///
/// Every accessor consumes bytes and advances the cursor. Any access past
/// the end of the buffer fails with [`ReplayError::Truncation`] carrying
/// the offset at which the access started; truncation is never recovered
/// here.
#[derive(Debug)]
pub struct CaptureReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> CaptureReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current byte offset from the start of the capture.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn truncated(&self) -> ReplayError {
        ReplayError::Truncation { offset: self.pos }
    }

    /// Little-endian i32.
    pub fn int(&mut self) -> Result<i32> {
        let (rest, v) = le_i32::<_, ()>(&self.buf[self.pos..]).map_err(|_| self.truncated())?;
        self.pos = self.buf.len() - rest.len();
        Ok(v)
    }

    pub fn byte(&mut self) -> Result<u8> {
        let (rest, v) = le_u8::<_, ()>(&self.buf[self.pos..]).map_err(|_| self.truncated())?;
        self.pos = self.buf.len() - rest.len();
        Ok(v)
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let (rest, b) =
            take::<_, _, ()>(n)(&self.buf[self.pos..]).map_err(|_| self.truncated())?;
        self.pos = self.buf.len() - rest.len();
        Ok(b)
    }

    /// Fixed-size read into an array.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(self.truncated());
        }
        self.pos += n;
        Ok(())
    }

    /// Length-prefixed string: one length byte followed by that many bytes
    /// of UTF-8, decoded lossily.
    pub fn string(&mut self) -> Result<String> {
        let len = self.byte()? as usize;
        let b = self.bytes(len)?;
        Ok(String::from_utf8_lossy(b).into_owned())
    }

    /// Scans forward for `pattern` and leaves the cursor just past it.
    /// Reaching the end of the capture without a match is truncation.
    pub fn seek(&mut self, pattern: &[u8]) -> Result<()> {
        let hay = &self.buf[self.pos..];
        match hay.windows(pattern.len()).position(|w| w == pattern) {
            Some(i) => {
                self.pos += i + pattern.len();
                Ok(())
            }
            None => Err(ReplayError::Truncation {
                offset: self.buf.len(),
            }),
        }
    }
}
