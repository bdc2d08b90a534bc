//! Fixed-size frame reader over a headerless rgb24 byte stream.

use std::io::{ErrorKind, Read};

use crate::error::{DecodeError, Result};
use crate::frame::{Frame, FrameGeometry};

pub struct Deframer<R> {
    reader: R,
    geometry: FrameGeometry,
    frames_read: u64,
}

impl<R: Read> Deframer<R> {
    pub fn new(reader: R, geometry: FrameGeometry) -> Self {
        Self {
            reader,
            geometry,
            frames_read: 0,
        }
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Reads the next full frame.
    ///
    /// `Ok(None)` means the stream ended cleanly on a frame boundary. A stream
    /// that ends part way through a frame yields
    /// [`DecodeError::InsufficientFrameData`] and the partial bytes are dropped.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        let Some(buffer) = self.read_chunk()? else {
            return Ok(None);
        };
        let frame = Frame::from_raw(self.geometry, buffer)?;
        self.frames_read += 1;
        Ok(Some(frame))
    }

    fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let expected = self.geometry.frame_len();
        let mut buffer = vec![0u8; expected];
        let mut filled = 0;

        // a pipe hands out at most its buffer size per read
        while filled < expected {
            match self.reader.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(DecodeError::StreamRead(e)),
            }
        }

        match filled {
            0 => Ok(None),
            n if n == expected => Ok(Some(buffer)),
            received => Err(DecodeError::InsufficientFrameData { expected, received }),
        }
    }
}

impl<R: Read> Iterator for Deframer<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

#[cfg(test)]
#[path = "deframer_test.rs"]
mod deframer_test;
