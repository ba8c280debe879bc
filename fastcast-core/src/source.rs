/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Byte source abstraction.
//!
//! A byte source delivers raw bytes from any transport — TCP, multicast,
//! file — and owns no protocol knowledge. Exhaustion comes in two distinct
//! shapes: [`Fetch::Pending`] ("no data yet, retry later") and
//! [`Fetch::End`] (the stream is finished). Neither is an error; transport
//! failures are reported separately as [`SourceError`].

use crate::error::SourceError;
use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;

/// Outcome of a fetch from a byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch<T> {
    /// Data is available.
    Ready(T),
    /// No data yet; retry once the transport delivers more.
    Pending,
    /// The stream is finished.
    End,
}

impl<T> Fetch<T> {
    /// Returns true if data was delivered.
    #[inline]
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Delivers raw bytes from a transport.
pub trait ByteSource {
    /// Fetches the next byte.
    ///
    /// # Errors
    /// Returns `SourceError` if the underlying transport failed.
    fn next_byte(&mut self) -> Result<Fetch<u8>, SourceError>;

    /// Fetches the next contiguous buffer.
    ///
    /// # Errors
    /// Returns `SourceError` if the underlying transport failed.
    fn next_buffer(&mut self) -> Result<Fetch<Bytes>, SourceError>;
}

/// Byte source over a single in-memory buffer.
///
/// Reports [`Fetch::End`] once the buffer is exhausted; never pends.
#[derive(Debug, Clone)]
pub struct BufferSource {
    data: Bytes,
    pos: usize,
}

impl BufferSource {
    /// Creates a source over the given buffer.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Returns the number of bytes consumed so far.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.pos
    }

    /// Returns the number of bytes still available.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Takes exactly `count` bytes, if available.
    #[must_use]
    pub fn take(&mut self, count: usize) -> Option<Bytes> {
        if self.remaining() < count {
            return None;
        }
        let taken = self.data.slice(self.pos..self.pos + count);
        self.pos += count;
        Some(taken)
    }
}

impl ByteSource for BufferSource {
    fn next_byte(&mut self) -> Result<Fetch<u8>, SourceError> {
        if self.pos < self.data.len() {
            let byte = self.data[self.pos];
            self.pos += 1;
            Ok(Fetch::Ready(byte))
        } else {
            Ok(Fetch::End)
        }
    }

    fn next_buffer(&mut self) -> Result<Fetch<Bytes>, SourceError> {
        if self.pos < self.data.len() {
            let rest = self.data.slice(self.pos..);
            self.pos = self.data.len();
            Ok(Fetch::Ready(rest))
        } else {
            Ok(Fetch::End)
        }
    }
}

/// Byte source fed incrementally with delivered buffers.
///
/// Reports [`Fetch::Pending`] when the queued data runs out before
/// [`finish`](Self::finish) is called, which makes it the natural source for
/// streaming framing: a header analyzer suspends on `Pending` and resumes
/// after the next [`push`](Self::push).
#[derive(Debug, Default)]
pub struct ChunkedSource {
    chunks: VecDeque<Bytes>,
    finished: bool,
}

impl ChunkedSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a delivered buffer. Ownership passes to the source.
    pub fn push(&mut self, chunk: impl Into<Bytes>) {
        let chunk = chunk.into();
        if !chunk.is_empty() {
            self.chunks.push_back(chunk);
        }
    }

    /// Marks the stream finished; exhaustion becomes [`Fetch::End`].
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Returns the number of queued bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    /// Takes exactly `count` bytes across chunk boundaries, if available.
    #[must_use]
    pub fn take(&mut self, count: usize) -> Option<Bytes> {
        if self.remaining() < count {
            return None;
        }
        if count == 0 {
            return Some(Bytes::new());
        }
        // Fast path: the front chunk covers the request.
        if self.chunks[0].len() >= count {
            let mut front = self.chunks.pop_front().unwrap_or_default();
            let taken = front.split_to(count);
            if !front.is_empty() {
                self.chunks.push_front(front);
            }
            return Some(taken);
        }
        let mut assembled = BytesMut::with_capacity(count);
        while assembled.len() < count {
            let mut front = self.chunks.pop_front()?;
            let want = count - assembled.len();
            if front.len() > want {
                assembled.extend_from_slice(&front.split_to(want));
                self.chunks.push_front(front);
            } else {
                assembled.extend_from_slice(&front);
            }
        }
        Some(assembled.freeze())
    }
}

impl ByteSource for ChunkedSource {
    fn next_byte(&mut self) -> Result<Fetch<u8>, SourceError> {
        match self.chunks.front_mut() {
            Some(front) => {
                let byte = front[0];
                front.advance(1);
                if front.is_empty() {
                    self.chunks.pop_front();
                }
                Ok(Fetch::Ready(byte))
            }
            None if self.finished => Ok(Fetch::End),
            None => Ok(Fetch::Pending),
        }
    }

    fn next_buffer(&mut self) -> Result<Fetch<Bytes>, SourceError> {
        match self.chunks.pop_front() {
            Some(front) => Ok(Fetch::Ready(front)),
            None if self.finished => Ok(Fetch::End),
            None => Ok(Fetch::Pending),
        }
    }
}
