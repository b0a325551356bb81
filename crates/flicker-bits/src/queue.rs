//! FIFO queue of buffers for incremental parsing

use std::collections::VecDeque;

use crate::buffer::Buffer;

/// A FIFO of [`Buffer`]s fed by a transport and drained by a parser.
///
/// `peek` never consumes: a parser that discovers it needs more data can
/// return to its caller and retry from exactly the same position later.
/// When a peeked or pulled range lies entirely inside one queued buffer the
/// result is a zero-copy sub-view; a range spanning buffers is coalesced
/// into a fresh allocation.
#[derive(Debug, Default)]
pub struct BufferQueue {
    buffers: VecDeque<Buffer>,
    /// Bytes already consumed from the front buffer.
    head: usize,
    depth: usize,
    offset: usize,
}

impl BufferQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a buffer to the back of the queue.
    pub fn push(&mut self, buffer: Buffer) {
        if buffer.is_empty() {
            return;
        }
        self.depth += buffer.len();
        self.buffers.push_back(buffer);
    }

    /// Total bytes currently available.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Total bytes consumed from this queue since creation.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Read `n` bytes from the front without consuming them.
    ///
    /// Returns `None` when fewer than `n` bytes are buffered.
    pub fn peek(&self, n: usize) -> Option<Buffer> {
        if n > self.depth {
            return None;
        }
        let front = self.buffers.front()?;
        if front.len() - self.head >= n {
            return front.subbuffer(self.head, n);
        }
        // Spans buffers: coalesce.
        let mut out = Vec::with_capacity(n);
        let mut skip = self.head;
        for buf in &self.buffers {
            let bytes = &buf.as_slice()[skip..];
            skip = 0;
            let take = bytes.len().min(n - out.len());
            out.extend_from_slice(&bytes[..take]);
            if out.len() == n {
                break;
            }
        }
        Some(Buffer::from_vec(out))
    }

    /// Consume and return `n` bytes from the front.
    ///
    /// Returns `None` (consuming nothing) when fewer than `n` bytes are
    /// buffered. Pulling zero bytes yields an empty buffer.
    pub fn pull(&mut self, n: usize) -> Option<Buffer> {
        let result = self.peek(n)?;
        self.advance(n);
        Some(result)
    }

    /// Consume and return everything currently buffered.
    pub fn pull_all(&mut self) -> Buffer {
        self.pull(self.depth).unwrap_or_else(Buffer::empty)
    }

    fn advance(&mut self, mut n: usize) {
        self.depth -= n;
        self.offset += n;
        while n > 0 {
            let front_left = self.buffers.front().expect("queue underrun").len() - self.head;
            if n < front_left {
                self.head += n;
                return;
            }
            n -= front_left;
            self.head = 0;
            self.buffers.pop_front();
        }
    }
}
