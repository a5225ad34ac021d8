/// Keeps the last `capacity` bytes written to it.
#[derive(Debug, Clone)]
pub struct TailBuffer {
    capacity: usize,
    buf: Vec<u8>,
    truncated: bool,
}

impl TailBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buf: Vec::with_capacity(capacity.min(8192)),
            truncated: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if self.capacity == 0 {
            self.truncated |= !chunk.is_empty();
            return;
        }
        if chunk.len() >= self.capacity {
            self.truncated |= !self.buf.is_empty() || chunk.len() > self.capacity;
            self.buf.clear();
            self.buf
                .extend_from_slice(&chunk[chunk.len() - self.capacity..]);
            return;
        }
        let overflow = (self.buf.len() + chunk.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.buf.drain(..overflow);
            self.truncated = true;
        }
        self.buf.extend_from_slice(chunk);
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Lossy UTF-8 view; a multi-byte char cut at the front becomes U+FFFD.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}
