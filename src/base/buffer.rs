use std::cmp::max;

const DEFAULT_CAPACITY: usize = 4096;

/// Append-only text accumulator with geometric growth.
///
/// All tokenizer buffers (token text, raw element content, pending input)
/// go through this type so growth policy lives in one place: when an append
/// doesn't fit, capacity doubles (or extends to the exact requirement if a
/// single append exceeds a doubling).
#[derive(Debug)]
pub struct TextBuffer {
    data: String,
}

impl TextBuffer {
    pub fn new() -> Self {
        TextBuffer {
            data: String::with_capacity(DEFAULT_CAPACITY),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        TextBuffer {
            data: String::with_capacity(capacity),
        }
    }

    #[inline]
    fn grow_for(&mut self, additional: usize) {
        let required = self.data.len() + additional;

        if required > self.data.capacity() {
            let new_capacity = max(self.data.capacity() * 2, required);

            self.data.reserve_exact(new_capacity - self.data.len());
        }
    }

    #[inline]
    pub fn push(&mut self, ch: char) {
        self.grow_for(ch.len_utf8());
        self.data.push(ch);
    }

    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.grow_for(s.len());
        self.data.push_str(s);
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.data
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Flushes the accumulated text, leaving an empty buffer of the same
    /// capacity behind.
    pub fn take(&mut self) -> String {
        let capacity = self.data.capacity();

        std::mem::replace(&mut self.data, String::with_capacity(capacity))
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        TextBuffer::new()
    }
}
