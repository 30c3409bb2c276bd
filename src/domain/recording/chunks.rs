//! Ordered buffer of encoded fragments

/// Fragments delivered by the recorder, kept in arrival order.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    fragments: Vec<Vec<u8>>,
    total_bytes: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Empty fragments are ignored; returns whether it was kept.
    pub fn push(&mut self, fragment: Vec<u8>) -> bool {
        if fragment.is_empty() {
            return false;
        }
        self.total_bytes += fragment.len();
        self.fragments.push(fragment);
        true
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.total_bytes = 0;
    }

    /// Concatenate every fragment in arrival order and leave the buffer empty.
    pub fn take_concat(&mut self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.total_bytes);
        for fragment in self.fragments.drain(..) {
            data.extend_from_slice(&fragment);
        }
        self.total_bytes = 0;
        data
    }
}
