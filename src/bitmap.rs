//! Free-block tracking for the in-memory device.
//! One bit per block: set means the block is in use.

use alloc::vec;
use alloc::vec::Vec;

#[derive(Debug, Clone)]
pub struct Bitmap {
    words: Vec<u64>,
    total_items: usize,
    used: usize,
}

impl Bitmap {
    pub fn new(total_items: usize) -> Self {
        Self {
            words: vec![0; total_items.div_ceil(64)],
            total_items,
            used: 0,
        }
    }

    /// Sets the first clear bit and returns its index.
    pub fn set_first_fit(&mut self) -> Option<usize> {
        for (i, word) in self.words.iter_mut().enumerate() {
            if *word == u64::MAX {
                continue;
            }
            let bit = word.trailing_ones() as usize;
            let item = i * 64 + bit;
            if item >= self.total_items {
                return None;
            }
            *word |= 1 << bit;
            self.used += 1;
            return Some(item);
        }
        None
    }

    /// Sets bit `item` to `value`.
    /// Returns the previous value, or `None` if `item` is out of bounds.
    pub fn set_at(&mut self, item: usize, value: bool) -> Option<bool> {
        if item >= self.total_items {
            return None;
        }
        let (word, bit) = (item / 64, item % 64);
        let prev = self.words[word] & (1 << bit) != 0;
        if value {
            self.words[word] |= 1 << bit;
        } else {
            self.words[word] &= !(1 << bit);
        }
        match (prev, value) {
            (false, true) => self.used += 1,
            (true, false) => self.used -= 1,
            _ => {}
        }
        Some(prev)
    }

    pub fn free(&self) -> usize {
        self.total_items - self.used
    }
}
