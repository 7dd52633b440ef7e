//! Memory structure

pub mod action;
pub mod cache;
pub mod geometry;
pub mod lru;
pub mod main_memory;

/// A machine word
pub type Word = i32;

/// Width of a word address
pub const ADDRESS_WIDTH: usize = 16;
/// Number of addressable words
pub const MEMORY_WORDS: usize = 1 << ADDRESS_WIDTH;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    Read,
    Write,
}

impl AccessType {
    pub fn from_write_flag(write_flag: bool) -> Self {
        if write_flag {
            AccessType::Write
        } else {
            AccessType::Read
        }
    }
}

/// Word-level access to the backing memory.
///
/// Called exactly once per word moved between the cache and memory,
/// so implementations may count calls.
pub trait MemoryAccess {
    /// Read the word at `address`, or store `write_data` there.
    /// Returns the word held at `address` after the access.
    fn access(
        &mut self,
        address: u32,
        access_type: AccessType,
        write_data: Word,
    ) -> Word;
}
