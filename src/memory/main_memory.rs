//! Backing memory for the cache: a word-addressed array
//! split into lazily allocated pages

use super::{AccessType, MemoryAccess, Word, ADDRESS_WIDTH, MEMORY_WORDS};

const PAGE_WIDTH: usize = 10;

const PAGE_COUNT: usize = 1 << (ADDRESS_WIDTH - PAGE_WIDTH);
const PAGE_SIZE: usize = 1 << PAGE_WIDTH;

// Defines page type
type PageType = Box<[Word; PAGE_SIZE]>;

/// Main memory holding `MEMORY_WORDS` words, all zero initially.
/// Addresses wrap around the word address space.
pub struct MainMemory {
    // pages[x][y] stores the word at (x << PAGE_WIDTH) | y
    // Allocate stuff lazily
    pages: Vec<Option<PageType>>,

    num_accesses: u64,
}

impl Default for MainMemory {
    fn default() -> Self {
        Self::make()
    }
}

impl MainMemory {
    /// Make a new, zeroed memory
    pub fn make() -> Self {
        Self {
            pages: vec![None; PAGE_COUNT],
            num_accesses: 0,
        }
    }

    /// The page index of the address
    pub fn get_page_index(address: u32) -> usize {
        ((address as usize) & (MEMORY_WORDS - 1)) >> PAGE_WIDTH
    }
    /// The offset of the address within its page
    pub fn get_page_offset(address: u32) -> usize {
        (address as usize) & (PAGE_SIZE - 1)
    }

    /// Check if a page is allocated at the given address
    pub fn page_exists(&self, address: u32) -> bool {
        self.pages[Self::get_page_index(address)].is_some()
    }

    /// Get the word at the given address without counting an access
    pub fn get_word(&self, address: u32) -> Word {
        match &self.pages[Self::get_page_index(address)] {
            Some(page) => page[Self::get_page_offset(address)],
            None => 0,
        }
    }

    /// Set the word at the given address without counting an access
    pub fn set_word(&mut self, address: u32, word: Word) {
        let offset = Self::get_page_offset(address);
        let page = self.pages[Self::get_page_index(address)]
            .get_or_insert_with(|| Box::new([0; PAGE_SIZE]));
        page[offset] = word;
    }

    /// Number of accesses made through [`MemoryAccess`]
    pub fn get_num_accesses(&self) -> u64 {
        self.num_accesses
    }
}

impl MemoryAccess for MainMemory {
    fn access(
        &mut self,
        address: u32,
        access_type: AccessType,
        write_data: Word,
    ) -> Word {
        self.num_accesses += 1;
        if access_type == AccessType::Write {
            self.set_word(address, write_data);
        }
        self.get_word(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_exists() {
        let mut memory = MainMemory::make();
        let address = 0x1234;

        assert_eq!(memory.page_exists(address), false);

        memory.set_word(address, 1);

        assert_eq!(memory.page_exists(address), true);
        assert_eq!(memory.page_exists(address + PAGE_SIZE as u32), false);
    }

    #[test]
    fn test_unallocated_reads_zero() {
        let mut memory = MainMemory::make();
        assert_eq!(memory.get_word(0xBEEF), 0);
        assert_eq!(memory.access(0xBEEF, AccessType::Read, 99), 0);
        // Reading must not allocate
        assert_eq!(memory.page_exists(0xBEEF), false);
    }

    #[test]
    fn test_access_counting() {
        let mut memory = MainMemory::make();
        memory.set_word(7, -5);
        assert_eq!(memory.get_num_accesses(), 0);

        assert_eq!(memory.access(7, AccessType::Read, 0), -5);
        assert_eq!(memory.access(7, AccessType::Write, 42), 42);
        assert_eq!(memory.access(7, AccessType::Read, 0), 42);
        assert_eq!(memory.get_num_accesses(), 3);
    }

    #[test]
    fn test_wrap_around() {
        let mut memory = MainMemory::make();
        memory.set_word(MEMORY_WORDS as u32 + 3, 11);
        assert_eq!(memory.get_word(3), 11);
    }

    #[test]
    fn test_by_hand() {
        let mut memory = MainMemory::make();

        // Store a short sequence across a page boundary
        let words: &[Word] = &[1, -1, i32::MAX, i32::MIN, 0, 370];
        let start = (PAGE_SIZE - 3) as u32;
        for (i, word) in words.iter().enumerate() {
            memory.access(start + i as u32, AccessType::Write, *word);
        }

        // Ensure content
        for (i, word) in words.iter().enumerate() {
            assert_eq!(memory.get_word(start + i as u32), *word);
        }
        assert_eq!(memory.get_num_accesses(), words.len() as u64);
    }
}
