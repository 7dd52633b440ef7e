//! Cache geometry and address decomposition

use log::{debug, warn};

use crate::error::ConfigError;

/// Upper bound on `num_sets * lines_per_set`
pub const MAX_CACHE_LINES: usize = 256;
/// Upper bound on the number of words in one line
pub const MAX_BLOCK_WORDS: usize = 256;

pub fn get_log_2(value: u32) -> usize {
    assert!(value > 0);
    31 - value.leading_zeros() as usize
}

pub fn is_pow_2(value: u32) -> bool {
    value != 0 && value & (value - 1) == 0
}

pub fn get_mask(bits: usize) -> u32 {
    (1 << bits) - 1
}

/// Shape of the cache, fixed once the cache is initialized.
///
/// A word address is split as `| tag | set index | block offset |`.
/// The bit widths are only exact when `block_size` and `num_sets` are
/// powers of two; other values are accepted with a warning and leave
/// the decomposition undefined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheGeometry {
    pub block_size: usize,
    pub num_sets: usize,
    pub lines_per_set: usize,

    // Constants
    offset_bits: usize,
    index_bits: usize,
}

impl CacheGeometry {
    /// Validate the parameters and precompute the address bit widths
    pub fn make(
        block_size: usize,
        num_sets: usize,
        lines_per_set: usize,
    ) -> Result<Self, ConfigError> {
        if block_size == 0 || num_sets == 0 || lines_per_set == 0 {
            return Err(ConfigError::NonPositive);
        }
        let lines = num_sets
            .checked_mul(lines_per_set)
            .unwrap_or(usize::MAX);
        if lines > MAX_CACHE_LINES {
            return Err(ConfigError::TooManyLines {
                lines,
                max: MAX_CACHE_LINES,
            });
        }
        if block_size > MAX_BLOCK_WORDS {
            return Err(ConfigError::BlockTooLarge {
                words: block_size,
                max: MAX_BLOCK_WORDS,
            });
        }
        // Both are bounded by 256 here, so the casts are lossless
        if !is_pow_2(block_size as u32) {
            warn!("blockSize {} is not a power of 2", block_size);
        }
        if !is_pow_2(num_sets as u32) {
            warn!("numSets {} is not a power of 2", num_sets);
        }

        let geometry = Self {
            block_size,
            num_sets,
            lines_per_set,
            offset_bits: get_log_2(block_size as u32),
            index_bits: get_log_2(num_sets as u32),
        };
        debug!(
            "geometry: {} lines of {} words, {} sets of {} lines",
            geometry.num_lines(),
            block_size,
            num_sets,
            lines_per_set
        );
        Ok(geometry)
    }

    /// Whether the address decomposition is exact for this geometry
    pub fn is_exact(&self) -> bool {
        is_pow_2(self.block_size as u32) && is_pow_2(self.num_sets as u32)
    }

    pub fn num_lines(&self) -> usize {
        self.num_sets * self.lines_per_set
    }

    pub fn offset_bits(&self) -> usize {
        self.offset_bits
    }

    pub fn index_bits(&self) -> usize {
        self.index_bits
    }

    pub fn get_block_offset(&self, address: u32) -> usize {
        (address & get_mask(self.offset_bits)) as usize
    }

    pub fn get_set_index(&self, address: u32) -> usize {
        ((address >> self.offset_bits) & get_mask(self.index_bits)) as usize
    }

    pub fn get_tag(&self, address: u32) -> u32 {
        address >> (self.offset_bits + self.index_bits)
    }

    /// First word address of the block containing `address`
    pub fn get_block_base(&self, address: u32) -> u32 {
        address - self.get_block_offset(address) as u32
    }

    /// Starting address of the block identified by a tag and a set index
    pub fn reconstruct_address(&self, tag: u32, set_index: usize) -> u32 {
        (tag << (self.index_bits + self.offset_bits))
            | ((set_index as u32) << self.offset_bits)
    }

    /// Index of the first line of the given set
    pub fn set_start(&self, set_index: usize) -> usize {
        set_index * self.lines_per_set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_2() {
        for n in 1..123457 {
            let expected = {
                let mut count = 0;
                let mut t = n;
                while t > 1 {
                    count += 1;
                    t >>= 1;
                }
                count
            };
            assert_eq!(expected, get_log_2(n));
        }
    }

    #[test]
    fn test_is_pow_2() {
        assert!(!is_pow_2(0));
        assert!(is_pow_2(1));
        assert!(is_pow_2(2));
        assert!(!is_pow_2(3));
        assert!(is_pow_2(256));
        assert!(!is_pow_2(255));
    }

    #[test]
    fn test_decompose() {
        // 4 words per block, 8 sets: 2 offset bits, 3 index bits
        let geometry = CacheGeometry::make(4, 8, 2).unwrap();
        let address = 0b1011_101_10;
        assert_eq!(geometry.get_block_offset(address), 0b10);
        assert_eq!(geometry.get_set_index(address), 0b101);
        assert_eq!(geometry.get_tag(address), 0b1011);
        assert_eq!(geometry.get_block_base(address), 0b1011_101_00);
        assert_eq!(geometry.set_start(5), 10);
    }

    #[test]
    fn test_reconstruct_address() {
        let geometry = CacheGeometry::make(8, 4, 4).unwrap();
        for address in 0..4096u32 {
            let tag = geometry.get_tag(address);
            let index = geometry.get_set_index(address);
            assert_eq!(
                geometry.reconstruct_address(tag, index),
                geometry.get_block_base(address)
            );
        }
    }

    #[test]
    fn test_direct_mapped_single_word() {
        let geometry = CacheGeometry::make(1, 1, 1).unwrap();
        assert_eq!(geometry.offset_bits(), 0);
        assert_eq!(geometry.index_bits(), 0);
        assert_eq!(geometry.get_tag(1234), 1234);
        assert_eq!(geometry.get_set_index(1234), 0);
        assert_eq!(geometry.get_block_offset(1234), 0);
    }

    #[test]
    fn test_non_positive() {
        assert_eq!(CacheGeometry::make(0, 1, 1), Err(ConfigError::NonPositive));
        assert_eq!(CacheGeometry::make(1, 0, 1), Err(ConfigError::NonPositive));
        assert_eq!(CacheGeometry::make(1, 1, 0), Err(ConfigError::NonPositive));
    }

    #[test]
    fn test_capacity_boundary() {
        assert!(CacheGeometry::make(1, 16, MAX_CACHE_LINES / 16).is_ok());
        assert!(CacheGeometry::make(1, 1, MAX_CACHE_LINES).is_ok());
        assert_eq!(
            CacheGeometry::make(1, 1, MAX_CACHE_LINES + 1),
            Err(ConfigError::TooManyLines {
                lines: MAX_CACHE_LINES + 1,
                max: MAX_CACHE_LINES
            })
        );
    }

    #[test]
    fn test_block_too_large() {
        assert!(CacheGeometry::make(MAX_BLOCK_WORDS, 1, 1).is_ok());
        assert_eq!(
            CacheGeometry::make(MAX_BLOCK_WORDS + 1, 1, 1),
            Err(ConfigError::BlockTooLarge {
                words: MAX_BLOCK_WORDS + 1,
                max: MAX_BLOCK_WORDS
            })
        );
    }

    #[test]
    fn test_non_pow_2_is_tolerated() {
        let geometry = CacheGeometry::make(3, 6, 2).unwrap();
        assert!(!geometry.is_exact());
        assert_eq!(geometry.num_lines(), 12);
        assert!(CacheGeometry::make(4, 4, 3).unwrap().is_exact());
    }

    /// Keeps every formatted record so tests can inspect warnings
    struct CaptureLog {
        records: std::sync::Mutex<Vec<String>>,
    }

    impl log::Log for CaptureLog {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                if let Ok(mut records) = self.records.lock() {
                    records.push(record.args().to_string());
                }
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: CaptureLog = CaptureLog {
        records: std::sync::Mutex::new(Vec::new()),
    };

    #[test]
    fn test_non_pow_2_warnings() {
        // Only this test installs a logger in the library tests
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Warn);

        CacheGeometry::make(3, 6, 2).unwrap();
        CacheGeometry::make(4, 8, 3).unwrap();

        let records = CAPTURE.records.lock().unwrap();
        assert!(records
            .iter()
            .any(|r| r == "blockSize 3 is not a power of 2"));
        assert!(records.iter().any(|r| r == "numSets 6 is not a power of 2"));
        // lines_per_set is free to be any positive number
        assert!(!records.iter().any(|r| r.contains("blockSize 4")));
        assert!(!records.iter().any(|r| r.contains("numSets 8")));
    }
}
