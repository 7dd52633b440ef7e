//! Cache implementation

use std::fmt;

use log::trace;

use super::action::{ActionLog, TransferKind};
use super::geometry::CacheGeometry;
use super::lru;
use super::{AccessType, MemoryAccess, Word, MEMORY_WORDS};
use crate::error::{ConfigError, MemoryError, SimulatorResult};

/// One cache line
#[derive(Clone, Debug)]
pub struct Line {
    pub data: Vec<Word>,

    pub valid: bool,
    pub dirty: bool,

    /// Meaningful only when the line is valid
    pub tag: u32,
    /// Set whose data the line holds
    pub set_index: usize,

    /// 0 is the most recently used line of the set
    pub lru_rank: usize,
}

impl Line {
    pub fn make(block_size: usize, set_index: usize, lru_rank: usize) -> Self {
        Self {
            data: vec![0; block_size],
            valid: false,
            dirty: false,
            tag: 0,
            set_index,
            lru_rank,
        }
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct CacheHistory {
    pub num_hit: u64,
    pub num_miss: u64,
    pub num_writeback: u64,
    pub num_discard: u64,
}

/// Set-associative, write-back cache with LRU replacement
pub struct Cache {
    pub geometry: CacheGeometry,

    pub history: CacheHistory,

    pub lines: Vec<Line>,
}

impl Cache {
    /// Validate the parameters and build an empty cache
    pub fn init(
        block_size: usize,
        num_sets: usize,
        lines_per_set: usize,
    ) -> Result<Self, ConfigError> {
        let geometry =
            CacheGeometry::make(block_size, num_sets, lines_per_set)?;
        Ok(Self::make(geometry))
    }

    pub fn make(geometry: CacheGeometry) -> Self {
        let mut cache = Self {
            geometry,
            history: CacheHistory::default(),
            lines: Vec::with_capacity(geometry.num_lines()),
        };
        cache.reset();
        cache
    }

    /// Invalidate every line and restore the initial LRU order
    pub fn reset(&mut self) {
        let geometry = self.geometry;
        self.lines = (0..geometry.num_lines())
            .map(|i| {
                let slot = i % geometry.lines_per_set;
                Line::make(
                    geometry.block_size,
                    i / geometry.lines_per_set,
                    lru::initial_rank(slot, geometry.lines_per_set),
                )
            })
            .collect();
        self.history = CacheHistory::default();
    }

    /// Computes the current miss rate of the cache
    pub fn get_miss_rate(&self) -> f64 {
        let total = self.history.num_hit + self.history.num_miss;
        if total == 0 {
            return 0.;
        }
        (self.history.num_miss as f64) / (total as f64)
    }

    /// Starting memory address of the block held by a line
    pub fn get_address(&self, line: &Line) -> u32 {
        self.geometry.reconstruct_address(line.tag, line.set_index)
    }

    pub fn set_start(&self, set_index: usize) -> usize {
        self.geometry.set_start(set_index)
    }

    /// Lines of the set starting at `set_start`.
    /// `set_start` must be the first line of a set
    fn set_range(
        &self,
        set_start: usize,
    ) -> Result<std::ops::Range<usize>, MemoryError> {
        let lines_per_set = self.geometry.lines_per_set;
        if set_start % lines_per_set != 0 || set_start >= self.lines.len() {
            return Err(MemoryError::InvalidSetStart(set_start));
        }
        Ok(set_start..set_start + lines_per_set)
    }

    /// Index of the valid line in the set holding `tag`
    pub fn find_line_by_tag(
        &self,
        set_start: usize,
        tag: u32,
    ) -> Result<Option<usize>, MemoryError> {
        Ok(self
            .set_range(set_start)?
            .find(|&i| self.lines[i].valid && self.lines[i].tag == tag))
    }

    /// Index of the line holding `address`, if cached
    pub fn lookup(&self, address: u32) -> Option<usize> {
        let set_start = self.set_start(self.geometry.get_set_index(address));
        self.find_line_by_tag(set_start, self.geometry.get_tag(address))
            .ok()
            .flatten()
    }

    pub fn is_in_cache(&self, address: u32) -> bool {
        self.lookup(address).is_some()
    }

    /// Index of the least recently used line of the set
    pub fn victim(&self, set_start: usize) -> Result<usize, MemoryError> {
        let range = self.set_range(set_start)?;
        lru::find_victim(&self.lines[range])
            .map(|slot| set_start + slot)
            .ok_or(MemoryError::NoVictim(
                set_start / self.geometry.lines_per_set,
            ))
    }

    /// Mark `line` as the most recently used line of its set.
    /// A line outside the set is rejected and nothing changes.
    pub fn touch(
        &mut self,
        set_start: usize,
        line: usize,
    ) -> Result<(), MemoryError> {
        let range = self.set_range(set_start)?;
        if !range.contains(&line) {
            return Err(MemoryError::LineOutOfSet { line, set_start });
        }
        lru::promote(&mut self.lines[range], line - set_start);
        Ok(())
    }

    /// Evict the victim line (writing it back if dirty)
    /// and load the block containing `address` into it
    fn fill(
        &mut self,
        memory: &mut impl MemoryAccess,
        log: &mut impl ActionLog,
        address: u32,
        tag: u32,
        dirty: bool,
        victim: usize,
    ) {
        let block_size = self.geometry.block_size;
        let evict_address = self.get_address(&self.lines[victim]);
        let line = &mut self.lines[victim];

        if line.valid && line.dirty {
            for (i, word) in line.data.iter().enumerate() {
                let address = evict_address + i as u32;
                memory.access(address, AccessType::Write, *word);
            }
            line.dirty = false;
            self.history.num_writeback += 1;
            log.log_transfer(
                evict_address,
                block_size,
                TransferKind::CacheToMemory,
            );
        } else if line.valid {
            self.history.num_discard += 1;
            log.log_transfer(
                evict_address,
                block_size,
                TransferKind::CacheToNowhere,
            );
        }

        let block_base = self.geometry.get_block_base(address);
        for (i, word) in line.data.iter_mut().enumerate() {
            *word = memory.access(block_base + i as u32, AccessType::Read, 0);
        }
        log.log_transfer(block_base, block_size, TransferKind::MemoryToCache);

        line.tag = tag;
        line.set_index = self.geometry.get_set_index(address);
        line.dirty = dirty;
        line.valid = true;
    }

    /// Access one word through the cache.
    ///
    /// Returns the word read for a load. For a store the return value
    /// is the stored word and carries no meaning.
    pub fn access(
        &mut self,
        memory: &mut impl MemoryAccess,
        log: &mut impl ActionLog,
        address: u32,
        access_type: AccessType,
        write_data: Word,
    ) -> SimulatorResult<Word> {
        if address as usize >= MEMORY_WORDS {
            return Err(MemoryError::AddressOutOfBounds(address).into());
        }

        let geometry = self.geometry;
        let tag = geometry.get_tag(address);
        let set_index = geometry.get_set_index(address);
        let offset = geometry.get_block_offset(address);
        let set_start = self.set_start(set_index);

        let word = match (self.find_line_by_tag(set_start, tag)?, access_type) {
            (Some(hit), AccessType::Read) => {
                trace!("load {} hit line {}", address, hit);
                self.history.num_hit += 1;
                let word = self.lines[hit].data[offset];
                self.touch(set_start, hit)?;
                log.log_transfer(address, 1, TransferKind::CacheToProcessor);
                word
            }
            (Some(hit), AccessType::Write) => {
                trace!("store {} hit line {}", address, hit);
                self.history.num_hit += 1;
                let line = &mut self.lines[hit];
                line.data[offset] = write_data;
                line.dirty = true;
                self.touch(set_start, hit)?;
                log.log_transfer(address, 1, TransferKind::ProcessorToCache);
                write_data
            }
            (None, AccessType::Read) => {
                self.history.num_miss += 1;
                let victim = self.victim(set_start)?;
                trace!("load {} miss, victim line {}", address, victim);
                self.fill(memory, log, address, tag, false, victim);
                self.touch(set_start, victim)?;
                log.log_transfer(address, 1, TransferKind::CacheToProcessor);
                self.lines[victim].data[offset]
            }
            (None, AccessType::Write) => {
                self.history.num_miss += 1;
                let victim = self.victim(set_start)?;
                trace!("store {} miss, victim line {}", address, victim);
                self.fill(memory, log, address, tag, true, victim);
                // Fetched word is overwritten by the store
                self.lines[victim].data[offset] = write_data;
                log.log_transfer(address, 1, TransferKind::ProcessorToCache);
                self.touch(set_start, victim)?;
                write_data
            }
        };

        Ok(word)
    }

    pub fn load(
        &mut self,
        memory: &mut impl MemoryAccess,
        log: &mut impl ActionLog,
        address: u32,
    ) -> SimulatorResult<Word> {
        self.access(memory, log, address, AccessType::Read, 0)
    }

    pub fn store(
        &mut self,
        memory: &mut impl MemoryAccess,
        log: &mut impl ActionLog,
        address: u32,
        word: Word,
    ) -> SimulatorResult<()> {
        self.access(memory, log, address, AccessType::Write, word)?;
        Ok(())
    }

    /// Check that each set has a permutation of LRU ranks,
    /// distinct tags among its valid lines,
    /// and that every valid line belongs to the set it sits in
    pub fn verify_invariants(&self) -> SimulatorResult<()> {
        let lines_per_set = self.geometry.lines_per_set;
        for (set_index, set) in self.lines.chunks(lines_per_set).enumerate() {
            if !lru::is_permutation(set) {
                let ranks: Vec<usize> =
                    set.iter().map(|line| line.lru_rank).collect();
                return Err(MemoryError::CacheInconsistency(
                    set_index,
                    format!("LRU ranks {:?} are not a permutation", ranks),
                )
                .into());
            }

            for (i, line) in set.iter().enumerate() {
                if !line.valid {
                    continue;
                }
                if line.set_index != set_index {
                    return Err(MemoryError::CacheInconsistency(
                        set_index,
                        format!(
                            "line {} holds data of set {}",
                            i, line.set_index
                        ),
                    )
                    .into());
                }
                let duplicate = set[i + 1..]
                    .iter()
                    .any(|other| other.valid && other.tag == line.tag);
                if duplicate {
                    return Err(MemoryError::CacheInconsistency(
                        set_index,
                        format!("tag {:#x} is cached twice", line.tag),
                    )
                    .into());
                }
            }
        }
        Ok(())
    }
}

/// Dump of every line's data, set by set
impl fmt::Display for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "cache:")?;
        let lines_per_set = self.geometry.lines_per_set;
        for (set_index, set) in self.lines.chunks(lines_per_set).enumerate() {
            writeln!(f, "\tset {}:", set_index)?;
            for (i, line) in set.iter().enumerate() {
                write!(f, "\t\t[ {} ]: {{", i)?;
                for word in &line.data {
                    write!(f, " {}", word)?;
                }
                writeln!(f, " }}")?;
            }
        }
        writeln!(f, "end cache")
    }
}
