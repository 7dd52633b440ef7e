//! Data transfer log.
//!
//! Every movement of data in or out of the cache is reported exactly once,
//! in the order it physically happens. This trace is the observable
//! behaviour of the simulator.

use std::fmt;
use std::io::Write;

/// Source and destination of a transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferKind {
    /// Reading data from the cache to the processor
    CacheToProcessor,
    /// Writing data from the processor to the cache
    ProcessorToCache,
    /// Reading data from the memory to the cache
    MemoryToCache,
    /// Evicting cache data and writing it to the memory
    CacheToMemory,
    /// Evicting cache data and throwing it away
    CacheToNowhere,
}

impl TransferKind {
    pub fn describe(&self) -> &'static str {
        match self {
            TransferKind::CacheToProcessor => "from the cache to the processor",
            TransferKind::ProcessorToCache => "from the processor to the cache",
            TransferKind::MemoryToCache => "from the memory to the cache",
            TransferKind::CacheToMemory => "from the cache to the memory",
            TransferKind::CacheToNowhere => "from the cache to nowhere",
        }
    }
}

/// One logged transfer of `size` words starting at `address`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub address: u32,
    pub size: usize,
    pub kind: TransferKind,
}

impl Transfer {
    pub fn new(address: u32, size: usize, kind: TransferKind) -> Self {
        Self { address, size, kind }
    }

    /// Last word address covered by the transfer
    pub fn last_address(&self) -> u32 {
        self.address + self.size as u32 - 1
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "$$$ transferring word [{}-{}] {}",
            self.address,
            self.last_address(),
            self.kind.describe()
        )
    }
}

/// Receiver of transfer reports
pub trait ActionLog {
    fn log_transfer(&mut self, address: u32, size: usize, kind: TransferKind);
}

/// Records every transfer in order
impl ActionLog for Vec<Transfer> {
    fn log_transfer(&mut self, address: u32, size: usize, kind: TransferKind) {
        self.push(Transfer::new(address, size, kind));
    }
}

/// Drops every transfer
impl ActionLog for () {
    fn log_transfer(&mut self, _: u32, _: usize, _: TransferKind) {}
}

/// Reports every transfer to both logs
impl<A: ActionLog, B: ActionLog> ActionLog for (A, B) {
    fn log_transfer(&mut self, address: u32, size: usize, kind: TransferKind) {
        self.0.log_transfer(address, size, kind);
        self.1.log_transfer(address, size, kind);
    }
}

impl<L: ActionLog + ?Sized> ActionLog for &mut L {
    fn log_transfer(&mut self, address: u32, size: usize, kind: TransferKind) {
        (**self).log_transfer(address, size, kind);
    }
}

/// Writes one `$$$ transferring ...` line per transfer.
///
/// Logging cannot fail from the cache's point of view, so the first
/// write error is kept and handed back by [`PrintLog::finish`].
pub struct PrintLog<W: Write> {
    out: W,
    status: std::io::Result<()>,
}

impl<W: Write> PrintLog<W> {
    pub fn new(out: W) -> Self {
        Self { out, status: Ok(()) }
    }

    /// Flush the writer and return the first error seen, if any
    pub fn finish(mut self) -> std::io::Result<W> {
        self.status?;
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> ActionLog for PrintLog<W> {
    fn log_transfer(&mut self, address: u32, size: usize, kind: TransferKind) {
        if self.status.is_ok() {
            self.status =
                writeln!(self.out, "{}", Transfer::new(address, size, kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let transfer = Transfer::new(8, 4, TransferKind::MemoryToCache);
        assert_eq!(
            transfer.to_string(),
            "$$$ transferring word [8-11] from the memory to the cache"
        );
        let transfer = Transfer::new(5, 1, TransferKind::CacheToNowhere);
        assert_eq!(
            transfer.to_string(),
            "$$$ transferring word [5-5] from the cache to nowhere"
        );
    }

    #[test]
    fn test_print_log() {
        let mut log = PrintLog::new(Vec::new());
        log.log_transfer(0, 1, TransferKind::CacheToProcessor);
        log.log_transfer(0, 1, TransferKind::ProcessorToCache);
        let out = String::from_utf8(log.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "$$$ transferring word [0-0] from the cache to the processor\n\
             $$$ transferring word [0-0] from the processor to the cache\n"
        );
    }

    #[test]
    fn test_fan_out() {
        let mut first: Vec<Transfer> = Vec::new();
        let mut second: Vec<Transfer> = Vec::new();
        {
            let mut both = (&mut first, &mut second);
            both.log_transfer(4, 2, TransferKind::CacheToMemory);
        }
        assert_eq!(first, second);
        assert_eq!(first, vec![Transfer::new(4, 2, TransferKind::CacheToMemory)]);
    }
}
