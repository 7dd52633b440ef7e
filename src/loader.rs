//! Utility functions for preparing memory before simulation

use std::path::Path;

use crate::error::SimulatorResult;
use crate::error::TraceError;
use crate::memory::main_memory::MainMemory;
use crate::memory::{Word, MEMORY_WORDS};

/// Parse a decimal or `0x`-prefixed hexadecimal word
pub fn parse_word(token: &str) -> Option<Word> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        // Hex words may use the full 32 bits
        Some(hex) => u32::from_str_radix(hex, 16).ok()? as i64,
        None => digits.parse::<i64>().ok()?,
    };
    let value = if negative { -value } else { value };
    if value < i32::MIN as i64 || value > u32::MAX as i64 {
        return None;
    }
    Some(value as u32 as Word)
}

/// Parse a machine-code image: one word per line, starting at address 0
pub fn parse_memory_image(
    image_path: &Path,
    content: &str,
) -> SimulatorResult<Vec<Word>> {
    let mut words = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let token = line.split_whitespace().next();
        let Some(token) = token else {
            continue;
        };
        let word = parse_word(token).ok_or_else(|| {
            TraceError::ParseError(
                image_path.into(),
                line_num + 1,
                format!("invalid machine code word '{}'", token),
            )
        })?;
        words.push(word);
    }
    if words.len() > MEMORY_WORDS {
        return Err(
            TraceError::ImageTooLarge(image_path.into(), MEMORY_WORDS).into()
        );
    }
    Ok(words)
}

/// Loads a machine-code file into memory.
/// Returns the number of words loaded
pub fn load_memory_image(
    mem: &mut MainMemory,
    image_path: &Path,
) -> SimulatorResult<usize> {
    let content = std::fs::read_to_string(image_path)
        .map_err(|e| TraceError::FileReadError(image_path.into(), e))?;
    let words = parse_memory_image(image_path, &content)?;

    // Loading is not a memory access of the simulated program
    for (address, word) in words.iter().enumerate() {
        mem.set_word(address as u32, *word);
    }

    Ok(words.len())
}
