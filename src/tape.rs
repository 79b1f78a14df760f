//! The machine tape: a sparse, unbounded mapping from cell index to symbol.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::BLANK_SYMBOL;

/// A sparse tape. Cells that hold no symbol read as [`BLANK_SYMBOL`], so the
/// tape extends in both directions without ever having to be resized.
///
/// Serialized as an object keyed by cell index: `{ "0": "A", "-3": "1" }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tape {
    cells: BTreeMap<i64, char>,
}

/// One cell of a tape window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapeCell {
    pub index: i64,
    /// `None` for a blank cell.
    pub symbol: Option<char>,
    pub is_head: bool,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tape with `input` written left to right starting at cell `start`.
    /// Blank characters in the input leave their cell empty.
    pub fn from_input(input: &str, start: i64) -> Self {
        let mut tape = Self::new();
        for (offset, symbol) in (0_i64..).zip(input.chars()) {
            tape.write(start + offset, symbol);
        }
        tape
    }

    /// Reads the symbol at `index`; blank cells read as [`BLANK_SYMBOL`].
    pub fn read(&self, index: i64) -> char {
        self.cells.get(&index).copied().unwrap_or(BLANK_SYMBOL)
    }

    pub fn get(&self, index: i64) -> Option<char> {
        self.cells.get(&index).copied()
    }

    /// Writes `symbol` at `index`. Writing the blank symbol clears the cell.
    pub fn write(&mut self, index: i64, symbol: char) {
        if symbol == BLANK_SYMBOL {
            self.cells.remove(&index);
        } else {
            self.cells.insert(index, symbol);
        }
    }

    pub fn clear(&mut self, index: i64) {
        self.cells.remove(&index);
    }

    pub fn is_blank(&self) -> bool {
        self.cells.is_empty()
    }

    /// The leftmost and rightmost non-blank cell indices.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        let first = self.cells.keys().next()?;
        let last = self.cells.keys().next_back()?;
        Some((*first, *last))
    }

    /// The symbols between the leftmost and rightmost non-blank cells, with
    /// interior blanks rendered as [`BLANK_SYMBOL`].
    pub fn symbols(&self) -> String {
        match self.bounds() {
            Some((first, last)) => (first..=last).map(|index| self.read(index)).collect(),
            None => String::new(),
        }
    }

    /// Returns the `2 * radius + 1` cells centred on `head`.
    pub fn window(&self, head: i64, radius: usize) -> Vec<TapeCell> {
        let radius = i64::try_from(radius).unwrap_or(i64::MAX / 2);
        (head.saturating_sub(radius)..=head.saturating_add(radius))
            .map(|index| TapeCell {
                index,
                symbol: self.get(index),
                is_head: index == head,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_reads() {
        let tape = Tape::new();
        assert_eq!(tape.read(0), BLANK_SYMBOL);
        assert_eq!(tape.read(-1000), BLANK_SYMBOL);
        assert!(tape.is_blank());
    }

    #[test]
    fn test_writing_blank_clears_cell() {
        let mut tape = Tape::from_input("AB", 0);
        tape.write(1, BLANK_SYMBOL);
        assert_eq!(tape.get(1), None);
        assert_eq!(tape.symbols(), "A");
    }

    #[test]
    fn test_symbols_keeps_interior_blanks() {
        let tape = Tape::from_input("1 1", -1);
        assert_eq!(tape.bounds(), Some((-1, 1)));
        assert_eq!(tape.symbols(), "1 1");
    }

    #[test]
    fn test_window_centred_on_head() {
        let tape = Tape::from_input("ABC", 0);
        let window = tape.window(1, 2);

        assert_eq!(window.len(), 5);
        assert_eq!(window[0].index, -1);
        assert_eq!(window[0].symbol, None);
        assert_eq!(window[2].symbol, Some('B'));
        assert!(window[2].is_head);
        assert_eq!(window[4].symbol, None);
    }

    #[test]
    fn test_serialization_keys_are_indices() {
        let tape = Tape::from_input("A", -2);
        let json = serde_json::to_string(&tape).unwrap();
        assert_eq!(json, r#"{"-2":"A"}"#);

        let back: Tape = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tape);
    }
}
