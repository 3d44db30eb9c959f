//! Keyboard layout: maps single-character symbols to string indices

use std::collections::HashMap;

use super::bank::BankError;

/// Reference 37-key layout, lowest string first. The last symbol is a space.
pub const KEYBOARD: &str = "q2we4r5ty7u8i9op-[=zxdcfvgbnjmk,.;/' ";

/// Lookup table from symbol to string index
///
/// Matching is exact and case-sensitive: `'q'` and `'Q'` are different keys.
#[derive(Debug, Clone)]
pub struct KeyboardLayout {
    symbols: Vec<char>,
    index: HashMap<char, usize>,
}

impl KeyboardLayout {
    /// Build a layout from an ordered sequence of distinct symbols
    pub fn new(layout: &str) -> Result<Self, BankError> {
        let symbols: Vec<char> = layout.chars().collect();
        if symbols.is_empty() {
            return Err(BankError::EmptyKeyboard);
        }

        let mut index = HashMap::with_capacity(symbols.len());
        for (i, &symbol) in symbols.iter().enumerate() {
            if index.insert(symbol, i).is_some() {
                return Err(BankError::DuplicateSymbol(symbol));
            }
        }

        Ok(Self { symbols, index })
    }

    pub fn index_of(&self, symbol: char) -> Option<usize> {
        self.index.get(&symbol).copied()
    }

    pub fn contains(&self, symbol: char) -> bool {
        self.index.contains_key(&symbol)
    }

    /// Symbol bound to `index`
    pub fn symbol_at(&self, index: usize) -> Option<char> {
        self.symbols.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
