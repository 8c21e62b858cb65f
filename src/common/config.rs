//! Compilation configuration
//!
//! A `Config` value is created once by the driver and passed by reference
//! through every phase; nothing in the compiler reads global state except the
//! `JFLOWC_ASSERT` environment default below.

use once_cell::sync::Lazy;

use super::error::{Error, Result};

/// Default for `Config::assertions`, read once from the environment
static ENV_ASSERTIONS: Lazy<bool> = Lazy::new(|| {
    std::env::var("JFLOWC_ASSERT")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
});

#[derive(Debug, Clone)]
pub struct Config {
    /// Dynamic memory mode: runtime routines are reached through the runtime
    /// unit table and receive the runtime context as first argument
    pub dynamic_memory: bool,
    /// Encode `assert` statements globally
    pub assertions: bool,
    /// Target word size in bytes (4 or 8)
    pub word_size: u32,
    /// Number of allocatable backend registers
    pub registers: u16,
    /// Emit debug logging for every statement
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dynamic_memory: false,
            assertions: *ENV_ASSERTIONS,
            word_size: 4,
            registers: 16,
            debug: false,
        }
    }
}

impl Config {
    pub fn with_assertions(mut self, on: bool) -> Self {
        self.assertions = on;
        self
    }

    pub fn with_dynamic_memory(mut self, on: bool) -> Self {
        self.dynamic_memory = on;
        self
    }

    pub fn with_word_size(mut self, bytes: u32) -> Self {
        self.word_size = bytes;
        self
    }

    pub fn with_registers(mut self, count: u16) -> Self {
        self.registers = count;
        self
    }

    pub fn with_debug(mut self, on: bool) -> Self {
        self.debug = on;
        self
    }

    /// Round `size` up to the next multiple of the word size
    pub fn align(&self, size: u32) -> u32 {
        let mask = self.word_size - 1;
        (size + mask) & !mask
    }

    pub fn validate(&self) -> Result<()> {
        if self.word_size != 4 && self.word_size != 8 {
            return Err(Error::config_error(format!(
                "word size must be 4 or 8 bytes, got {}",
                self.word_size
            )));
        }
        // expression evaluation needs a value register plus scratch registers
        if self.registers < 4 || self.registers > 64 {
            return Err(Error::config_error(format!(
                "register count must be between 4 and 64, got {}",
                self.registers
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_rounds_to_word() {
        let cfg = Config::default().with_word_size(4);
        assert_eq!(cfg.align(1), 4);
        assert_eq!(cfg.align(4), 4);
        assert_eq!(cfg.align(5), 8);
        let cfg = Config::default().with_word_size(8);
        assert_eq!(cfg.align(2), 8);
        assert_eq!(cfg.align(12), 16);
    }

    #[test]
    fn test_validate_rejects_odd_word_size() {
        assert!(Config::default().with_word_size(6).validate().is_err());
        assert!(Config::default().with_registers(2).validate().is_err());
        assert!(Config::default().validate().is_ok());
    }
}
