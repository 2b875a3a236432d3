//! Runtime-wide tunables, following `wasmtime::Config`'s builder
//! pattern (SPEC_FULL.md §2 "Ambient: configuration").

use crate::error::{Error, ErrorKind, Phase};
use componentrt_abi::MAX_FLAT;

/// Builder for [`crate::Runtime`]-wide tunables. Defaults match
/// spec.md §5/§9: a 1 GiB general allocation ceiling and the standard
/// Preview 2 16-value flat limit.
#[derive(Clone, Debug)]
pub struct Config {
    max_alloc_bytes: u32,
    max_flat: usize,
    max_list_elements: u32,
}

impl Config {
    pub fn new() -> Self {
        Config {
            max_alloc_bytes: componentrt_abi::memory::DEFAULT_MAX_ALLOC_BYTES,
            max_flat: MAX_FLAT,
            max_list_elements: u32::MAX,
        }
    }

    /// Caps a single canonical-ABI allocation (string or list backing
    /// buffer) at `bytes` (spec.md §5 "Backpressure").
    pub fn max_alloc_bytes(mut self, bytes: u32) -> Self {
        self.max_alloc_bytes = bytes;
        self
    }

    /// Overrides the flat-argument ceiling before the retptr
    /// convention kicks in (spec.md §4.1). Only useful for testing
    /// against non-default engine limits; Preview 2 itself fixes this
    /// at 16.
    pub fn max_flat(mut self, count: usize) -> Self {
        self.max_flat = count;
        self
    }

    /// Caps the element count of any single `list<T>` lifted or
    /// lowered, independent of its byte size (spec.md §5
    /// "per-call... element counts to prevent unbounded host
    /// allocation").
    pub fn max_list_elements(mut self, count: u32) -> Self {
        self.max_list_elements = count;
        self
    }

    pub fn get_max_alloc_bytes(&self) -> u32 {
        self.max_alloc_bytes
    }

    pub fn get_max_flat(&self) -> usize {
        self.max_flat
    }

    pub fn get_max_list_elements(&self) -> u32 {
        self.max_list_elements
    }

    /// Rejects an obviously-inconsistent configuration up front
    /// (SPEC_FULL.md "Ambient: supplemental features") instead of
    /// letting it surface as a confusing failure deep in the ABI
    /// engine later.
    pub fn build(self) -> Result<Config, Error> {
        if self.max_alloc_bytes == 0 {
            return Err(Error::new(
                ErrorKind::Registration,
                Phase::Runtime,
                "max_alloc_bytes must be greater than zero",
            ));
        }
        if self.max_flat == 0 {
            return Err(Error::new(
                ErrorKind::Registration,
                Phase::Runtime,
                "max_flat must be greater than zero",
            ));
        }
        if self.max_list_elements == 0 {
            return Err(Error::new(
                ErrorKind::Registration,
                Phase::Runtime,
                "max_list_elements must be greater than zero",
            ));
        }
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
