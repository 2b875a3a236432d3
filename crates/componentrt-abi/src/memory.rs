//! The boundary between this crate and "wherever guest linear memory
//! actually lives". spec.md treats the wasm execution engine as an
//! external collaborator (§1 OUT OF SCOPE); this trait is its contract
//! with the canonical ABI engine.

use componentrt_types::{Error, ErrorKind, Phase};

/// The default per-allocation ceiling (spec.md §5/§9: "1 GiB for general
/// allocations"). Guards against a malicious or buggy guest driving
/// unbounded host allocation through a string/list lower.
pub const DEFAULT_MAX_ALLOC_BYTES: u32 = 1 << 30;

/// A view onto one guest instance's linear memory plus its exported
/// allocator, as required to lift/lower strings, lists, and
/// variable-size payloads (spec.md §4.1 "String handling").
///
/// Implementations are expected to be thin adapters over whatever the
/// real wasm engine exposes (e.g. `wasmtime::Memory` + a cached
/// `realloc` export); `componentrt_abi::testing::VecGuestMemory` is a
/// reference implementation used by this crate's own tests and by
/// embedders exercising the ABI engine without a real guest on hand.
pub trait GuestMemory {
    /// Borrows `len` bytes starting at `offset`. Must fail with
    /// `ErrorKind::Trap` (not an ABI error: this is an out-of-bounds
    /// guest memory access, spec.md §4.1 "Failure semantics") if the
    /// range exceeds the memory's current size.
    fn read(&self, offset: u32, len: u32) -> Result<&[u8], Error>;

    /// Writes `bytes` starting at `offset`.
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Error>;

    /// Invokes the guest-exported `cabi_realloc`-shaped allocator:
    /// `(old_ptr, old_size, align, new_size) -> new_ptr`. A `new_size`
    /// of `0` is a free. Implementations must enforce
    /// [`DEFAULT_MAX_ALLOC_BYTES`] (or a caller-chosen ceiling) and
    /// fail with `ErrorKind::InvalidInput` if exceeded.
    fn realloc(&mut self, old_ptr: u32, old_size: u32, align: u32, new_size: u32)
        -> Result<u32, Error>;

    fn max_alloc_bytes(&self) -> u32 {
        DEFAULT_MAX_ALLOC_BYTES
    }
}

pub(crate) fn trap(detail: impl Into<String>) -> Error {
    Error::new(ErrorKind::Trap, Phase::Lift, detail)
}
