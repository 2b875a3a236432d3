//! A reference [`GuestMemory`] implementation backed by a plain `Vec<u8>`
//! and a bump allocator. Used by this crate's own tests, and by anyone
//! who wants to exercise the ABI engine end-to-end without wiring up a
//! real compiled guest (spec.md treats the wasm execution engine as an
//! external collaborator — this stands in for it in tests).

use crate::memory::{DEFAULT_MAX_ALLOC_BYTES, GuestMemory};
use crate::layout::align_up;
use componentrt_types::{Error, ErrorKind, Phase};

pub struct VecGuestMemory {
    bytes: Vec<u8>,
    bump: u32,
    max_alloc: u32,
}

impl VecGuestMemory {
    pub fn new(initial_capacity: usize) -> Self {
        VecGuestMemory {
            bytes: vec![0; initial_capacity],
            bump: 0,
            max_alloc: DEFAULT_MAX_ALLOC_BYTES,
        }
    }

    pub fn with_max_alloc(mut self, max_alloc: u32) -> Self {
        self.max_alloc = max_alloc;
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl GuestMemory for VecGuestMemory {
    fn read(&self, offset: u32, len: u32) -> Result<&[u8], Error> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| trap("guest memory offset overflow"))?;
        self.bytes
            .get(offset as usize..end as usize)
            .ok_or_else(|| trap(format!("out-of-bounds read at {offset}..{end}")))
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), Error> {
        let end = offset
            .checked_add(data.len() as u32)
            .ok_or_else(|| trap("guest memory offset overflow"))?;
        if end as usize > self.bytes.len() {
            self.bytes.resize(end as usize, 0);
        }
        self.bytes[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn realloc(
        &mut self,
        _old_ptr: u32,
        _old_size: u32,
        align: u32,
        new_size: u32,
    ) -> Result<u32, Error> {
        if new_size == 0 {
            return Ok(0);
        }
        if new_size > self.max_alloc {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                Phase::Lower,
                format!(
                    "allocation of {new_size} bytes exceeds ceiling of {} bytes",
                    self.max_alloc
                ),
            ));
        }
        let aligned = align_up(self.bump, align.max(1));
        let new_bump = aligned
            .checked_add(new_size)
            .ok_or_else(|| trap("bump allocator overflow"))?;
        if new_bump as usize > self.bytes.len() {
            self.bytes.resize(new_bump as usize, 0);
        }
        self.bump = new_bump;
        Ok(aligned)
    }

    fn max_alloc_bytes(&self) -> u32 {
        self.max_alloc
    }
}

fn trap(detail: impl Into<String>) -> Error {
    Error::new(ErrorKind::Trap, Phase::Lift, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_allocates_aligned_regions() {
        let mut mem = VecGuestMemory::new(0);
        let a = mem.realloc(0, 0, 1, 3).unwrap();
        let b = mem.realloc(0, 0, 4, 4).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b % 4, 0);
        assert!(b >= a + 3);
    }

    #[test]
    fn realloc_over_ceiling_fails() {
        let mut mem = VecGuestMemory::new(0).with_max_alloc(16);
        assert!(mem.realloc(0, 0, 1, 17).is_err());
        assert!(mem.realloc(0, 0, 1, 16).is_ok());
    }
}
