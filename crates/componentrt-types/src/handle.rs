use std::fmt;

/// An opaque, non-zero reference to a host-owned object living in a
/// [`componentrt-resource-table`](https://example.invalid) table.
///
/// Zero is reserved to mean "absent" at the ABI boundary (spec.md §4.2);
/// this type cannot represent it, so a `None`/`Option<Handle>` is the
/// spelling for "absent" everywhere a handle is optional.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(std::num::NonZeroU32);

impl Handle {
    /// Constructs a handle from a raw index. Returns `None` for `0`.
    pub fn from_raw(raw: u32) -> Option<Self> {
        std::num::NonZeroU32::new(raw).map(Handle)
    }

    pub fn as_u32(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
