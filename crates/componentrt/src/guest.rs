//! The boundary between this crate and "wherever the guest's compiled
//! export bodies actually run". The wasm execution engine itself is out
//! of scope (spec.md §1); [`GuestExports`] is its contract with the
//! facade, the same way [`componentrt_abi::GuestMemory`] is the ABI
//! engine's contract and [`componentrt_sched::AsyncifyEntryPoints`] is
//! the scheduler's.
//!
//! A real embedding adapts this over a compiled `wasmtime`/engine
//! instance; `componentrt::testing::ScriptedExports` (mirroring
//! `componentrt_abi::testing::VecGuestMemory` and
//! `componentrt_sched::testing::ScriptedGuest`) stands in for it in
//! this crate's own tests.

use componentrt_abi::{CoreValue, GuestMemory};
use componentrt_types::Error;

/// What a [`GuestExports`] implementation calls back into when its
/// export body reaches a host import, routing the call through the
/// instance's resolved host registry (spec.md §4.3) without the
/// facade ever re-entering a real wasm frame.
pub trait ImportLinker {
    fn call_import(
        &mut self,
        namespace: &str,
        name: &str,
        memory: &mut dyn GuestMemory,
        args: &mut dyn Iterator<Item = CoreValue>,
    ) -> Result<Vec<CoreValue>, Error>;
}

/// One instantiated guest's callable surface: its linear memory, and
/// the ability to run one exported function body to completion,
/// issuing any host import calls it makes through `linker`.
///
/// Implementations are expected to be synchronous — an export whose
/// body needs to suspend on an async import runs instead through
/// `componentrt_sched::CallSession` against a
/// `componentrt_sched::AsyncifyEntryPoints` adapter, not through this
/// trait (spec.md §4.4's asyncify protocol has no synchronous
/// equivalent to fall back to).
pub trait GuestExports: Send {
    fn memory(&mut self) -> &mut dyn GuestMemory;

    fn call_export(
        &mut self,
        export: &str,
        args: &[CoreValue],
        linker: &mut dyn ImportLinker,
    ) -> Result<Vec<CoreValue>, Error>;
}
