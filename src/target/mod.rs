//! The gateway to the silicon.

#[cfg(test)]
pub(crate) mod mock;

/// Word-granular access to the target's memory-mapped fabric.
///
/// Everything the server does to the target - reading registers, planting
/// breakpoints, halting and resuming cores - bottoms out in these
/// operations. Implementations typically sit on top of a memory-mapped
/// device window or a mesh-link driver, and steer accesses to the core
/// selected by the most recent `set_thread_*` call.
///
/// Every access may fail (the mesh fabric can drop or time out a
/// transaction); the dispatcher surfaces failures to GDB as `E01`. Burst
/// transfers are not atomic: partial completion must be reported as
/// failure.
pub trait TargetControl {
    /// A transport-specific error carried by failed accesses.
    type Error: core::fmt::Display;

    fn read_mem8(&mut self, addr: u32) -> Result<u8, Self::Error>;
    fn read_mem16(&mut self, addr: u32) -> Result<u16, Self::Error>;
    fn read_mem32(&mut self, addr: u32) -> Result<u32, Self::Error>;

    fn write_mem8(&mut self, addr: u32, value: u8) -> Result<(), Self::Error>;
    fn write_mem16(&mut self, addr: u32, value: u16) -> Result<(), Self::Error>;
    fn write_mem32(&mut self, addr: u32, value: u32) -> Result<(), Self::Error>;

    /// Fill `buf` from consecutive addresses starting at `addr`.
    fn read_burst(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `buf` to consecutive addresses starting at `addr`.
    fn write_burst(&mut self, addr: u32, buf: &[u8]) -> Result<(), Self::Error>;

    /// Board-level reset. The platform driver owns the actual mechanism.
    fn platform_reset(&mut self);

    /// The mesh core-id of every live core, in enumeration order. Thread ID
    /// `n` refers to the core at index `n - 1` of this list.
    fn list_core_ids(&mut self) -> Vec<u16>;

    /// Mesh height in cores.
    fn num_rows(&self) -> u32;

    /// Mesh width in cores.
    fn num_cols(&self) -> u32;

    /// Steer subsequent register/memory accesses at the given thread.
    /// Returns false for a thread ID that names no live core.
    fn set_thread_general(&mut self, tid: crate::common::Tid) -> bool;

    /// Steer subsequent execution control at the given thread. Returns
    /// false for a thread ID that names no live core.
    fn set_thread_execute(&mut self, tid: crate::common::Tid) -> bool;

    /// Prepare instruction tracing. Default: unsupported.
    fn init_trace(&mut self) -> bool {
        false
    }

    /// Start instruction tracing. Default: unsupported.
    fn start_trace(&mut self) -> bool {
        false
    }

    /// Stop instruction tracing. Default: unsupported.
    fn stop_trace(&mut self) -> bool {
        false
    }
}
