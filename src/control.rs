//! The halt/run controller: putting the steered core into and out of the
//! debug state, and inspecting why it stopped.

use crate::arch;
use crate::common::Signal;
use crate::regs;
use crate::target::TargetControl;
use std::time::Duration;
use std::time::Instant;

/// How long [`halt`] waits for the debug unit to acknowledge before giving
/// up.
const HALT_TIMEOUT: Duration = Duration::from_secs(1);

/// Is the core stopped in the debug unit's halt state, with no memory
/// transaction still in flight?
pub fn is_in_debug_state<T: TargetControl>(tc: &mut T) -> Result<bool, T::Error> {
    let debug = tc.read_mem32(arch::CORE_DEBUG)?;
    Ok(arch::bits32(debug, 0, 0) == arch::DEBUG_CMD_HALT && arch::bits32(debug, 1, 1) == 0)
}

/// Halt the core by writing HALT to the debug command register, verifying
/// the debug state within one second.
///
/// Returns false when the core did not halt; the caller reports signal HUP.
pub fn halt<T: TargetControl>(tc: &mut T) -> Result<bool, T::Error> {
    tc.write_mem32(arch::CORE_DEBUGCMD, arch::DEBUG_CMD_HALT)?;
    log::debug!("wrote HALT to DEBUGCMD");

    let deadline = Instant::now() + HALT_TIMEOUT;
    while !is_in_debug_state(tc)? {
        if Instant::now() >= deadline {
            let debug = tc.read_mem32(arch::CORE_DEBUG)?;
            log::warn!("target has not halted after 1 sec (DEBUG = {debug:#010x})");
            return Ok(false);
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    Ok(true)
}

/// Resume the core by writing RUN to the debug command register.
pub fn resume<T: TargetControl>(tc: &mut T) -> Result<(), T::Error> {
    tc.write_mem32(arch::CORE_DEBUGCMD, arch::DEBUG_CMD_RUN)?;
    log::debug!("wrote RUN to DEBUGCMD");
    Ok(())
}

/// The signal to report if the core is stopped on an exception, judged from
/// STATUS[18:16].
pub fn exception_signal<T: TargetControl>(tc: &mut T) -> Result<Option<Signal>, T::Error> {
    let status = regs::read_status(tc)?;
    let cause = arch::bits32(status, 18, 16);
    Ok(match cause {
        0 => None,
        arch::EXCAUSE_UNALIGNED => Some(Signal::SIGBUS),
        arch::EXCAUSE_FPU => Some(Signal::SIGFPE),
        arch::EXCAUSE_UNIMPL => Some(Signal::SIGILL),
        _ => Some(Signal::SIGABRT),
    })
}

/// Is the core sitting in the idle state waiting for an interrupt?
pub fn is_idle<T: TargetControl>(tc: &mut T) -> Result<bool, T::Error> {
    let status = regs::read_status(tc)?;
    Ok(status & arch::STATUS_ACTIVE_BIT == 0)
}

/// Are interrupts globally enabled? (STATUS GID bit clear.)
pub fn gints_enabled<T: TargetControl>(tc: &mut T) -> Result<bool, T::Error> {
    let status = regs::read_status(tc)?;
    Ok(status & arch::STATUS_GID_BIT == 0)
}

/// Software reset: repeatedly pulse the mesh software-reset register.
pub fn sw_reset<T: TargetControl>(tc: &mut T) -> Result<(), T::Error> {
    for _ in 0..12 {
        tc.write_mem32(arch::MESH_SWRESET, 1)?;
    }
    tc.write_mem32(arch::MESH_SWRESET, 0)
}

/// Board-level reset, delegated to the platform driver.
pub fn hw_reset<T: TargetControl>(tc: &mut T) {
    tc.platform_reset()
}

/// Substitute a BKPT instruction at `addr`.
pub fn plant_bkpt<T: TargetControl>(tc: &mut T, addr: u32) -> Result<(), T::Error> {
    log::trace!("planting BKPT at {addr:#x}");
    tc.write_mem16(addr, arch::BKPT_INSTR)
}

/// Is the instruction word at `addr` a BKPT?
pub fn bkpt_at<T: TargetControl>(tc: &mut T, addr: u32) -> Result<bool, T::Error> {
    Ok(tc.read_mem16(addr)? == arch::BKPT_INSTR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::mock::MockTarget;

    #[test]
    fn halt_and_debug_state() {
        let mut t = MockTarget::new();
        t.set_word(arch::CORE_DEBUG, 0);
        assert!(!is_in_debug_state(&mut t).unwrap());
        assert!(halt(&mut t).unwrap());
        assert!(is_in_debug_state(&mut t).unwrap());
    }

    #[test]
    fn outstanding_transaction_is_not_halted() {
        let mut t = MockTarget::new();
        t.set_word(arch::CORE_DEBUG, 0b11);
        assert!(!is_in_debug_state(&mut t).unwrap());
    }

    #[test]
    fn exception_mapping() {
        let mut t = MockTarget::new();
        let cases = [
            (0u32, None),
            (arch::EXCAUSE_UNALIGNED, Some(Signal::SIGBUS)),
            (arch::EXCAUSE_FPU, Some(Signal::SIGFPE)),
            (arch::EXCAUSE_UNIMPL, Some(Signal::SIGILL)),
            (0x7, Some(Signal::SIGABRT)),
        ];
        for (cause, expected) in cases {
            t.set_status(arch::STATUS_ACTIVE_BIT | (cause << 16));
            assert_eq!(exception_signal(&mut t).unwrap(), expected);
        }
    }

    #[test]
    fn idle_and_gid_bits() {
        let mut t = MockTarget::new();
        t.set_status(0);
        assert!(is_idle(&mut t).unwrap());
        assert!(gints_enabled(&mut t).unwrap());

        t.set_status(arch::STATUS_ACTIVE_BIT | arch::STATUS_GID_BIT);
        assert!(!is_idle(&mut t).unwrap());
        assert!(!gints_enabled(&mut t).unwrap());
    }

    #[test]
    fn sw_reset_leaves_register_clear() {
        let mut t = MockTarget::new();
        sw_reset(&mut t).unwrap();
        assert_eq!(t.word(arch::MESH_SWRESET), 0);
    }

    #[test]
    fn bkpt_plant_and_probe() {
        let mut t = MockTarget::new();
        t.load_code(0x1000, &[0x0402]);
        assert!(!bkpt_at(&mut t, 0x1000).unwrap());
        plant_bkpt(&mut t, 0x1000).unwrap();
        assert!(bkpt_at(&mut t, 0x1000).unwrap());
    }
}
