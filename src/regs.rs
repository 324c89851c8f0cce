//! The register window: named and numbered access to the memory-mapped
//! register file of the currently-steered core.
//!
//! Registers live in core-local memory, so every accessor here is a thin
//! wrapper over a word access through [`TargetControl`].

use crate::arch;
use crate::target::TargetControl;

/// The memory address backing a GDB register number, or `None` for an
/// out-of-range number.
pub fn reg_addr(regnum: usize) -> Option<u32> {
    if regnum < arch::NUM_GPRS {
        Some(arch::CORE_R0 + (regnum * arch::WORD_BYTES) as u32)
    } else if regnum < arch::NUM_GPRS + arch::NUM_SCRS_0 {
        Some(arch::CORE_CONFIG + ((regnum - arch::NUM_GPRS) * arch::WORD_BYTES) as u32)
    } else if regnum < arch::NUM_REGS {
        Some(
            arch::DMA0_CONFIG
                + ((regnum - arch::NUM_GPRS - arch::NUM_SCRS_0) * arch::WORD_BYTES) as u32,
        )
    } else {
        None
    }
}

/// Read a register by GDB register number. Out-of-range numbers are the
/// caller's problem; this returns `None` for them before touching the
/// target.
pub fn read_reg<T: TargetControl>(tc: &mut T, regnum: usize) -> Option<Result<u32, T::Error>> {
    reg_addr(regnum).map(|addr| tc.read_mem32(addr))
}

/// Write a register by GDB register number.
pub fn write_reg<T: TargetControl>(
    tc: &mut T,
    regnum: usize,
    value: u32,
) -> Option<Result<(), T::Error>> {
    reg_addr(regnum).map(|addr| tc.write_mem32(addr, value))
}

pub fn read_gpr<T: TargetControl>(tc: &mut T, n: usize) -> Result<u32, T::Error> {
    tc.read_mem32(arch::CORE_R0 + (n * arch::WORD_BYTES) as u32)
}

pub fn write_gpr<T: TargetControl>(tc: &mut T, n: usize, value: u32) -> Result<(), T::Error> {
    tc.write_mem32(arch::CORE_R0 + (n * arch::WORD_BYTES) as u32, value)
}

/// Read a group-0 special core register by word index.
pub fn read_scr<T: TargetControl>(tc: &mut T, index: usize) -> Result<u32, T::Error> {
    tc.read_mem32(arch::CORE_CONFIG + (index * arch::WORD_BYTES) as u32)
}

/// Write a group-0 special core register by word index.
pub fn write_scr<T: TargetControl>(tc: &mut T, index: usize, value: u32) -> Result<(), T::Error> {
    tc.write_mem32(arch::CORE_CONFIG + (index * arch::WORD_BYTES) as u32, value)
}

pub fn read_pc<T: TargetControl>(tc: &mut T) -> Result<u32, T::Error> {
    read_scr(tc, arch::SCR_PC)
}

pub fn write_pc<T: TargetControl>(tc: &mut T, addr: u32) -> Result<(), T::Error> {
    write_scr(tc, arch::SCR_PC, addr)
}

pub fn read_status<T: TargetControl>(tc: &mut T) -> Result<u32, T::Error> {
    read_scr(tc, arch::SCR_STATUS)
}

pub fn read_lr<T: TargetControl>(tc: &mut T) -> Result<u32, T::Error> {
    read_gpr(tc, arch::LR_REGNUM)
}

pub fn read_fp<T: TargetControl>(tc: &mut T) -> Result<u32, T::Error> {
    read_gpr(tc, arch::FP_REGNUM)
}

pub fn read_sp<T: TargetControl>(tc: &mut T) -> Result<u32, T::Error> {
    read_gpr(tc, arch::SP_REGNUM)
}

pub fn read_coreid<T: TargetControl>(tc: &mut T) -> Result<u32, T::Error> {
    tc.read_mem32(arch::MESH_COREID)
}

/// Read the whole register file: the GPR block, SCR group 0, and the DMA
/// SCR block, each as one contiguous burst.
pub fn read_all<T: TargetControl>(tc: &mut T) -> Result<[u32; arch::NUM_REGS], T::Error> {
    let mut regs = [0u32; arch::NUM_REGS];

    let mut read_block = |tc: &mut T, base: u32, out: &mut [u32]| -> Result<(), T::Error> {
        let mut buf = vec![0u8; out.len() * arch::WORD_BYTES];
        tc.read_burst(base, &mut buf)?;
        for (word, bytes) in out.iter_mut().zip(buf.chunks_exact(arch::WORD_BYTES)) {
            *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        Ok(())
    };

    let (gprs, scrs) = regs.split_at_mut(arch::NUM_GPRS);
    let (scr0, dma) = scrs.split_at_mut(arch::NUM_SCRS_0);
    read_block(tc, arch::CORE_R0, gprs)?;
    read_block(tc, arch::CORE_CONFIG, scr0)?;
    read_block(tc, arch::DMA0_CONFIG, dma)?;

    Ok(regs)
}

/// Write the whole register file; the inverse of [`read_all`].
pub fn write_all<T: TargetControl>(
    tc: &mut T,
    regs: &[u32; arch::NUM_REGS],
) -> Result<(), T::Error> {
    let mut write_block = |tc: &mut T, base: u32, words: &[u32]| -> Result<(), T::Error> {
        let mut buf = Vec::with_capacity(words.len() * arch::WORD_BYTES);
        for w in words {
            buf.extend_from_slice(&w.to_le_bytes());
        }
        tc.write_burst(base, &buf)
    };

    let (gprs, scrs) = regs.split_at(arch::NUM_GPRS);
    let (scr0, dma) = scrs.split_at(arch::NUM_SCRS_0);
    write_block(tc, arch::CORE_R0, gprs)?;
    write_block(tc, arch::CORE_CONFIG, scr0)?;
    write_block(tc, arch::DMA0_CONFIG, dma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::mock::MockTarget;

    #[test]
    fn reg_addr_layout() {
        assert_eq!(reg_addr(0), Some(arch::CORE_R0));
        assert_eq!(reg_addr(63), Some(arch::CORE_R0 + 63 * 4));
        // PC is SCR group 0, word 2
        assert_eq!(reg_addr(arch::NUM_GPRS + 2), Some(arch::CORE_CONFIG + 8));
        assert_eq!(reg_addr(arch::NUM_GPRS + arch::NUM_SCRS_0), Some(arch::DMA0_CONFIG));
        assert_eq!(reg_addr(arch::NUM_REGS), None);
    }

    #[test]
    fn pc_accessors() {
        let mut t = MockTarget::new();
        write_pc(&mut t, 0x100).unwrap();
        assert_eq!(read_pc(&mut t).unwrap(), 0x100);
        assert_eq!(t.word(arch::CORE_CONFIG + 8), 0x100);
    }

    #[test]
    fn read_all_round_trips_through_write_all() {
        let mut t = MockTarget::new();
        let mut regs = [0u32; arch::NUM_REGS];
        for (i, r) in regs.iter_mut().enumerate() {
            *r = (i as u32).wrapping_mul(0x01010101);
        }
        write_all(&mut t, &regs).unwrap();
        assert_eq!(read_all(&mut t).unwrap(), regs);
        // spot-check the memory map: GPR 1 lands at CORE_R0 + 4
        assert_eq!(t.word(arch::CORE_R0 + 4), 0x01010101);
    }
}
