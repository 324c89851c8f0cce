//! A scriptable in-memory target used by the unit tests.

use crate::arch;
use crate::common::Tid;
use crate::target::TargetControl;
use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;

/// Sparse byte-addressed memory plus a tiny model of the debug unit: a
/// `RUN` write to `CORE_DEBUGCMD` "executes" by popping the next scripted
/// stop PC, and a `HALT` write stops the core immediately.
pub(crate) struct MockTarget {
    pub mem: HashMap<u32, u8>,
    /// PCs (as observed at halt, i.e. one past a hit BKPT) consumed by
    /// successive RUN commands. An empty queue leaves the core running.
    pub resume_stops: VecDeque<u32>,
    /// Addresses whose access fails with a bus error.
    pub bad_addrs: HashSet<u32>,
    pub core_ids: Vec<u16>,
    pub rows: u32,
    pub cols: u32,
    pub gen_tid: Tid,
    pub exec_tid: Tid,
    pub platform_resets: usize,
    pub trace_supported: bool,
}

impl MockTarget {
    pub fn new() -> MockTarget {
        let mut t = MockTarget {
            mem: HashMap::new(),
            resume_stops: VecDeque::new(),
            bad_addrs: HashSet::new(),
            core_ids: vec![0x808],
            rows: 1,
            cols: 1,
            gen_tid: 0,
            exec_tid: 0,
            platform_resets: 0,
            trace_supported: false,
        };
        // halted, no outstanding transaction
        t.set_word(arch::CORE_DEBUG, 1);
        // active (not idle), interrupts enabled, no exception
        t.set_word(arch::CORE_CONFIG + (arch::SCR_STATUS * 4) as u32, arch::STATUS_ACTIVE_BIT);
        t
    }

    pub fn set_word(&mut self, addr: u32, val: u32) {
        for (i, b) in val.to_le_bytes().iter().enumerate() {
            self.mem.insert(addr + i as u32, *b);
        }
    }

    pub fn word(&self, addr: u32) -> u32 {
        let mut bytes = [0u8; 4];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = *self.mem.get(&(addr + i as u32)).unwrap_or(&0);
        }
        u32::from_le_bytes(bytes)
    }

    pub fn halfword(&self, addr: u32) -> u16 {
        let lo = *self.mem.get(&addr).unwrap_or(&0);
        let hi = *self.mem.get(&(addr + 1)).unwrap_or(&0);
        u16::from_le_bytes([lo, hi])
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.set_word(arch::CORE_CONFIG + (arch::SCR_PC * 4) as u32, pc);
    }

    pub fn pc(&self) -> u32 {
        self.word(arch::CORE_CONFIG + (arch::SCR_PC * 4) as u32)
    }

    pub fn set_status(&mut self, status: u32) {
        self.set_word(arch::CORE_CONFIG + (arch::SCR_STATUS * 4) as u32, status);
    }

    pub fn set_gpr(&mut self, n: usize, val: u32) {
        self.set_word(arch::CORE_R0 + (n * 4) as u32, val);
    }

    pub fn gpr(&self, n: usize) -> u32 {
        self.word(arch::CORE_R0 + (n * 4) as u32)
    }

    /// Place 16-bit instruction words at consecutive halfword addresses.
    pub fn load_code(&mut self, addr: u32, words: &[u16]) {
        for (i, w) in words.iter().enumerate() {
            let at = addr + (i * 2) as u32;
            let le = w.to_le_bytes();
            self.mem.insert(at, le[0]);
            self.mem.insert(at + 1, le[1]);
        }
    }

    fn check(&self, addr: u32) -> Result<(), String> {
        if self.bad_addrs.contains(&addr) {
            Err(format!("bus error at {addr:#x}"))
        } else {
            Ok(())
        }
    }
}

impl TargetControl for MockTarget {
    type Error = String;

    fn read_mem8(&mut self, addr: u32) -> Result<u8, String> {
        self.check(addr)?;
        Ok(*self.mem.get(&addr).unwrap_or(&0))
    }

    fn read_mem16(&mut self, addr: u32) -> Result<u16, String> {
        self.check(addr)?;
        Ok(self.halfword(addr))
    }

    fn read_mem32(&mut self, addr: u32) -> Result<u32, String> {
        self.check(addr)?;
        Ok(self.word(addr))
    }

    fn write_mem8(&mut self, addr: u32, value: u8) -> Result<(), String> {
        self.check(addr)?;
        self.mem.insert(addr, value);
        Ok(())
    }

    fn write_mem16(&mut self, addr: u32, value: u16) -> Result<(), String> {
        self.check(addr)?;
        let le = value.to_le_bytes();
        self.mem.insert(addr, le[0]);
        self.mem.insert(addr + 1, le[1]);
        Ok(())
    }

    fn write_mem32(&mut self, addr: u32, value: u32) -> Result<(), String> {
        self.check(addr)?;
        if addr == arch::CORE_DEBUGCMD && value == arch::DEBUG_CMD_RUN {
            // "execute": stop at the next scripted PC, or keep running
            match self.resume_stops.pop_front() {
                Some(stop_pc) => {
                    self.set_pc(stop_pc);
                    self.set_word(arch::CORE_DEBUG, 1);
                }
                None => self.set_word(arch::CORE_DEBUG, 0),
            }
            return Ok(());
        }
        if addr == arch::CORE_DEBUGCMD && value == arch::DEBUG_CMD_HALT {
            self.set_word(arch::CORE_DEBUG, 1);
            return Ok(());
        }
        self.set_word(addr, value);
        Ok(())
    }

    fn read_burst(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), String> {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_mem8(addr + i as u32)?;
        }
        Ok(())
    }

    fn write_burst(&mut self, addr: u32, buf: &[u8]) -> Result<(), String> {
        for (i, b) in buf.iter().enumerate() {
            self.write_mem8(addr + i as u32, *b)?;
        }
        Ok(())
    }

    fn platform_reset(&mut self) {
        self.platform_resets += 1;
    }

    fn list_core_ids(&mut self) -> Vec<u16> {
        self.core_ids.clone()
    }

    fn num_rows(&self) -> u32 {
        self.rows
    }

    fn num_cols(&self) -> u32 {
        self.cols
    }

    fn set_thread_general(&mut self, tid: Tid) -> bool {
        if tid > self.core_ids.len() as Tid {
            return false;
        }
        self.gen_tid = tid;
        true
    }

    fn set_thread_execute(&mut self, tid: Tid) -> bool {
        if tid > self.core_ids.len() as Tid {
            return false;
        }
        self.exec_tid = tid;
        true
    }

    fn init_trace(&mut self) -> bool {
        self.trace_supported
    }

    fn start_trace(&mut self) -> bool {
        self.trace_supported
    }

    fn stop_trace(&mut self) -> bool {
        self.trace_supported
    }
}
