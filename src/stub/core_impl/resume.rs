//! Execution control: `c`, `C`, `s`, `S`, the Ctrl-C suspend path, and the
//! synthesized single-step engine.
//!
//! The target has no hardware single-step. One instruction of progress is
//! made by predicting every address the PC can reach next (fall-through,
//! branch target, and - via the shadowed IVT - any interrupt service
//! routine), planting temporary BKPTs there, resuming, and unwinding once
//! the core halts.

use super::prelude::*;
use crate::arch;
use crate::arch::ChangeOfFlow;
use crate::breakpoints::BreakpointKind;
use crate::common::Signal;
use crate::control;
use crate::protocol::hex::decode_hex;
use crate::regs;
use crate::stub::DebugFlags;
use std::time::Duration;

/// Rounds of debug-state polling per `continue` invocation. Control
/// returns to the session loop between invocations so a client break can
/// interleave.
const CONT_POLL_ROUNDS: u32 = 3;
const CONT_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Polling interval while waiting for a synthesized step to complete. A
/// step is over in a handful of core cycles unless an ISR intervenes.
const STEP_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How far back `continue` hunts for the TRAP that caused a halt. Trap
/// instructions are NOP-padded by the compiler, so the observed stop
/// address can trail the trap by several slots.
const TRAP_SEARCH_SLOTS: u32 = 9;

/// A breakpoint planted by the step engine. `engine_owned` records whether
/// the table entry was created by the engine; a pre-existing user entry is
/// never removed (and its BKPT stays in memory) on unwind.
#[derive(Clone, Copy)]
struct PlantedBkpt {
    addr: u32,
    engine_owned: bool,
}

impl GdbServer {
    /// `c[addr]`: continue, without signal.
    pub(super) fn cont<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        let addr = self.resume_addr(target, body)?;
        self.continue_resume(target, conn, Some(addr))
    }

    /// `C<sig>[;addr]`: continue with signal.
    ///
    /// Delivering a signal to a bare-metal core is meaningless, so the
    /// server does not resume: it re-reports a stop. `C03` arrives after a
    /// reported exit and is answered with QUIT; anything else is answered
    /// with the current exception state, or TRAP.
    pub(super) fn cont_with_signal<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        if self.config.debug.contains(DebugFlags::TRAP_AND_RSP_CON) {
            log::debug!(
                "continue with signal {:?} received",
                String::from_utf8_lossy(body)
            );
        }

        let cause = if body == b"C03" {
            Signal::SIGQUIT
        } else {
            log::warn!(
                "continue with signal {:?}: the server will not resume",
                String::from_utf8_lossy(body)
            );
            control::exception_signal(target)
                .handle_error()?
                .unwrap_or(Signal::SIGTRAP)
        };

        let pc = regs::read_pc(target).handle_error()?;
        self.report_stop(conn, pc, 0, cause)
    }

    /// `s[addr]`: single step one machine instruction.
    pub(super) fn step_cmd<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        let addr = self.resume_addr(target, body)?;
        self.step(target, conn, addr)
    }

    /// The optional resume address of a `c`/`s` packet, defaulting to the
    /// current PC (also on a malformed address, as a warning).
    fn resume_addr<T: TargetControl, C>(
        &mut self,
        target: &mut T,
        body: &[u8],
    ) -> Result<u32, InternalError<C>> {
        if body.len() == 1 {
            return regs::read_pc(target).handle_error();
        }
        match decode_hex(&body[1..]) {
            Ok(addr) => Ok(addr),
            Err(_) => {
                log::warn!(
                    "RSP resume address {:?} not recognized: using current PC",
                    String::from_utf8_lossy(body)
                );
                regs::read_pc(target).handle_error()
            }
        }
    }

    /// One polling round of a continue: called with `Some(addr)` by the
    /// `c` handler (which also starts the core), and with `None` by the
    /// session loop while the running flag stays set.
    pub(crate) fn continue_poll<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
    ) -> Result<(), InternalError<C::Error>> {
        self.continue_resume(target, conn, None)
    }

    fn continue_resume<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        addr: Option<u32>,
    ) -> Result<(), InternalError<C::Error>> {
        if self.config.debug.contains(DebugFlags::STOP_RESUME) && !self.running {
            log::debug!("continue from {addr:x?}");
        }

        if !self.running {
            if control::is_in_debug_state(target).handle_error()? {
                if let Some(addr) = addr {
                    regs::write_pc(target, addr).handle_error()?;
                }
                control::resume(target).handle_error()?;
            }
            // the core is on its way (or was never stopped); either way it
            // is running as far as the client is concerned
            self.running = true;
        }

        for _ in 0..CONT_POLL_ROUNDS {
            std::thread::sleep(CONT_POLL_INTERVAL);

            if control::is_in_debug_state(target).handle_error()? {
                return self.continue_stopped(target, conn);
            }
        }

        // still running; the session loop checks for Ctrl-C and calls back
        Ok(())
    }

    /// The core halted while continuing: find out why and either report a
    /// stop or hand off to the semihosting bridge.
    fn continue_stopped<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
    ) -> Result<(), InternalError<C::Error>> {
        let pc = regs::read_pc(target).handle_error()?;
        // the observed PC is one past a hit BKPT
        let prev_pc = pc.wrapping_sub(arch::BKPT_INSTLEN);

        let stopped_instr = target.read_mem16(prev_pc).handle_error()?;

        if stopped_instr == arch::BKPT_INSTR {
            // back up onto the breakpoint so a restart executes the real
            // instruction - but only a breakpoint this server knows about
            if self.bkpts.lookup(BreakpointKind::Memory, prev_pc).is_some() {
                regs::write_pc(target, prev_pc).handle_error()?;
                if self.config.debug.contains(DebugFlags::TRAP_AND_RSP_CON) {
                    log::debug!("set pc back to {prev_pc:#x}");
                }
            }
            return self.report_stop(conn, prev_pc, 0, Signal::SIGTRAP);
        }

        // not a breakpoint: a TRAP halts the core a little downstream, so
        // hunt backwards through the compiler's NOP padding
        let mut trap_instr = stopped_instr;
        let mut stopped_at_trap = arch::is_trap(stopped_instr);
        if !stopped_at_trap && stopped_instr == arch::NOP_INSTR {
            if self.config.debug.contains(DebugFlags::TRAP_AND_RSP_CON) {
                log::debug!("missed trap, looking backward from {pc:#x}");
            }
            for slot in 1..=TRAP_SEARCH_SLOTS {
                let j = prev_pc.wrapping_sub(slot * 2);
                let instr = target.read_mem16(j).handle_error()?;
                if arch::is_trap(instr) {
                    if self.config.debug.contains(DebugFlags::STOP_RESUME_DETAIL) {
                        log::debug!("trap found at {j:#x}");
                    }
                    trap_instr = instr;
                    stopped_at_trap = true;
                    break;
                }
            }
        }

        if stopped_at_trap {
            self.running = false;
            self.redirect_trap(target, conn, arch::trap_number(trap_instr))
        } else {
            let pc = regs::read_pc(target).handle_error()?;
            self.report_stop(conn, pc, 0, Signal::SIGTRAP)
        }
    }

    /// Ctrl-C: force the core into the debug state and report why it
    /// stopped.
    pub(crate) fn suspend<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
    ) -> Result<(), InternalError<C::Error>> {
        if self.config.debug.contains(DebugFlags::TRAP_AND_RSP_CON) {
            log::debug!("forcing debug mode");
        }

        let halted = if control::is_in_debug_state(target).handle_error()? {
            true
        } else {
            control::halt(target).handle_error()?
        };

        if !halted {
            return self.report_stop(conn, 0, 0, Signal::SIGHUP);
        }

        let mut reported_pc = regs::read_pc(target).handle_error()?;
        let cause = control::exception_signal(target).handle_error()?;

        if cause.is_none() && control::is_idle(target).handle_error()? {
            // when the core went idle the observed PC is one past the IDLE
            // instruction; keep it only if it still points at the IDLE
            let instr = target.read_mem16(reported_pc).handle_error()?;
            if !arch::is_idle(instr) {
                reported_pc = reported_pc.wrapping_sub(2);
            }
            regs::write_pc(target, reported_pc).handle_error()?;
        }

        self.report_stop(conn, reported_pc, 0, cause.unwrap_or(Signal::SIGTRAP))
    }

    // -------------------------------------------------------------------
    // The step engine

    /// Single step one instruction from `addr`.
    fn step<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        addr: u32,
    ) -> Result<(), InternalError<C::Error>> {
        if self.config.debug.contains(DebugFlags::STOP_RESUME_DETAIL) {
            log::debug!("step from PC {addr:#x}");
        }

        if !control::is_in_debug_state(target).handle_error()? {
            log::warn!("step request while the core is not halted: refused");
            return Err(InternalError::NonFatalError(1));
        }

        let reported_pc = regs::read_pc(target).handle_error()?;

        // stopped on an exception: the silicon cannot step out of it
        if let Some(cause) = control::exception_signal(target).handle_error()? {
            return self.report_stop(conn, reported_pc, 0, cause);
        }

        let opcode = target.read_mem16(reported_pc).handle_error()?;

        if arch::is_idle(opcode) {
            return self.step_over_idle(target, conn, reported_pc);
        }

        if arch::is_trap(opcode) {
            // semihosting drives resumption; no stop report here
            self.running = false;
            self.redirect_trap(target, conn, arch::trap_number(opcode))?;
            regs::write_pc(target, addr.wrapping_add(arch::TRAP_INSTLEN))
                .handle_error()?;
            return Ok(());
        }

        regs::write_pc(target, addr).handle_error()?;
        let pc = regs::read_pc(target).handle_error()?;
        if pc != addr {
            log::error!("PC write-back mismatch: wrote {addr:#x}, read {pc:#x}");
            return Err(InternalError::NonFatalError(1));
        }

        let opcode = target.read_mem16(pc).handle_error()?;
        let ext = target.read_mem16(pc.wrapping_add(2)).handle_error()?;
        if self.config.debug.contains(DebugFlags::STOP_RESUME_DETAIL) {
            log::debug!("opcode {opcode:#06x} at {pc:#x}");
        }

        let fall_through = addr.wrapping_add(if arch::is_32bit_instr(opcode) { 4 } else { 2 });

        // everything planted from here on must be unwound, even on a bus
        // error partway through
        let mut planted: Vec<PlantedBkpt> = Vec::with_capacity(2);
        let mut ivt_saved = false;

        let result = (|| -> Result<u32, InternalError<C::Error>> {
            self.plant_step_bkpt(target, fall_through, &mut planted)?;

            // second breakpoint at the branch target, if the instruction
            // can go anywhere but fall-through
            let jump_addr = match arch::change_of_flow(opcode, ext, pc) {
                ChangeOfFlow::None => fall_through,
                ChangeOfFlow::BranchTo(t) => t,
                ChangeOfFlow::Rti => regs::read_scr(target, arch::SCR_IRET).handle_error()?,
                ChangeOfFlow::JumpReg(rn) => {
                    regs::read_gpr(target, rn as usize).handle_error()?
                }
            };
            if jump_addr != fall_through {
                if self.config.debug.contains(DebugFlags::STOP_RESUME_DETAIL) {
                    log::debug!("change of flow to {jump_addr:#x}");
                }
                self.plant_step_bkpt(target, jump_addr, &mut planted)?;
            }

            // an interrupt dispatched mid-step would sail past both
            // breakpoints, so arm every ISR entry too
            self.save_ivt(target)?;
            ivt_saved = true;
            for entry in 1..arch::IVT_ENTRIES {
                let entry_addr = (entry * arch::IVT_ENTRY_BYTES) as u32;
                if entry_addr != pc {
                    control::plant_bkpt(target, entry_addr).handle_error()?;
                }
            }

            control::resume(target).handle_error()?;
            while !control::is_in_debug_state(target).handle_error()? {
                std::thread::sleep(STEP_POLL_INTERVAL);
            }

            self.restore_ivt(target)?;
            ivt_saved = false;

            Ok(jump_addr)
        })();

        let jump_addr = match result {
            Ok(jump_addr) => jump_addr,
            Err(e) => {
                // bus error partway through: put back whatever was planted
                if ivt_saved {
                    let _ = target.write_burst(0, &self.ivt_shadow);
                }
                self.unplant_step_bkpts(target, &planted);
                return Err(e);
            }
        };

        // the observed PC is one past the BKPT that hit
        let prev_pc = regs::read_pc(target).handle_error()?.wrapping_sub(arch::BKPT_INSTLEN);

        // the halt must be explainable: either the step engine (or the
        // user) owns a breakpoint at the stop address, or the predicted
        // branch target still holds a BKPT. Anything else is a logic bug.
        assert!(
            self.bkpts.lookup(BreakpointKind::Memory, prev_pc).is_some()
                || control::bkpt_at(target, jump_addr).unwrap_or(false),
            "step unwind: halt at {prev_pc:#x} matches no planted breakpoint"
        );

        regs::write_pc(target, prev_pc).handle_error()?;
        if self.config.debug.contains(DebugFlags::STOP_RESUME_DETAIL) {
            log::debug!("step stopped at {prev_pc:#x}");
        }

        self.unplant_step_bkpts(target, &planted);

        self.report_stop(conn, prev_pc, 0, Signal::SIGTRAP)
    }

    /// An IDLE instruction cannot be stepped over directly: the core only
    /// leaves idle when an interrupt fires. When one is already pending,
    /// arm the IVT and let the core run into the ISR's first instruction;
    /// otherwise there is nothing to wait for.
    fn step_over_idle<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        idle_pc: u32,
    ) -> Result<(), InternalError<C::Error>> {
        log::info!("stepping IDLE at {idle_pc:#x}");

        let gints = control::gints_enabled(target).handle_error()?;
        let imask = regs::read_scr(target, arch::SCR_IMASK).handle_error()?;
        let ilat = regs::read_scr(target, arch::SCR_ILAT).handle_error()?;

        // the next dispatched instruction will be an ISR entry
        if gints && (!imask & ilat) != 0 {
            self.save_ivt(target)?;

            let result = (|| -> Result<(), InternalError<C::Error>> {
                for entry in 1..arch::IVT_ENTRIES {
                    control::plant_bkpt(target, (entry * arch::IVT_ENTRY_BYTES) as u32)
                        .handle_error()?;
                }

                control::resume(target).handle_error()?;
                while !control::is_in_debug_state(target).handle_error()? {
                    std::thread::sleep(STEP_POLL_INTERVAL);
                }
                Ok(())
            })();

            let restore = target.write_burst(0, &self.ivt_shadow);
            result?;
            restore.handle_error()?;
        }

        let pc = regs::read_pc(target).handle_error()?.wrapping_sub(arch::BKPT_INSTLEN);
        regs::write_pc(target, pc).handle_error()?;
        self.report_stop(conn, pc, 0, Signal::SIGTRAP)
    }

    /// Plant a temporary breakpoint for the step engine, saving the
    /// original word only when no user breakpoint already owns the
    /// address.
    fn plant_step_bkpt<T: TargetControl, C>(
        &mut self,
        target: &mut T,
        addr: u32,
        planted: &mut Vec<PlantedBkpt>,
    ) -> Result<(), InternalError<C>> {
        let engine_owned = if self.bkpts.lookup(BreakpointKind::Memory, addr).is_none() {
            let saved = target.read_mem16(addr).handle_error()?;
            self.bkpts.add(BreakpointKind::Memory, addr, saved);
            true
        } else {
            false
        };
        planted.push(PlantedBkpt { addr, engine_owned });

        if self.config.debug.contains(DebugFlags::TRAP_AND_RSP_CON) {
            log::debug!("step breakpoint at {addr:#x}");
        }
        control::plant_bkpt(target, addr).handle_error()
    }

    /// Unwind the step engine's temporary breakpoints. Entries owned by a
    /// user breakpoint are left alone, in the table and in memory.
    fn unplant_step_bkpts<T: TargetControl>(&mut self, target: &mut T, planted: &[PlantedBkpt]) {
        for p in planted.iter().rev() {
            if !p.engine_owned {
                continue;
            }
            let saved = self
                .bkpts
                .remove(BreakpointKind::Memory, p.addr)
                .expect("step unwind: planted breakpoint vanished from the table");
            if let Err(e) = target.write_mem16(p.addr, saved) {
                log::warn!("failed to restore instruction at {:#x}: {}", p.addr, e);
            }
        }
    }

    /// Copy the live IVT into the shadow buffer.
    fn save_ivt<T: TargetControl, C>(&mut self, target: &mut T) -> Result<(), InternalError<C>> {
        let mut shadow = self.ivt_shadow;
        target.read_burst(0, &mut shadow).handle_error()?;
        self.ivt_shadow = shadow;
        Ok(())
    }

    /// Write the shadow buffer back over the IVT, verbatim.
    fn restore_ivt<T: TargetControl, C>(&mut self, target: &mut T) -> Result<(), InternalError<C>> {
        let shadow = self.ivt_shadow;
        target.write_burst(0, &shadow).handle_error()
    }
}

#[cfg(test)]
mod tests {
    use crate::arch;
    use crate::breakpoints::BreakpointKind;
    use crate::conn::mock::MockConn;
    use crate::stub::GdbServer;
    use crate::stub::ServerConfig;
    use crate::target::mock::MockTarget;

    fn server() -> GdbServer {
        GdbServer::new(ServerConfig::default())
    }

    fn ivt_bytes(t: &MockTarget) -> Vec<u8> {
        (0..arch::IVT_BYTES as u32)
            .map(|a| *t.mem.get(&a).unwrap_or(&0))
            .collect()
    }

    fn seed_ivt(t: &mut MockTarget) {
        for a in 0..arch::IVT_BYTES as u32 {
            t.mem.insert(a, (a as u8).wrapping_mul(7).wrapping_add(1));
        }
    }

    fn step(s: &mut GdbServer, t: &mut MockTarget, conn: &mut MockConn) {
        let mut body = b"s".to_vec();
        s.handle_command(t, conn, &mut body).map_err(|_| ()).unwrap();
    }

    #[test]
    fn step_sequential_instruction() {
        let mut t = MockTarget::new();
        let mut s = server();
        let mut conn = MockConn::new();

        t.set_pc(0x1000);
        t.load_code(0x1000, &[arch::NOP_INSTR]);
        t.load_code(0x1002, &[0x1234]);
        seed_ivt(&mut t);
        let ivt_before = ivt_bytes(&t);
        // the core halts one past the fall-through breakpoint
        t.resume_stops.push_back(0x1004);

        step(&mut s, &mut t, &mut conn);

        assert_eq!(conn.sent_packets(), vec!["S05"]);
        assert_eq!(t.pc(), 0x1002);
        // the planted word is restored and nothing leaks into the table
        assert_eq!(t.halfword(0x1002), 0x1234);
        assert!(s.bkpts.is_empty());
        // the IVT region is bit-for-bit what it was before the step
        assert_eq!(ivt_bytes(&t), ivt_before);
    }

    #[test]
    fn step_branch_plants_both_targets() {
        let mut t = MockTarget::new();
        let mut s = server();
        let mut conn = MockConn::new();

        // short branch, displacement +8 halfwords: 0x1000 -> 0x1010
        t.set_pc(0x1000);
        t.load_code(0x1000, &[0x0800]);
        t.load_code(0x1002, &[0x1111]);
        t.load_code(0x1010, &[0x2222]);
        // the branch is taken
        t.resume_stops.push_back(0x1012);

        step(&mut s, &mut t, &mut conn);

        assert_eq!(conn.sent_packets(), vec!["S05"]);
        assert_eq!(t.pc(), 0x1010);
        assert_eq!(t.halfword(0x1002), 0x1111);
        assert_eq!(t.halfword(0x1010), 0x2222);
        assert!(s.bkpts.is_empty());
    }

    #[test]
    fn step_register_jump_follows_gpr() {
        let mut t = MockTarget::new();
        let mut s = server();
        let mut conn = MockConn::new();

        // 16-bit register jump through GPR 5
        t.set_pc(0x1000);
        t.load_code(0x1000, &[(5 << 10) | 0x142]);
        t.set_gpr(5, 0x2000);
        t.load_code(0x2000, &[0x3333]);
        t.resume_stops.push_back(0x2002);

        step(&mut s, &mut t, &mut conn);

        assert_eq!(conn.sent_packets(), vec!["S05"]);
        assert_eq!(t.pc(), 0x2000);
        assert_eq!(t.halfword(0x2000), 0x3333);
        assert!(s.bkpts.is_empty());
    }

    #[test]
    fn step_keeps_user_breakpoint_at_fall_through() {
        let mut t = MockTarget::new();
        let mut s = server();
        let mut conn = MockConn::new();

        t.set_pc(0x1000);
        t.load_code(0x1000, &[arch::NOP_INSTR]);
        // a user breakpoint already owns the fall-through address
        s.bkpts.add(BreakpointKind::Memory, 0x1002, 0x5555);
        t.load_code(0x1002, &[arch::BKPT_INSTR]);
        t.resume_stops.push_back(0x1004);

        step(&mut s, &mut t, &mut conn);

        assert_eq!(conn.sent_packets(), vec!["S05"]);
        // the user's entry survives, with its original saved word, and the
        // BKPT stays planted in memory
        assert_eq!(s.bkpts.lookup(BreakpointKind::Memory, 0x1002), Some(0x5555));
        assert_eq!(t.halfword(0x1002), arch::BKPT_INSTR);
        assert_eq!(s.bkpts.len(), 1);
    }

    #[test]
    fn step_over_idle_without_pending_interrupt() {
        let mut t = MockTarget::new();
        let mut s = server();
        let mut conn = MockConn::new();

        t.set_pc(0x1000);
        t.load_code(0x1000, &[arch::IDLE_INSTR]);

        step(&mut s, &mut t, &mut conn);

        assert_eq!(conn.sent_packets(), vec!["S05"]);
        assert_eq!(t.pc(), 0x1000 - arch::BKPT_INSTLEN);
    }

    #[test]
    fn step_over_idle_with_pending_interrupt_lands_in_isr() {
        let mut t = MockTarget::new();
        let mut s = server();
        let mut conn = MockConn::new();

        t.set_pc(0x1000);
        t.load_code(0x1000, &[arch::IDLE_INSTR]);
        seed_ivt(&mut t);
        let ivt_before = ivt_bytes(&t);
        // interrupt 1 latched and unmasked, interrupts globally enabled
        t.set_word(arch::CORE_CONFIG + (arch::SCR_ILAT * 4) as u32, 1 << 1);
        t.set_word(arch::CORE_CONFIG + (arch::SCR_IMASK * 4) as u32, 0);
        // the core wakes into the ISR entry and trips its breakpoint
        t.resume_stops.push_back(4 + arch::BKPT_INSTLEN);

        step(&mut s, &mut t, &mut conn);

        assert_eq!(conn.sent_packets(), vec!["S05"]);
        assert_eq!(t.pc(), 4);
        assert_eq!(ivt_bytes(&t), ivt_before);
    }

    #[test]
    fn step_over_trap_redirects_to_file_io() {
        let mut t = MockTarget::new();
        let mut s = server();
        let mut conn = MockConn::new();

        t.set_pc(0x3000);
        t.load_code(0x3000, &[arch::TRAP_INSTR]); // trap 0: write
        t.set_gpr(0, 1);
        t.set_gpr(1, 0x8000);
        t.set_gpr(2, 5);

        step(&mut s, &mut t, &mut conn);

        // no stop report: the File-I/O exchange drives resumption
        assert_eq!(conn.sent_packets(), vec!["Fwrite,1,8000,5"]);
        assert_eq!(t.pc(), 0x3000 + arch::TRAP_INSTLEN);
        assert!(!s.running);
    }

    #[test]
    fn step_reports_pending_exception_instead_of_stepping() {
        let mut t = MockTarget::new();
        let mut s = server();
        let mut conn = MockConn::new();

        t.set_pc(0x1000);
        t.set_status(arch::STATUS_ACTIVE_BIT | (arch::EXCAUSE_FPU << 16));

        step(&mut s, &mut t, &mut conn);

        // SIGFPE
        assert_eq!(conn.sent_packets(), vec!["S08"]);
        assert_eq!(t.pc(), 0x1000);
    }

    #[test]
    fn step_refused_when_core_not_halted() {
        let mut t = MockTarget::new();
        let mut s = server();
        let mut conn = MockConn::new();

        t.set_word(arch::CORE_DEBUG, 0);
        let mut body = b"s".to_vec();
        assert!(s.handle_command(&mut t, &mut conn, &mut body).is_err());
        assert!(conn.sent_packets().is_empty());
    }
}
