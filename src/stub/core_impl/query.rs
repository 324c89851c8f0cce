//! The `q` (query), `Q` (set), and `v` packet families.

use super::prelude::*;
use crate::common::ATTACHED_TID;
use crate::protocol::hex::decode_hex;
use crate::protocol::PKT_CAP;
use crate::stub::core_impl::osdata::OsDataAnnex;

impl GdbServer {
    /// `q...`: query packets.
    pub(super) fn query<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        if body == b"qC" {
            // the current thread ID; this server exposes one thread of
            // control
            let mut res = ResponseWriter::new(conn);
            res.write_str("QC")?;
            res.write_num(ATTACHED_TID as u32)?;
            res.flush()?;
            Ok(())
        } else if body.starts_with(b"qCRC") {
            log::warn!("RSP CRC query not supported");
            Err(InternalError::NonFatalError(1))
        } else if body == b"qfThreadInfo" {
            let mut res = ResponseWriter::new(conn);
            res.write(b'm')?;
            res.write_num(ATTACHED_TID as u32)?;
            res.flush()?;
            Ok(())
        } else if body == b"qsThreadInfo" {
            // no more threads: end-of-list marker
            self.reply_str(conn, "l")
        } else if body.starts_with(b"qGetTLSAddr:") {
            self.reply_empty(conn)
        } else if body.starts_with(b"qL") {
            log::warn!("RSP qL deprecated: no info returned");
            self.reply_str(conn, "qM001")
        } else if body == b"qOffsets" {
            // report any relocation
            self.reply_str(conn, "Text=0;Data=0;Bss=0")
        } else if body.starts_with(b"qP") {
            log::warn!("RSP qP deprecated: no info returned");
            self.reply_empty(conn)
        } else if let Some(hex_cmd) = body.strip_prefix(b"qRcmd,") {
            self.monitor_cmd(target, conn, hex_cmd)
        } else if body.starts_with(b"qSupported") {
            // note: the packet size allows for 'G' + all the registers, so
            // a reply to 'g' always fits
            let mut res = ResponseWriter::new(conn);
            res.write_str("PacketSize=")?;
            res.write_num(PKT_CAP as u32)?;
            res.write_str(";qXfer:osdata:read+")?;
            res.flush()?;
            Ok(())
        } else if body.starts_with(b"qSymbol:") {
            // offer to look up symbols; nothing is wanted
            self.reply_str(conn, "OK")
        } else if body.starts_with(b"qThreadExtraInfo,") {
            // a constant, hex-ASCII encoded with a terminating NUL
            let mut res = ResponseWriter::new(conn);
            res.write_hex_buf(b"Runnable")?;
            res.write_hex(0)?;
            res.flush()?;
            Ok(())
        } else if body.starts_with(b"qXfer:") {
            self.transfer(target, conn, body)
        } else if body.starts_with(b"qTStatus") {
            // no trace experiment is ever running
            self.reply_empty(conn)
        } else if body.starts_with(b"qAttached") {
            self.reply_empty(conn)
        } else {
            // unrecognized query: the RSP convention is an empty reply
            self.reply_empty(conn)
        }
    }

    /// `qXfer:<object>:read:<annex>:<offset>,<length>`. Only the `osdata`
    /// object is supported.
    fn transfer<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        let mut tokens = body.split(|b| *b == b':');

        let parsed = (|| {
            let _qxfer = tokens.next()?;
            let object = tokens.next()?;
            let op = tokens.next()?;
            let annex = tokens.next()?;
            let mut window = tokens.next()?.splitn(2, |b| *b == b',');
            let offset: usize = decode_hex(window.next()?).ok()?;
            let length: usize = decode_hex(window.next()?).ok()?;
            Some((object, op, annex, offset, length))
        })();

        let Some((object, op, annex, offset, length)) = parsed else {
            log::debug!("qXfer unrecognized: {:?}", String::from_utf8_lossy(body));
            return self.reply_empty(conn);
        };

        if object != b"osdata" || op != b"read" {
            return self.reply_empty(conn);
        }

        let annex = match annex {
            b"process" => OsDataAnnex::Process,
            b"load" => OsDataAnnex::Load,
            b"traffic" => OsDataAnnex::Traffic,
            _ => return self.reply_empty(conn),
        };

        self.serve_osdata(target, conn, annex, offset, length)
    }

    /// `Q...`: set packets.
    pub(super) fn set<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        if body.starts_with(b"QPassSignals:") {
            // passing signals is not supported
            self.reply_empty(conn)
        } else if body == b"QTStart" {
            if target.start_trace() {
                self.reply_str(conn, "OK")
            } else {
                self.reply_empty(conn)
            }
        } else if body == b"QTStop" {
            if target.stop_trace() {
                self.reply_str(conn, "OK")
            } else {
                self.reply_empty(conn)
            }
        } else if body == b"QTinit" {
            if target.init_trace() {
                self.reply_str(conn, "OK")
            } else {
                self.reply_empty(conn)
            }
        } else if body.starts_with(b"QTDP") || body.starts_with(b"QFrame")
            || body.starts_with(b"QTro")
        {
            // tracepoint downloads are accepted and ignored; answering OK
            // to 'QTDP' keeps the rest from being generated
            self.reply_str(conn, "OK")
        } else {
            log::warn!(
                "unrecognized RSP set request {:?}: ignored",
                String::from_utf8_lossy(body)
            );
            self.reply_empty(conn)
        }
    }

    /// `v...`: execution-control packets.
    pub(super) fn v_packet<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        body: &[u8],
    ) -> Result<(), InternalError<C::Error>> {
        if body.starts_with(b"vAttach;") {
            // attaching is a null action: report that we are stopped
            self.reply_str(conn, "S05")
        } else if body == b"vCont?" {
            // vCont action lists are not supported
            self.reply_empty(conn)
        } else if body.starts_with(b"vCont") {
            // shouldn't happen: non-support was reported via vCont?
            log::warn!("RSP vCont not supported: ignored");
            Ok(())
        } else if body.starts_with(b"vFile:") {
            log::warn!("RSP vFile not supported: ignored");
            self.reply_empty(conn)
        } else if body.starts_with(b"vFlashErase:")
            || body.starts_with(b"vFlashWrite:")
            || body == b"vFlashDone"
        {
            log::warn!("RSP flash operations not supported: ignored");
            Err(InternalError::NonFatalError(1))
        } else if let Some(args) = body.strip_prefix(b"vRun;") {
            if !args.is_empty() {
                log::warn!("unexpected arguments to RSP vRun command: ignored");
            }
            // restart, but unlike 'R' report as though just stopped
            if let Err(e) = crate::regs::write_pc(target, 0) {
                log::warn!("vRun failed to write PC: {}", e);
            }
            self.reply_str(conn, "S05")
        } else {
            log::warn!(
                "unknown RSP 'v' packet type {:?}: ignored",
                String::from_utf8_lossy(body)
            );
            Err(InternalError::NonFatalError(1))
        }
    }
}
