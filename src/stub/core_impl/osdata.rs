//! `qXfer:osdata:read` renderers: XML views of the mesh for GDB's
//! `info os` family.
//!
//! Each document is built once per fresh offset-0 request and then served
//! in windows: `m<chunk>` while bytes remain, `l<tail>` for the last one.
//! The load and traffic figures are placeholders until the fabric exposes
//! real counters.

use super::prelude::*;
use crate::stub::DebugFlags;
use rand::Rng;
use std::fmt::Write;

#[derive(Debug, Clone, Copy)]
pub(super) enum OsDataAnnex {
    Process,
    Load,
    Traffic,
}

impl GdbServer {
    pub(super) fn serve_osdata<T: TargetControl, C: Connection>(
        &mut self,
        target: &mut T,
        conn: &mut C,
        annex: OsDataAnnex,
        offset: usize,
        length: usize,
    ) -> Result<(), InternalError<C::Error>> {
        if self.config.debug.contains(DebugFlags::TRAP_AND_RSP_CON) {
            log::debug!("qXfer:osdata:read {annex:?} offset {offset:#x}, length {length:#x}");
        }

        if offset == 0 {
            let doc = match annex {
                OsDataAnnex::Process => build_process(target),
                OsDataAnnex::Load => build_load(target),
                OsDataAnnex::Traffic => build_traffic(target),
            };
            match annex {
                OsDataAnnex::Process => self.os_process = doc,
                OsDataAnnex::Load => self.os_load = doc,
                OsDataAnnex::Traffic => self.os_traffic = doc,
            }
        }

        let doc = match annex {
            OsDataAnnex::Process => self.os_process.as_bytes(),
            OsDataAnnex::Load => self.os_load.as_bytes(),
            OsDataAnnex::Traffic => self.os_traffic.as_bytes(),
        };

        let mut res = ResponseWriter::new(conn);
        if offset >= doc.len() {
            res.write(b'l')?;
        } else {
            let chunk = &doc[offset..doc.len().min(offset + length)];
            let marker = if offset + chunk.len() < doc.len() {
                b'm'
            } else {
                b'l'
            };
            res.write(marker)?;
            res.write_all(chunk)?;
        }
        res.flush()?;
        Ok(())
    }
}

const OSDATA_HEADER: &str = "<?xml version=\"1.0\"?>\n<!DOCTYPE target SYSTEM \"osdata.dtd\">\n";

/// The process view: bare metal has a single "process" spanning every live
/// core.
fn build_process<T: TargetControl>(target: &mut T) -> String {
    let cores = target
        .list_core_ids()
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{OSDATA_HEADER}\
         <osdata type=\"processes\">\n\
         \x20 <item>\n\
         \x20   <column name=\"pid\">1</column>\n\
         \x20   <column name=\"user\">root</column>\n\
         \x20   <column name=\"command\"></column>\n\
         \x20   <column name=\"cores\">\n\
         \x20     {cores}\n\
         \x20   </column>\n\
         \x20 </item>\n\
         </osdata>"
    )
}

/// The per-core load view. Core IDs render as four octal digits: two for
/// the row, two for the column.
fn build_load<T: TargetControl>(target: &mut T) -> String {
    let mut rng = rand::thread_rng();
    let mut doc = format!("{OSDATA_HEADER}<osdata type=\"load\">\n");

    for id in target.list_core_ids() {
        let _ = write!(
            doc,
            "  <item>\n\
             \x20   <column name=\"coreid\">{id:04o}</column>\n\
             \x20   <column name=\"load\">{load:02}</column>\n\
             \x20 </item>\n",
            load = rng.gen_range(0..100u32),
        );
    }

    doc.push_str("</osdata>");
    doc
}

/// The mesh traffic view: per core, six directional columns. Core (0,0)
/// sits at the north-west corner, so edge cores show `--` for the
/// direction with no neighbour. (Empty columns confuse GDB.)
fn build_traffic<T: TargetControl>(target: &mut T) -> String {
    let mut rng = rand::thread_rng();
    let max_row = target.num_rows().saturating_sub(1) as u16;
    let max_col = target.num_cols().saturating_sub(1) as u16;

    let mut doc = format!("{OSDATA_HEADER}<osdata type=\"traffic\">\n");

    for id in target.list_core_ids() {
        let core = crate::arch::CoreId(id);
        let (row, col) = (core.row(), core.col());

        let _ = write!(
            doc,
            "  <item>\n    <column name=\"coreid\">{id:04o}</column>\n"
        );

        let directions = [
            ("North", row > 0),
            ("South", row < max_row),
            ("East", col < max_col),
            ("West", col > 0),
        ];
        for (name, has_neighbour) in directions {
            for way in ["In", "Out"] {
                let figure = if has_neighbour {
                    format!("{:02}", rng.gen_range(0..100u32))
                } else {
                    "--".to_string()
                };
                let _ = write!(doc, "    <column name=\"{name} {way}\">{figure}</column>\n");
            }
        }

        doc.push_str("  </item>\n");
    }

    doc.push_str("</osdata>");
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::mock::MockTarget;

    #[test]
    fn process_lists_every_core() {
        let mut t = MockTarget::new();
        t.core_ids = vec![0x808, 0x809];
        let doc = build_process(&mut t);
        assert!(doc.starts_with("<?xml version=\"1.0\"?>"));
        assert!(doc.contains("<column name=\"pid\">1</column>"));
        assert!(doc.contains("2056, 2057"));
        assert!(doc.ends_with("</osdata>"));
    }

    #[test]
    fn load_renders_octal_coreid_rows() {
        let mut t = MockTarget::new();
        t.core_ids = vec![0x808];
        let doc = build_load(&mut t);
        // 0x808 = row 32, col 8 = octal 40, 10
        assert!(doc.contains("<column name=\"coreid\">4010</column>"));
        assert!(doc.contains("<column name=\"load\">"));
    }

    #[test]
    fn traffic_marks_edges() {
        let mut t = MockTarget::new();
        t.core_ids = vec![0];
        t.rows = 1;
        t.cols = 1;
        // the sole core of a 1x1 mesh has no neighbours anywhere
        let doc = build_traffic(&mut t);
        for dir in ["North In", "South Out", "East In", "West Out"] {
            assert!(doc.contains(&format!("<column name=\"{dir}\">--</column>")));
        }
    }

    #[test]
    fn traffic_interior_core_has_figures_on_every_side() {
        let mut t = MockTarget::new();
        t.core_ids = vec![(1 << 6) | 1];
        t.rows = 3;
        t.cols = 3;
        let doc = build_traffic(&mut t);
        assert!(!doc.contains("--"));
        assert!(doc.contains("<column name=\"West Out\">"));
    }
}
