//! YSLB: the project-wide label table (`ysl.ybn`).
//!
//! `ip` is a bytecode offset for engine builds before 300 and a command
//! index afterwards; the symbol environment normalizes this when it builds
//! its per-script label maps.

use crate::error::Result;
use crate::reader::Reader;

use super::read_header;

#[derive(Debug, Clone)]
pub struct Lbl {
    pub name: String,
    pub id: u32,
    pub ip: u32,
    pub scr_idx: u16,
    pub if_lvl: u8,
    pub loop_lvl: u8,
}

impl Lbl {
    fn parse(r: &mut Reader) -> Result<Lbl> {
        let name_len = r.byte()? as usize;
        let name = r.str(name_len)?;
        let id = r.u32()?;
        let ip = r.u32()?;
        let scr_idx = r.u16()?;
        let if_lvl = r.byte()?;
        let loop_lvl = r.byte()?;
        Ok(Lbl { name, id, ip, scr_idx, if_lvl, loop_lvl })
    }
}

#[derive(Debug, Clone)]
pub struct Yslb {
    pub ver: u32,
    pub lbls: Vec<Lbl>,
}

impl Yslb {
    pub fn parse(r: &mut Reader) -> Result<Yslb> {
        let ver = read_header(r, "YSLB")?;
        let nlbl = r.u32()?;
        r.skip(4 * 256)?; // hash bucket table, rebuilt by the compiler
        let lbls = (0..nlbl).map(|_| Lbl::parse(r)).collect::<Result<_>>()?;
        r.assert_eof(ver)?;
        Ok(Yslb { ver, lbls })
    }
}
