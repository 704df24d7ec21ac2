//! YSTL: the script list (`yst_list.ybn`).

use crate::error::{Error, Result};
use crate::reader::Reader;

use super::read_header;

#[derive(Debug, Clone)]
pub struct Scr {
    pub idx: u32,
    /// Source path as recorded by the compiler, `\`-separated.
    pub path: String,
    pub time: u64,
    /// Negative marks an empty placeholder slot with no YSTB file.
    pub nvar: i32,
    pub nlbl: i32,
    pub ntext: i32,
}

impl Scr {
    pub fn is_empty_slot(&self) -> bool {
        self.nvar < 0
    }

    fn parse(r: &mut Reader, i: u32, with_ntext: bool) -> Result<Scr> {
        let idx = r.u32()?;
        if idx != i {
            return Err(Error::layout(format!("YSTL: record {i} carries index {idx}")));
        }
        let path_len = r.u32()? as usize;
        let path = r.str(path_len)?;
        let time = r.u64()?;
        let nvar = r.i32()?;
        let nlbl = r.i32()?;
        let ntext = if with_ntext { r.i32()? } else { 0 };
        Ok(Scr { idx, path, time, nvar, nlbl, ntext })
    }
}

#[derive(Debug, Clone)]
pub struct Ystl {
    pub ver: u32,
    pub scrs: Vec<Scr>,
}

impl Ystl {
    pub fn parse(r: &mut Reader) -> Result<Ystl> {
        let ver = read_header(r, "YSTL")?;
        let nscr = r.u32()?;
        let with_ntext = ver >= 470;
        let scrs = (0..nscr)
            .map(|i| Scr::parse(r, i, with_ntext))
            .collect::<Result<_>>()?;
        r.assert_eof(ver)?;
        Ok(Ystl { ver, scrs })
    }
}
