//! YSER: the engine error-message table.

use crate::error::Result;
use crate::reader::Reader;

use super::{check_pad, read_header};

#[derive(Debug, Clone)]
pub struct ErrEntry {
    pub id: u32,
    pub msg: String,
}

impl ErrEntry {
    pub(crate) fn parse(r: &mut Reader) -> Result<ErrEntry> {
        let id = r.u32()?;
        let msg = r.sz()?;
        Ok(ErrEntry { id, msg })
    }
}

#[derive(Debug, Clone)]
pub struct Yser {
    pub ver: u32,
    pub errs: Vec<ErrEntry>,
}

impl Yser {
    pub fn parse(r: &mut Reader) -> Result<Yser> {
        let ver = read_header(r, "YSER")?;
        let nerr = r.u32()?;
        check_pad(r.u32()?, "YSER")?;
        let errs = (0..nerr).map(|_| ErrEntry::parse(r)).collect::<Result<_>>()?;
        r.assert_eof(ver)?;
        Ok(Yser { ver, errs })
    }
}
