//! YSTD: per-script descriptor header.

use crate::error::Result;
use crate::reader::Reader;

use super::read_header;

#[derive(Debug, Clone, Copy)]
pub struct Ystd {
    pub ver: u32,
    pub nvar: u32,
    pub ntext: u32,
}

impl Ystd {
    pub fn parse(r: &mut Reader) -> Result<Ystd> {
        let ver = read_header(r, "YSTD")?;
        let nvar = r.u32()?;
        let ntext = r.u32()?;
        r.assert_eof(ver)?;
        Ok(Ystd { ver, nvar, ntext })
    }
}
