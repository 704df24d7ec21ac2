//! YSCD: the full compiler definition (`YSCom.ycd`).
//!
//! Ships with the official compiler rather than with games, so it is an
//! optional input. When present it supplies real names and checked types
//! for every compiler-defined variable and command parameter.

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::USER_VAR_MIN;

use super::yscm::ERROR_STRING_COUNT;
use super::yser::ErrEntry;
use super::{check_pad, read_header};

#[derive(Debug, Clone)]
pub struct DArg {
    pub name: String,
    /// Preserved, meaning unknown.
    pub unk2: (u8, u8),
    pub typ: u8,
    pub val: u8,
}

impl DArg {
    fn parse(r: &mut Reader) -> Result<DArg> {
        let name = r.sz()?;
        let raw = r.read(4)?;
        let (u0, u1, typ, val) = (raw[0], raw[1], raw[2], raw[3]);
        if typ > 3 {
            return Err(Error::layout(format!("YSCD: argument {name} has type tag {typ}")));
        }
        Ok(DArg { name, unk2: (u0, u1), typ, val })
    }
}

#[derive(Debug, Clone)]
pub struct DCmd {
    pub name: String,
    pub args: Vec<DArg>,
}

impl DCmd {
    fn parse(r: &mut Reader) -> Result<DCmd> {
        let name = r.sz()?;
        let narg = r.byte()?;
        let args = (0..narg).map(|_| DArg::parse(r)).collect::<Result<_>>()?;
        Ok(DCmd { name, args })
    }
}

#[derive(Debug, Clone)]
pub struct DVar {
    pub name: String,
    pub typ: u8,
    pub dim: Vec<u32>,
}

impl DVar {
    fn parse(r: &mut Reader) -> Result<DVar> {
        let name = r.sz()?;
        let typ = r.byte()?;
        let ndim = r.byte()?;
        if !(1..=3).contains(&typ) {
            return Err(Error::layout(format!("YSCD: variable {name} has type tag {typ}")));
        }
        let dim = (0..ndim).map(|_| r.u32()).collect::<Result<_>>()?;
        Ok(DVar { name, typ, dim })
    }
}

#[derive(Debug, Clone)]
pub struct Yscd {
    pub ver: u32,
    pub cmds: Vec<DCmd>,
    pub vars: Vec<DVar>,
    pub errs: Vec<ErrEntry>,
    pub estr: Vec<String>,
    /// Square block table (`n` blocks of `n` bytes); preserved, meaning unknown.
    pub blok: Vec<Vec<u8>>,
    /// Trailing 2048-byte payload; preserved, meaning unknown.
    pub b800: Vec<u8>,
}

impl Yscd {
    pub fn parse(r: &mut Reader) -> Result<Yscd> {
        let ver = read_header(r, "YSCD")?;
        let ncmd = r.u32()?;
        check_pad(r.u32()?, "YSCD commands")?;
        let cmds = (0..ncmd).map(|_| DCmd::parse(r)).collect::<Result<_>>()?;
        let nvar = r.u32()?;
        check_pad(r.u32()?, "YSCD variables")?;
        if nvar >= USER_VAR_MIN as u32 {
            return Err(Error::layout(format!(
                "YSCD: {nvar} compiler variables exceed the compiler index range"
            )));
        }
        let vars = (0..nvar).map(|_| DVar::parse(r)).collect::<Result<_>>()?;
        let nerr = r.u32()?;
        check_pad(r.u32()?, "YSCD errors")?;
        let errs = (0..nerr).map(|_| ErrEntry::parse(r)).collect::<Result<_>>()?;
        let estr = (0..ERROR_STRING_COUNT).map(|_| r.sz()).collect::<Result<_>>()?;
        let nblk = r.u32()?;
        check_pad(r.u32()?, "YSCD blocks")?;
        let blok = (0..nblk)
            .map(|_| r.read(nblk as usize).map(<[u8]>::to_vec))
            .collect::<Result<_>>()?;
        let b800 = r.read(0x800)?.to_vec();
        r.assert_eof(ver)?;
        Ok(Yscd { ver, cmds, vars, errs, estr, blok, b800 })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use yuris_nls::Codec;

    use super::*;

    pub(crate) fn sample_yscd_bytes(
        ver: u32,
        cmds: &[(&str, &[&str])],
        vars: &[(&str, u8, &[u32])],
    ) -> Vec<u8> {
        let mut buf = b"YSCD".to_vec();
        buf.extend_from_slice(&ver.to_le_bytes());
        buf.extend_from_slice(&(cmds.len() as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        for (name, args) in cmds {
            buf.extend_from_slice(name.as_bytes());
            buf.push(0);
            buf.push(args.len() as u8);
            for a in *args {
                buf.extend_from_slice(a.as_bytes());
                buf.push(0);
                buf.extend_from_slice(&[0, 0, 0, 0]); // unk2 + typ + val
            }
        }
        buf.extend_from_slice(&(vars.len() as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        for (name, typ, dim) in vars {
            buf.extend_from_slice(name.as_bytes());
            buf.push(0);
            buf.push(*typ);
            buf.push(dim.len() as u8);
            for d in *dim {
                buf.extend_from_slice(&d.to_le_bytes());
            }
        }
        buf.extend_from_slice(&0u32.to_le_bytes()); // no error entries
        buf.extend_from_slice(&0u32.to_le_bytes());
        for _ in 0..ERROR_STRING_COUNT {
            buf.push(0);
        }
        buf.extend_from_slice(&0u32.to_le_bytes()); // no blocks
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 0x800]);
        buf
    }

    #[test]
    fn parses_definition() {
        let buf = sample_yscd_bytes(
            480,
            &[("IF", &["EXP"]), ("END", &[])],
            &[("MOUSEX", 1, &[]), ("RESULT", 3, &[8])],
        );
        let mut r = Reader::new(&buf, Codec::default());
        let y = Yscd::parse(&mut r).unwrap();
        assert_eq!(y.cmds[0].args[0].name, "EXP");
        assert_eq!(y.vars[1].name, "RESULT");
        assert_eq!(y.vars[1].dim, vec![8]);
        assert_eq!(y.b800.len(), 0x800);
    }
}
