//! YSCM: the engine-side command table (`ysc.ybn`).
//!
//! Used as the command vocabulary when no full compiler definition (YSCD)
//! is available; argument names come from here in either case.

use crate::error::{Error, Result};
use crate::reader::Reader;

use super::{check_pad, read_header};

/// Number of fixed error strings trailing the command table.
pub const ERROR_STRING_COUNT: usize = 37;

#[derive(Debug, Clone)]
pub struct MArg {
    pub name: String,
    /// 0:Any 1:Int 2:Flt 3:Str
    pub typ: u8,
    pub chk: u8,
}

impl MArg {
    fn parse(r: &mut Reader) -> Result<MArg> {
        let name = r.sz()?;
        let typ = r.byte()?;
        let chk = r.byte()?;
        if typ > 3 {
            return Err(Error::layout(format!("YSCM: argument {name} has type tag {typ}")));
        }
        Ok(MArg { name, typ, chk })
    }
}

#[derive(Debug, Clone)]
pub struct MCmd {
    pub name: String,
    pub args: Vec<MArg>,
}

impl MCmd {
    fn parse(r: &mut Reader) -> Result<MCmd> {
        let name = r.sz()?;
        let narg = r.byte()?;
        let args = (0..narg).map(|_| MArg::parse(r)).collect::<Result<_>>()?;
        Ok(MCmd { name, args })
    }
}

/// Opcodes of the commands the decompiler treats structurally.
///
/// YSTB encodes commands by their index in the vocabulary, so these are
/// found by name once per run. All five must exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownCmds {
    pub cmd_if: u16,
    pub cmd_else: u16,
    pub cmd_loop: u16,
    pub cmd_returncode: u16,
    pub cmd_word: u16,
}

impl KnownCmds {
    pub fn from_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<KnownCmds> {
        let (mut fi, mut fe, mut fl, mut fr, mut fw) = (None, None, None, None, None);
        for (i, name) in names.enumerate() {
            let slot = match name {
                "IF" => &mut fi,
                "ELSE" => &mut fe,
                "LOOP" => &mut fl,
                "RETURNCODE" => &mut fr,
                "WORD" => &mut fw,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(i as u16);
            }
        }
        let need = |slot: Option<u16>, what: &str| {
            slot.ok_or_else(|| Error::VocabularyMismatch(format!("command {what} missing from vocabulary")))
        };
        Ok(KnownCmds {
            cmd_if: need(fi, "IF")?,
            cmd_else: need(fe, "ELSE")?,
            cmd_loop: need(fl, "LOOP")?,
            cmd_returncode: need(fr, "RETURNCODE")?,
            cmd_word: need(fw, "WORD")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Yscm {
    pub ver: u32,
    pub cmds: Vec<MCmd>,
    pub errs: Vec<String>,
    /// Trailing payload with undocumented meaning; preserved opaquely.
    pub b256: Vec<u8>,
    pub known: KnownCmds,
}

impl Yscm {
    pub fn parse(r: &mut Reader) -> Result<Yscm> {
        let ver = read_header(r, "YSCM")?;
        let ncmd = r.u32()?;
        check_pad(r.u32()?, "YSCM")?;
        let cmds: Vec<MCmd> = (0..ncmd).map(|_| MCmd::parse(r)).collect::<Result<_>>()?;
        let errs = (0..ERROR_STRING_COUNT).map(|_| r.sz()).collect::<Result<_>>()?;
        let b256 = r.read(256)?.to_vec();
        let known = KnownCmds::from_names(cmds.iter().map(|c| c.name.as_str()))?;
        r.assert_eof(ver)?;
        Ok(Yscm { ver, cmds, errs, b256, known })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use yuris_nls::Codec;

    use super::*;

    /// Minimal vocabulary shared by the container and emitter tests.
    pub(crate) fn sample_yscm_bytes(ver: u32, extra: &[(&str, &[&str])]) -> Vec<u8> {
        let mut cmds: Vec<(String, Vec<String>)> = ["IF", "ELSE", "LOOP", "RETURNCODE", "WORD"]
            .iter()
            .map(|n| (n.to_string(), Vec::new()))
            .collect();
        for (name, args) in extra {
            cmds.push((name.to_string(), args.iter().map(|a| a.to_string()).collect()));
        }
        let mut buf = b"YSCM".to_vec();
        buf.extend_from_slice(&ver.to_le_bytes());
        buf.extend_from_slice(&(cmds.len() as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        for (name, args) in &cmds {
            buf.extend_from_slice(name.as_bytes());
            buf.push(0);
            buf.push(args.len() as u8);
            for a in args {
                buf.extend_from_slice(a.as_bytes());
                buf.push(0);
                buf.push(0); // typ
                buf.push(0); // chk
            }
        }
        for _ in 0..ERROR_STRING_COUNT {
            buf.push(0); // empty error strings
        }
        buf.extend_from_slice(&[0u8; 256]);
        buf
    }

    #[test]
    fn parses_sample_vocabulary() {
        let buf = sample_yscm_bytes(300, &[("END", &[]), ("GOSUB", &["ADR", "RET"])]);
        let mut r = Reader::new(&buf, Codec::default());
        let y = Yscm::parse(&mut r).unwrap();
        assert_eq!(y.ver, 300);
        assert_eq!(y.cmds.len(), 7);
        assert_eq!(y.known.cmd_if, 0);
        assert_eq!(y.known.cmd_word, 4);
        assert_eq!(y.cmds[6].args[1].name, "RET");
        assert_eq!(y.errs.len(), ERROR_STRING_COUNT);
    }

    #[test]
    fn missing_structural_command_is_fatal() {
        // no LOOP in the table
        let mut buf = b"YSCM".to_vec();
        buf.extend_from_slice(&300u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        for name in ["IF", "ELSE"] {
            buf.extend_from_slice(name.as_bytes());
            buf.push(0);
            buf.push(0);
        }
        for _ in 0..ERROR_STRING_COUNT {
            buf.push(0);
        }
        buf.extend_from_slice(&[0u8; 256]);
        let mut r = Reader::new(&buf, Codec::default());
        assert!(matches!(Yscm::parse(&mut r), Err(Error::VocabularyMismatch(_))));
    }
}
