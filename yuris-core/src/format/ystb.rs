//! YSTB: per-script bytecode (`yst%05d.ybn`).
//!
//! Every section of the file is obfuscated with the same 4-byte keyed XOR.
//! Builds before 300 store an inline command stream plus one expression
//! data blob; 300 and later split commands, argument records, expression
//! data and line numbers into four independently sized sections.

use yuris_nls::Codec;

use crate::error::{Error, Result};
use crate::ins::Ins;
use crate::reader::Reader;

use super::yscm::KnownCmds;
use super::{check_pad, read_header};

pub const ASSIGN_OPS: [&str; 9] = ["=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^="];

/// Keyed XOR shared by all YSTB sections (self-inverse).
///
/// Key bytes apply big-endian: byte `i` is XORed with `key[i mod 4]`.
pub fn xor_trans(buf: &mut [u8], key: u32) {
    let k = key.to_be_bytes();
    for (i, b) in buf.iter_mut().enumerate() {
        *b ^= k[i & 3];
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgData {
    /// Argument whose payload is not resolved from expression data
    /// (non-condition IF/ELSE/LOOP slots, RETURNCODE records).
    None,
    /// Raw text payload (WORD commands).
    Text(String),
    /// Postfix expression payload.
    Expr(Vec<Ins>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub id: u16,
    pub typ: u8,
    /// Assignment operator selector, 0..=8.
    pub aop: u8,
    pub len: u32,
    pub off: u32,
    pub data: ArgData,
}

impl Arg {
    pub fn aop_str(&self) -> &'static str {
        ASSIGN_OPS[self.aop as usize]
    }

    pub fn expr(&self) -> Result<&[Ins]> {
        match &self.data {
            ArgData::Expr(list) => Ok(list),
            _ => Err(Error::layout(format!(
                "argument id={} has no expression payload",
                self.id
            ))),
        }
    }

    fn parse_record(r: &mut Reader) -> Result<(u16, u8, u8, u32, u32)> {
        let id = r.u16()?;
        let typ = r.byte()?;
        let aop = r.byte()?;
        let len = r.u32()?;
        let off = r.u32()?;
        if aop > 8 {
            return Err(Error::layout(format!("argument id={id} with assign op {aop}")));
        }
        Ok((id, typ, aop, len, off))
    }

    fn slice(exp: &[u8], off: u32, len: u32) -> Result<&[u8]> {
        let beg = off as usize;
        let end = beg + len as usize;
        if end > exp.len() {
            return Err(Error::TruncatedRead {
                at: beg,
                want: len as usize,
                left: exp.len().saturating_sub(beg),
            });
        }
        Ok(&exp[beg..end])
    }

    /// Full 12-byte record; with `exp` the payload is decoded as postfix.
    fn parse_full(r: &mut Reader, exp: Option<&[u8]>) -> Result<Arg> {
        let (id, typ, aop, len, off) = Self::parse_record(r)?;
        let data = match exp {
            None => ArgData::None,
            Some(exp) => {
                let codec = r.codec();
                ArgData::Expr(Ins::parse_buf(Self::slice(exp, off, len)?, codec)?)
            }
        };
        Ok(Arg { id, typ, aop, len, off, data })
    }

    /// Full record whose payload is raw text (WORD).
    fn parse_word(r: &mut Reader, exp: &[u8]) -> Result<Arg> {
        let (id, typ, aop, len, off) = Self::parse_record(r)?;
        if id != 0 || typ != 0 || aop != 0 {
            return Err(Error::layout(format!(
                "WORD argument with id={id} typ={typ} aop={aop}"
            )));
        }
        let bytes = Self::slice(exp, off, len)?;
        let text = r
            .codec()
            .decode_strict(bytes)
            .map_err(|_| Error::Decode { at: off as usize })?
            .into_owned();
        Ok(Arg { id, typ, aop, len, off, data: ArgData::Text(text) })
    }

    /// Truncated RETURNCODE record: 4 bytes (v2xx) or 8 bytes (v290).
    fn parse_returncode(r: &mut Reader, with_len: bool) -> Result<Arg> {
        let id = r.u16()?;
        let typ = r.byte()?;
        let aop = r.byte()?;
        if typ != 0 || aop != 0 {
            return Err(Error::layout(format!(
                "RETURNCODE argument with typ={typ} aop={aop}"
            )));
        }
        let len = if with_len { r.u32()? } else { 0 };
        Ok(Arg { id, typ, aop, len, off: 0, data: ArgData::None })
    }
}

#[derive(Debug, Clone)]
pub struct Cmd {
    /// Byte offset of the command in its stream (`index * 4` for v300+).
    pub off: u32,
    pub lno: u32,
    pub code: u8,
    /// Parameter count for gosub/return on v300+; preserved only.
    pub npar: u16,
    pub args: Vec<Arg>,
}

fn parse_args(
    r: &mut Reader,
    code: u8,
    narg: u8,
    exp: &[u8],
    known: &KnownCmds,
) -> Result<Vec<Arg>> {
    let c = code as u16;
    if (c == known.cmd_if || c == known.cmd_else) && narg == 3 {
        return Ok(vec![
            Arg::parse_full(r, Some(exp))?,
            Arg::parse_full(r, None)?,
            Arg::parse_full(r, None)?,
        ]);
    }
    if c == known.cmd_loop {
        if narg != 2 {
            return Err(Error::layout(format!("LOOP with {narg} arguments")));
        }
        return Ok(vec![Arg::parse_full(r, Some(exp))?, Arg::parse_full(r, None)?]);
    }
    if c == known.cmd_else {
        if narg != 0 {
            return Err(Error::layout(format!("ELSE with {narg} arguments")));
        }
        return Ok(Vec::new());
    }
    if c == known.cmd_word {
        if narg != 1 {
            return Err(Error::layout(format!("WORD with {narg} arguments")));
        }
        return Ok(vec![Arg::parse_word(r, exp)?]);
    }
    (0..narg).map(|_| Arg::parse_full(r, Some(exp))).collect()
}

fn parse_cmd_v2xx(
    r: &mut Reader,
    exp: &[u8],
    known: &KnownCmds,
    v290: bool,
) -> Result<Cmd> {
    let off = r.pos() as u32;
    let code = r.byte()?;
    let narg = r.byte()?;
    let lno = r.u32()?;
    let args = if code as u16 == known.cmd_returncode {
        if narg != 1 {
            return Err(Error::layout(format!("RETURNCODE with {narg} arguments")));
        }
        vec![Arg::parse_returncode(r, v290)?]
    } else {
        parse_args(r, code, narg, exp, known)?
    };
    Ok(Cmd { off, lno, code, npar: 0, args })
}

#[derive(Debug, Clone)]
pub struct Ystb {
    pub ver: u32,
    pub key: u32,
    pub cmds: Vec<Cmd>,
}

impl Ystb {
    pub fn parse(buf: &[u8], known: &KnownCmds, key: u32, codec: Codec) -> Result<Ystb> {
        let mut r = Reader::new(buf, codec);
        let ver = read_header(&mut r, "YSTB")?;
        let cmds = if ver < 300 {
            let lcmd = r.u32()? as usize;
            let lexp = r.u32()? as usize;
            let exp_off = r.u32()? as usize;
            for _ in 0..3 {
                check_pad(r.u32()?, "YSTB")?;
            }
            if 32 + lcmd != exp_off {
                return Err(Error::layout(format!(
                    "YSTB: expression data at {exp_off}, command stream ends at {}",
                    32 + lcmd
                )));
            }
            let mut dcmd = r.read(lcmd)?.to_vec();
            let mut dexp = r.read(lexp)?.to_vec();
            r.assert_eof(ver)?;
            xor_trans(&mut dcmd, key);
            xor_trans(&mut dexp, key);
            let mut rc = Reader::new(&dcmd, codec);
            let mut cmds = Vec::new();
            while rc.pos() < lcmd {
                cmds.push(parse_cmd_v2xx(&mut rc, &dexp, known, ver == 290)?);
            }
            cmds
        } else {
            let ncmd = r.u32()? as usize;
            let lcmd = r.u32()? as usize;
            let larg = r.u32()? as usize;
            let lexp = r.u32()? as usize;
            let llno = r.u32()? as usize;
            check_pad(r.u32()?, "YSTB")?;
            if ncmd * 4 != lcmd || lcmd != llno {
                return Err(Error::layout(format!(
                    "YSTB: section sizes disagree: ncmd={ncmd} lcmd={lcmd} llno={llno}"
                )));
            }
            if larg % 12 != 0 {
                return Err(Error::layout(format!(
                    "YSTB: argument stream size {larg} not a multiple of 12"
                )));
            }
            let mut dcmd = r.read(lcmd)?.to_vec();
            let mut darg = r.read(larg)?.to_vec();
            let mut dexp = r.read(lexp)?.to_vec();
            let mut dlno = r.read(llno)?.to_vec();
            r.assert_eof(ver)?;
            xor_trans(&mut dcmd, key);
            xor_trans(&mut darg, key);
            xor_trans(&mut dexp, key);
            xor_trans(&mut dlno, key);
            let mut rc = Reader::new(&dcmd, codec);
            let mut ra = Reader::new(&darg, codec);
            let mut rl = Reader::new(&dlno, codec);
            let mut cmds = Vec::with_capacity(ncmd);
            for _ in 0..ncmd {
                let off = rc.pos() as u32;
                let lno = rl.u32()?;
                let code = rc.byte()?;
                let narg = rc.byte()?;
                let npar = rc.u16()?;
                let args = if code as u16 == known.cmd_returncode {
                    if narg != 1 {
                        return Err(Error::layout(format!("RETURNCODE with {narg} arguments")));
                    }
                    vec![Arg::parse_full(&mut ra, None)?]
                } else {
                    parse_args(&mut ra, code, narg, &dexp, known)?
                };
                cmds.push(Cmd { off, lno, code, npar, args });
            }
            rc.assert_eof(ver)?;
            ra.assert_eof(ver)?;
            rl.assert_eof(ver)?;
            cmds
        };
        Ok(Ystb { ver, key, cmds })
    }
}
