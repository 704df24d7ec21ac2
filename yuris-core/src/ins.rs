//! Postfix expression instructions as stored in YSTB expression data and
//! YSVR string initializers.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use yuris_nls::Codec;

use crate::error::{Error, Result};
use crate::reader::Reader;

/// One expression opcode.
///
/// The engine evaluates these on a value stack; `Var`/`Arr`/`IdxBeg` carry a
/// packed `(type_qualifier: u8, var_idx: u24)` operand, the literal opcodes
/// carry their value, and the operators carry nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    Var,
    Arr,
    IdxBeg,
    IdxEnd,
    I8,
    I16,
    I32,
    I64,
    F64,
    Str,
    ToStr,
    ToNum,
    Neg,
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogAnd,
    LogOr,
}

/// (code, opcode, declared operand width, mnemonic); width -1 = variable.
const OPCODES: &[(u8, Opcode, i8, &str)] = &[
    (0x2C, Opcode::Nop, 0, "nop"),
    (0x48, Opcode::Var, 3, "var"),
    (0x76, Opcode::Arr, 3, "arr"),
    (0x56, Opcode::IdxBeg, 3, "idxbeg"),
    (0x29, Opcode::IdxEnd, 1, "idxend"),
    (0x42, Opcode::I8, 1, "i8"),
    (0x57, Opcode::I16, 2, "i16"),
    (0x49, Opcode::I32, 4, "i32"),
    (0x4C, Opcode::I64, 8, "i64"),
    (0x46, Opcode::F64, 8, "f64"),
    (0x4D, Opcode::Str, -1, "str"),
    (0x73, Opcode::ToStr, 0, "$"),
    (0x69, Opcode::ToNum, 0, "@"),
    (0x52, Opcode::Neg, 0, "neg"),
    (0x2A, Opcode::Mul, 0, "*"),
    (0x2F, Opcode::Div, 0, "/"),
    (0x25, Opcode::Mod, 0, "%"),
    (0x2B, Opcode::Add, 0, "+"),
    (0x2D, Opcode::Sub, 0, "-"),
    (0x3C, Opcode::Lt, 0, "<"),
    (0x53, Opcode::Le, 0, "<="),
    (0x3E, Opcode::Gt, 0, ">"),
    (0x5A, Opcode::Ge, 0, ">="),
    (0x3D, Opcode::Eq, 0, "=="),
    (0x21, Opcode::Ne, 0, "!="),
    (0x41, Opcode::BitAnd, 0, "&"),
    (0x5E, Opcode::BitXor, 0, "^"),
    (0x4F, Opcode::BitOr, 0, "|"),
    (0x26, Opcode::LogAnd, 0, "&&"),
    (0x7C, Opcode::LogOr, 0, "||"),
];

impl Opcode {
    pub fn from_code(code: u8) -> Option<Opcode> {
        OPCODES.iter().find(|e| e.0 == code).map(|e| e.1)
    }

    fn entry(self) -> &'static (u8, Opcode, i8, &'static str) {
        OPCODES.iter().find(|e| e.1 == self).unwrap()
    }

    pub fn code(self) -> u8 {
        self.entry().0
    }

    /// Declared operand width in bytes; `None` for `Str` (length-carrying).
    pub fn operand_width(self) -> Option<usize> {
        let w = self.entry().2;
        (w >= 0).then_some(w as usize)
    }

    pub fn mnemonic(self) -> &'static str {
        self.entry().3
    }

    pub fn is_binary(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Mul | Div | Mod | Add | Sub | Lt | Le | Gt | Ge | Eq | Ne | BitAnd | BitXor | BitOr
                | LogAnd | LogOr
        )
    }

    pub fn takes_variable(self) -> bool {
        matches!(self, Opcode::Var | Opcode::Arr | Opcode::IdxBeg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsArg {
    None,
    Int(i64),
    Float(f64),
    Str(String),
}

/// One decoded instruction: opcode, declared size field, operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Ins {
    pub op: Opcode,
    pub size: u16,
    pub arg: InsArg,
}

impl Ins {
    pub fn parse(r: &mut Reader) -> Result<Ins> {
        let at = r.pos();
        let code = r.byte()?;
        let size = r.u16()?;
        let op = Opcode::from_code(code).ok_or(Error::UnknownOpcode { code, at })?;
        if let Some(w) = op.operand_width() {
            if w != size as usize {
                return Err(Error::layout(format!(
                    "opcode {} declared size {} (expected {}) at offset {}",
                    op.mnemonic(),
                    size,
                    w,
                    at
                )));
            }
        }
        let arg = match op {
            Opcode::F64 => InsArg::Float(r.f64()?),
            Opcode::Str => InsArg::Str(r.str(size as usize)?),
            _ if size > 0 => InsArg::Int(r.sint(size as usize)?),
            _ => InsArg::None,
        };
        Ok(Ins { op, size, arg })
    }

    pub fn parse_buf(buf: &[u8], codec: Codec) -> Result<Vec<Ins>> {
        let mut r = Reader::new(buf, codec);
        let mut out = Vec::new();
        while r.pos() < r.len() {
            out.push(Ins::parse(&mut r)?);
        }
        Ok(out)
    }

    /// Re-encode. String instructions are not re-encodable (their bytes
    /// depend on the target character set).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let code = self.op.code();
        let mut out = vec![code, self.size as u8, (self.size >> 8) as u8];
        match &self.arg {
            InsArg::None => {}
            InsArg::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            InsArg::Int(v) => {
                let w = self.size as usize;
                let mut buf = [0u8; 8];
                LittleEndian::write_int(&mut buf[..w], *v, w);
                out.extend_from_slice(&buf[..w]);
            }
            InsArg::Str(_) => {
                return Err(Error::layout("string instructions do not re-encode"));
            }
        }
        Ok(out)
    }

    /// `(type_qualifier, var_idx)` for `var`/`arr`/`idxbeg`.
    pub fn var_parts(&self) -> Option<(u8, u32)> {
        if !self.op.takes_variable() {
            return None;
        }
        match self.arg {
            InsArg::Int(v) => Some(((v & 0xff) as u8, (v >> 8) as u32)),
            _ => None,
        }
    }
}

/// True iff `list` is exactly one integer instruction `op` with value `value`.
///
/// The emitter keys two source-level decisions on this: the `LOOP[]`
/// loop-forever form (a lone `i8 -1` condition) and initializer suppression
/// (a lone `i64 0` right-hand side).
pub fn is_lone_int(list: &[Ins], op: Opcode, value: i64) -> bool {
    matches!(list, [ins] if ins.op == op && ins.arg == InsArg::Int(value))
}

impl fmt::Display for Ins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.op.mnemonic();
        match &self.arg {
            InsArg::None => write!(f, "{}", m),
            InsArg::Str(s) => {
                // drop the stored quote characters around the payload
                let mut chars = s.chars();
                let inner = match (chars.next(), chars.next_back()) {
                    (Some(_), Some(_)) => chars.as_str(),
                    _ => s.as_str(),
                };
                write!(f, "({}:{})", m, inner)
            }
            InsArg::Int(v) if self.op.takes_variable() => {
                write!(f, "({}:{:0>2x}:{})", m, v & 0xff, v >> 8)
            }
            InsArg::Int(v) if *v < 0 => write!(f, "({}:-{:#x}={})", m, v.unsigned_abs(), v),
            InsArg::Int(v) => write!(f, "({}:{:#x}={})", m, v, v),
            InsArg::Float(v) => write!(f, "({}:{:?}f)", m, v),
        }
    }
}

/// List form used by the dump listings: `[(i8:-0x1=-1), +]`.
pub fn fmt_ins_list(list: &[Ins]) -> String {
    let items: Vec<String> = list.iter().map(|i| i.to_string()).collect();
    format!("[{}]", items.join(", "))
}
