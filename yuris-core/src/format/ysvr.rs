//! YSVR: the runtime variable table (`ysv.ybn`).
//!
//! Holds every global/script/function-scope variable plus one slot per
//! compiler-defined variable the build allocated. Locals never appear here;
//! they are introduced on-site by declaration commands in the bytecode.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::ins::Ins;
use crate::reader::Reader;
use crate::USER_VAR_MIN;

use super::read_header;

#[derive(Debug, Clone, PartialEq)]
pub enum InitValue {
    /// Compiler slot the build did not allocate (`typ == 0`).
    None,
    Int(i64),
    Float(f64),
    /// String/expression initializer as a postfix instruction list; empty
    /// when the declaration had no initializer at all.
    Expr(Vec<Ins>),
}

impl InitValue {
    pub fn is_empty_expr(&self) -> bool {
        matches!(self, InitValue::Expr(list) if list.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Var {
    /// 1:Global 2:Script 3:Function
    pub scope: u8,
    /// 0:System 1..3:UserGroup
    pub g_ext: u8,
    pub scr_idx: u16,
    pub var_idx: u16,
    /// 0:None 1:Int64 2:Float64 3:String
    pub typ: u8,
    pub dim: Vec<u32>,
    pub initv: InitValue,
}

impl Var {
    pub fn is_compiler_slot(&self) -> bool {
        self.var_idx < USER_VAR_MIN
    }

    fn parse(r: &mut Reader, ver: u32) -> Result<Var> {
        let (scope, g_ext, scr_idx, var_idx, typ, ndim) = if ver < 481 {
            let scope = r.byte()?;
            let scr_idx = r.u16()?;
            let var_idx = r.u16()?;
            let typ = r.byte()?;
            let ndim = r.byte()?;
            let g_ext = if var_idx < USER_VAR_MIN { 0 } else { 1 };
            (scope, g_ext, scr_idx, var_idx, typ, ndim)
        } else {
            let scope = r.byte()?;
            let g_ext = r.byte()?;
            let scr_idx = r.u16()?;
            let var_idx = r.u16()?;
            let typ = r.byte()?;
            let ndim = r.byte()?;
            (scope, g_ext, scr_idx, var_idx, typ, ndim)
        };
        match scope {
            1 if var_idx < USER_VAR_MIN => {
                if g_ext != 0 {
                    return Err(Error::layout(format!(
                        "YSVR: compiler variable #{var_idx} with group {g_ext}"
                    )));
                }
            }
            1 => {
                if !(1..=3).contains(&g_ext) {
                    return Err(Error::layout(format!(
                        "YSVR: global #{var_idx} with group {g_ext}"
                    )));
                }
            }
            2 | 3 => {
                if g_ext != 1 {
                    return Err(Error::layout(format!(
                        "YSVR: scoped variable #{var_idx} with group {g_ext}"
                    )));
                }
            }
            s => return Err(Error::layout(format!("YSVR: unknown scope {s} for #{var_idx}"))),
        }
        let dim = (0..ndim).map(|_| r.u32()).collect::<Result<_>>()?;
        let initv = match typ {
            0 => {
                if var_idx >= USER_VAR_MIN {
                    return Err(Error::layout(format!(
                        "YSVR: user variable #{var_idx} without a type"
                    )));
                }
                InitValue::None
            }
            1 => InitValue::Int(r.i64()?),
            2 => InitValue::Float(r.f64()?),
            3 => {
                let len = r.u16()? as usize;
                let codec = r.codec();
                InitValue::Expr(Ins::parse_buf(r.read(len)?, codec)?)
            }
            t => return Err(Error::layout(format!("YSVR: unknown initializer type {t}"))),
        };
        Ok(Var { scope, g_ext, scr_idx, var_idx, typ, dim, initv })
    }
}

#[derive(Debug, Clone)]
pub struct Ysvr {
    pub ver: u32,
    pub vars: Vec<Var>,
    index: HashMap<u16, usize>,
}

impl Ysvr {
    pub fn parse(r: &mut Reader) -> Result<Ysvr> {
        let ver = read_header(r, "YSVR")?;
        let nvar = r.u16()?;
        let vars: Vec<Var> = (0..nvar).map(|_| Var::parse(r, ver)).collect::<Result<_>>()?;
        r.assert_eof(ver)?;
        let index = vars.iter().enumerate().map(|(i, v)| (v.var_idx, i)).collect();
        Ok(Ysvr { ver, vars, index })
    }

    pub fn by_idx(&self, var_idx: u16) -> Option<&Var> {
        self.index.get(&var_idx).map(|&i| &self.vars[i])
    }
}
