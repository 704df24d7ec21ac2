//! The cross-file symbol environment.
//!
//! Reconciles three variable namespaces into one dense name table indexed
//! by `var_idx`: compiler definitions (YSCD), global/scoped records (YSVR)
//! and on-site local declarations met while emitting bytecode. Also owns
//! the command vocabulary, the version-selected type-qualifier table, the
//! label index and the synthesized global-declarations text.

use std::collections::{BTreeMap, HashMap, HashSet};

use itertools::Itertools;
use log::debug;

use crate::error::{Error, Result};
use crate::expr::{self, Expr};
use crate::format::{Yscd, Yscm, Yslb, Ysvr};
use crate::format::ysvr::InitValue;
use crate::ins::{Ins, Opcode};
use crate::USER_VAR_MIN;

pub(crate) const SCOPE_CHAR: [&str; 4] = ["", "g", "s", "f"];
pub(crate) const G_EXT_CHAR: [&str; 4] = ["", "", "2", "3"];
pub(crate) const TYP_DEF_CMD: [&str; 4] = ["", "INT", "FLT", "STR"];
pub(crate) const TYP_NAME: [&str; 4] = ["", "Int", "Flt", "Str"];
/// Sigil of a variable's declared type: numeric types use `@`, strings `$`.
pub(crate) const TYP_CHAR: [&str; 4] = ["", "@", "@", "$"];

/// Source sigil for a type-qualifier byte.
///
/// 0x23 changed meaning across the 300 boundary: the legacy
/// string-of-numeric form `$@` became address-of-string `&$`, and `&@`
/// appeared.
fn qualifier_sigil(v2xx: bool, tyq: u8) -> Option<&'static str> {
    match tyq {
        0x24 => Some("$"),
        0x40 => Some("@"),
        0x23 => Some(if v2xx { "$@" } else { "&$" }),
        0x60 if !v2xx => Some("&@"),
        _ => None,
    }
}

/// Local declarations only ever use the two plain sigils.
fn plain_sigil(tyq: u8) -> Option<&'static str> {
    match tyq {
        0x24 => Some("$"),
        0x40 => Some("@"),
        _ => None,
    }
}

pub struct YEnv {
    ver: u32,
    v2xx: bool,
    to_new_tostr: bool,
    /// Dense name table indexed by `var_idx`; `None` slots are
    /// unallocated compiler variables and not-yet-declared locals.
    vars: Vec<Option<String>>,
    cmds: Vec<(String, Vec<String>)>,
    labels: HashMap<u16, BTreeMap<u32, Vec<String>>>,
    globals_text: Option<String>,
    /// Variables whose YSVR initializer is an empty expression list; their
    /// re-declarations must not grow an `=` tail.
    empty_init: HashSet<u16>,
}

impl YEnv {
    pub fn new(
        yscd: Option<&Yscd>,
        ysvr: &Ysvr,
        yslb: &Yslb,
        yscm: &Yscm,
        to_new_tostr: bool,
    ) -> Result<YEnv> {
        let ver = ysvr.ver;
        if ver != yslb.ver {
            return Err(Error::layout(format!(
                "version mismatch: ysvr={ver}, yslb={}",
                yslb.ver
            )));
        }

        let mut size = ysvr
            .vars
            .iter()
            .map(|v| v.var_idx as usize + 1)
            .max()
            .unwrap_or(0);
        if let Some(yscd) = yscd {
            size = size.max(yscd.vars.len());
        }
        let mut vars: Vec<Option<String>> = vec![None; size];

        let cmds: Vec<(String, Vec<String>)> = yscm
            .cmds
            .iter()
            .map(|c| (c.name.clone(), c.args.iter().map(|a| a.name.clone()).collect()))
            .collect();

        if let Some(yscd) = yscd {
            for (i, v) in yscd.vars.iter().enumerate() {
                vars[i] = Some(format!("{}{}", TYP_CHAR[v.typ as usize], v.name));
            }
            for v in ysvr.vars.iter().filter(|v| v.is_compiler_slot()) {
                let i = v.var_idx as usize;
                let in_ysvr = v.typ != 0;
                let in_yscd = i < yscd.vars.len();
                if in_ysvr != in_yscd {
                    return Err(Error::VocabularyMismatch(format!(
                        "#{i}: in_ysvr={in_ysvr}, in_yscd={in_yscd}"
                    )));
                }
                if in_ysvr {
                    let dvar = &yscd.vars[i];
                    if v.typ != dvar.typ {
                        return Err(Error::VocabularyMismatch(format!(
                            "#{i}: ysvr.typ={} yscd({}).typ={}",
                            v.typ, dvar.name, dvar.typ
                        )));
                    }
                    if v.dim != dvar.dim {
                        return Err(Error::VocabularyMismatch(format!(
                            "#{i}: ysvr.dim={:?} yscd({}).dim={:?}",
                            v.dim, dvar.name, dvar.dim
                        )));
                    }
                }
            }
        } else {
            if ver != yscm.ver {
                return Err(Error::layout(format!(
                    "version mismatch: ysvr={ver}, yscm={}",
                    yscm.ver
                )));
            }
            // No compiler definition: synthesize placeholder names for the
            // slots the build allocated.
            for v in ysvr.vars.iter().filter(|v| v.is_compiler_slot() && v.typ != 0) {
                let i = v.var_idx as usize;
                vars[i] = Some(format!("{}_com{}", TYP_CHAR[v.typ as usize], i));
            }
        }

        let v2xx = ver < 300;
        let lbl_index_to_off = ver >= 300;
        // 290 is half-new: it already keeps globals in a standalone file.
        let emit_globals = ver == 290 || ver >= 300;

        for v in ysvr.vars.iter().filter(|v| !v.is_compiler_slot()) {
            let i = v.var_idx;
            vars[i as usize] = Some(format!(
                "{}{}{}{}{}",
                TYP_CHAR[v.typ as usize],
                SCOPE_CHAR[v.scope as usize],
                G_EXT_CHAR[v.g_ext as usize],
                TYP_NAME[v.typ as usize],
                i
            ));
        }

        let empty_init = ysvr
            .vars
            .iter()
            .filter(|v| v.initv.is_empty_expr())
            .map(|v| v.var_idx)
            .collect();

        let mut labels: HashMap<u16, BTreeMap<u32, Vec<String>>> = HashMap::new();
        for l in &yslb.lbls {
            // v300+ command records are 4 bytes wide, so a command index
            // converts to a stream offset by multiplying.
            let ip = if lbl_index_to_off { l.ip * 4 } else { l.ip };
            labels
                .entry(l.scr_idx)
                .or_default()
                .entry(ip)
                .or_default()
                .push(l.name.clone());
        }

        let mut env = YEnv {
            ver,
            v2xx,
            to_new_tostr,
            vars,
            cmds,
            labels,
            globals_text: None,
            empty_init,
        };
        if emit_globals {
            env.globals_text = Some(env.render_globals(ysvr)?);
        }
        Ok(env)
    }

    pub fn ver(&self) -> u32 {
        self.ver
    }

    pub fn command(&self, code: u8) -> Result<(&str, &[String])> {
        self.cmds
            .get(code as usize)
            .map(|(n, a)| (n.as_str(), a.as_slice()))
            .ok_or_else(|| Error::layout(format!("command opcode {code} outside vocabulary")))
    }

    /// Resolve a `var`/`arr`/`idxbeg` operand to its source spelling.
    ///
    /// The reference's qualifier must agree with the declared type sigil;
    /// pointer and legacy qualifiers re-prefix the name accordingly.
    pub fn var_name(&self, x: i64) -> Result<String> {
        let idx = (x >> 8) as usize;
        let tyq = (x & 0xff) as u8;
        let sigil = qualifier_sigil(self.v2xx, tyq).ok_or_else(|| {
            Error::layout(format!("unknown type qualifier {tyq:#04x} in reference {x:#x}"))
        })?;
        let name = self
            .vars
            .get(idx)
            .and_then(|n| n.as_deref())
            .ok_or_else(|| Error::layout(format!("reference to undefined variable #{idx}")))?;
        let declared = name.chars().next().unwrap_or('?');
        if sigil.chars().next_back() != Some(declared) {
            return Err(Error::TypeMismatch {
                name: name.to_string(),
                want: sigil.to_string(),
                have: declared.to_string(),
            });
        }
        Ok(if sigil.starts_with(declared) {
            name.to_string()
        } else {
            format!("{}{}", sigil, &name[1..])
        })
    }

    /// Introduce a local variable met in a declaration command.
    ///
    /// Each slot may be written at most once over the whole run.
    pub fn def_local(&mut self, x: i64, typ: u8) -> Result<String> {
        let idx = (x >> 8) as usize;
        let tyq = (x & 0xff) as u8;
        let tyqch = plain_sigil(tyq).ok_or_else(|| {
            Error::layout(format!("local declaration with qualifier {tyq:#04x}"))
        })?;
        let typch = TYP_CHAR[typ as usize];
        if self.vars.len() <= idx {
            self.vars.resize(idx + 1, None);
        }
        if let Some(name) = &self.vars[idx] {
            return Err(Error::RedefinedLocal { idx: idx as u32, name: name.clone() });
        }
        if tyqch != typch {
            return Err(Error::TypeMismatch {
                name: format!("#{idx}"),
                want: tyqch.to_string(),
                have: typch.to_string(),
            });
        }
        let name = format!("{}v{}{}", tyqch, TYP_NAME[typ as usize], idx);
        debug!("local #{idx} declared as {name}");
        self.vars[idx] = Some(name.clone());
        Ok(name)
    }

    /// Lift a postfix list and render it as argument text.
    pub fn dat_to_argstr(&self, list: &[Ins]) -> Result<String> {
        let tree = expr::lift(list, |x| self.var_name(x), self.to_new_tostr)?;
        let text = expr::tree_to_string(&tree)?;
        Ok(match tree {
            Expr::Binary { op: Opcode::BitAnd, .. } => format!("({text})"),
            _ => text,
        })
    }

    /// Per-script label map (`stream offset -> names`), to be drained by
    /// the emitter.
    pub fn script_labels(&self, scr_idx: u16) -> BTreeMap<u32, Vec<String>> {
        self.labels.get(&scr_idx).cloned().unwrap_or_default()
    }

    pub(crate) fn has_empty_initializer(&self, var_idx: u16) -> bool {
        self.empty_init.contains(&var_idx)
    }

    pub fn globals_text(&self) -> Option<&str> {
        self.globals_text.as_deref()
    }

    pub fn take_globals(&mut self) -> Option<String> {
        self.globals_text.take()
    }

    /// Declaration lines for every user-declared global, in YSVR order.
    fn render_globals(&self, ysvr: &Ysvr) -> Result<String> {
        let mut lines = Vec::new();
        for v in &ysvr.vars {
            if v.is_compiler_slot() || v.scope != 1 {
                continue;
            }
            let cmd = format!("G_{}{}", TYP_DEF_CMD[v.typ as usize], G_EXT_CHAR[v.g_ext as usize]);
            let name = self.vars[v.var_idx as usize]
                .as_deref()
                .ok_or_else(|| Error::layout(format!("global #{} has no name", v.var_idx)))?;
            let dims = if v.dim.is_empty() {
                String::new()
            } else {
                format!("({})", v.dim.iter().join(","))
            };
            let val = match &v.initv {
                InitValue::Int(0) => String::new(),
                InitValue::Int(n) => format!("={n}"),
                InitValue::Float(x) if *x == 0.0 => String::new(),
                InitValue::Float(x) => format!("={x:?}"),
                InitValue::Expr(list) if list.is_empty() => String::new(),
                InitValue::Expr(list) => format!("={}", self.dat_to_argstr(list)?),
                InitValue::None => {
                    return Err(Error::layout(format!(
                        "global #{} without an initializer record",
                        v.var_idx
                    )))
                }
            };
            lines.push(format!("{cmd}[{name}{dims}{val}]"));
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use yuris_nls::Codec;

    use crate::format::ysvr::tests::{expr_init, int_init, sample_ysvr_bytes, VarSpec};
    use crate::format::yslb::tests::sample_yslb_bytes;
    use crate::format::yscm::tests::sample_yscm_bytes;
    use crate::reader::Reader;

    use super::*;

    fn parse_yscm(ver: u32) -> Yscm {
        let buf = sample_yscm_bytes(ver, &[("END", &[])]);
        Yscm::parse(&mut Reader::new(&buf, Codec::default())).unwrap()
    }

    fn parse_ysvr(ver: u32, vars: &[VarSpec]) -> Ysvr {
        let buf = sample_ysvr_bytes(ver, vars);
        Ysvr::parse(&mut Reader::new(&buf, Codec::default())).unwrap()
    }

    fn parse_yslb(ver: u32, lbls: &[(&str, u32, u16)]) -> Yslb {
        let buf = sample_yslb_bytes(ver, lbls);
        Yslb::parse(&mut Reader::new(&buf, Codec::default())).unwrap()
    }

    fn gvar(var_idx: u16, typ: u8, init: Vec<u8>) -> VarSpec {
        VarSpec { scope: 1, g_ext: 1, scr_idx: 0, var_idx, typ, dim: vec![], init }
    }

    #[test]
    fn user_variable_names_encode_scope_group_and_type() {
        let ysvr = parse_ysvr(
            481,
            &[
                VarSpec { scope: 1, g_ext: 2, scr_idx: 0, var_idx: 1000, typ: 1, dim: vec![], init: int_init(0) },
                VarSpec { scope: 2, g_ext: 1, scr_idx: 1, var_idx: 1001, typ: 3, dim: vec![], init: expr_init(&[]) },
                VarSpec { scope: 3, g_ext: 1, scr_idx: 1, var_idx: 1002, typ: 2, dim: vec![], init: 0f64.to_le_bytes().to_vec() },
            ],
        );
        let env = YEnv::new(None, &ysvr, &parse_yslb(481, &[]), &parse_yscm(481), false).unwrap();
        assert_eq!(env.var_name((1000 << 8) | 0x40).unwrap(), "@g2Int1000");
        assert_eq!(env.var_name((1001 << 8) | 0x24).unwrap(), "$sStr1001");
        assert_eq!(env.var_name((1002 << 8) | 0x40).unwrap(), "@fFlt1002");
    }

    #[test]
    fn pointer_qualifiers_reprefix_the_name() {
        let ysvr = parse_ysvr(480, &[gvar(1000, 1, int_init(0)), gvar(1001, 3, expr_init(&[]))]);
        let env = YEnv::new(None, &ysvr, &parse_yslb(480, &[]), &parse_yscm(480), false).unwrap();
        assert_eq!(env.var_name((1000 << 8) | 0x60).unwrap(), "&@gInt1000");
        assert_eq!(env.var_name((1001 << 8) | 0x23).unwrap(), "&$gStr1001");
    }

    #[test]
    fn legacy_tostr_qualifier_on_v2xx() {
        let ysvr = parse_ysvr(265, &[gvar(1000, 1, int_init(0))]);
        let env = YEnv::new(None, &ysvr, &parse_yslb(265, &[]), &parse_yscm(265), false).unwrap();
        assert_eq!(env.var_name((1000 << 8) | 0x23).unwrap(), "$@gInt1000");
        // 0x60 does not exist before 300
        assert!(env.var_name((1000 << 8) | 0x60).is_err());
    }

    #[test]
    fn qualifier_must_match_declared_type() {
        let ysvr = parse_ysvr(480, &[gvar(1000, 1, int_init(0))]);
        let env = YEnv::new(None, &ysvr, &parse_yslb(480, &[]), &parse_yscm(480), false).unwrap();
        assert!(matches!(
            env.var_name((1000 << 8) | 0x24),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn locals_define_once() {
        let ysvr = parse_ysvr(480, &[gvar(1000, 1, int_init(0))]);
        let mut env = YEnv::new(None, &ysvr, &parse_yslb(480, &[]), &parse_yscm(480), false).unwrap();
        let x = (5000i64 << 8) | 0x40;
        assert_eq!(env.def_local(x, 1).unwrap(), "@vInt5000");
        assert_eq!(env.var_name(x).unwrap(), "@vInt5000");
        assert!(matches!(env.def_local(x, 1), Err(Error::RedefinedLocal { idx: 5000, .. })));
        // declared sigil must match the command's type
        assert!(matches!(
            env.def_local((5001i64 << 8) | 0x24, 1),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn globals_file_only_from_290_on() {
        for (ver, expect) in [(289u32, false), (290, true), (300, true), (480, true)] {
            let ysvr = parse_ysvr(ver, &[gvar(1000, 1, int_init(5))]);
            let env =
                YEnv::new(None, &ysvr, &parse_yslb(ver, &[]), &parse_yscm(ver), false).unwrap();
            assert_eq!(env.globals_text().is_some(), expect, "ver={ver}");
        }
    }

    #[test]
    fn globals_text_suppresses_zero_initializers() {
        let ysvr = parse_ysvr(
            481,
            &[
                gvar(1000, 1, int_init(0)),
                gvar(1001, 1, int_init(5)),
                VarSpec { scope: 1, g_ext: 3, scr_idx: 0, var_idx: 1002, typ: 1, dim: vec![2, 3], init: int_init(0) },
                gvar(1003, 3, expr_init(&[])),
            ],
        );
        let env = YEnv::new(None, &ysvr, &parse_yslb(481, &[]), &parse_yscm(481), false).unwrap();
        assert_eq!(
            env.globals_text().unwrap(),
            "G_INT[@gInt1000]\nG_INT[@gInt1001=5]\nG_INT3[@g3Int1002(2,3)]\nG_STR[$gStr1003]"
        );
    }

    #[test]
    fn labels_convert_index_to_offset_from_300() {
        let ysvr = parse_ysvr(480, &[gvar(1000, 1, int_init(0))]);
        let yslb = parse_yslb(480, &[("A", 3, 0), ("B", 3, 0), ("C", 1, 2)]);
        let env = YEnv::new(None, &ysvr, &yslb, &parse_yscm(480), false).unwrap();
        let l0 = env.script_labels(0);
        assert_eq!(l0.get(&12).map(Vec::len), Some(2));
        let l2 = env.script_labels(2);
        assert_eq!(l2.get(&4).unwrap(), &vec!["C".to_string()]);
    }

    #[test]
    fn compiler_slots_require_agreement() {
        use crate::format::yscd::tests::sample_yscd_bytes;
        let yscd_buf = sample_yscd_bytes(480, &[], &[("MOUSEX", 1, &[])]);
        let yscd = Yscd::parse(&mut Reader::new(&yscd_buf, Codec::default())).unwrap();

        // matching slot: ok, and the YSCD name wins
        let ysvr = parse_ysvr(
            480,
            &[
                VarSpec { scope: 1, g_ext: 0, scr_idx: 0, var_idx: 0, typ: 1, dim: vec![], init: int_init(0) },
                gvar(1000, 1, int_init(0)),
            ],
        );
        let env =
            YEnv::new(Some(&yscd), &ysvr, &parse_yslb(480, &[]), &parse_yscm(480), false).unwrap();
        assert_eq!(env.var_name(0x40).unwrap(), "@MOUSEX");

        // type disagreement is fatal
        let ysvr_bad = parse_ysvr(
            480,
            &[VarSpec { scope: 1, g_ext: 0, scr_idx: 0, var_idx: 0, typ: 3, dim: vec![], init: expr_init(&[]) }],
        );
        assert!(matches!(
            YEnv::new(Some(&yscd), &ysvr_bad, &parse_yslb(480, &[]), &parse_yscm(480), false),
            Err(Error::VocabularyMismatch(_))
        ));
    }

    #[test]
    fn placeholder_names_without_yscd() {
        let ysvr = parse_ysvr(
            480,
            &[VarSpec { scope: 1, g_ext: 0, scr_idx: 0, var_idx: 3, typ: 3, dim: vec![], init: expr_init(&[]) }],
        );
        let env = YEnv::new(None, &ysvr, &parse_yslb(480, &[]), &parse_yscm(480), false).unwrap();
        assert_eq!(env.var_name((3 << 8) | 0x24).unwrap(), "$_com3");
    }
}
