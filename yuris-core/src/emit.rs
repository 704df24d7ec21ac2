//! Per-script source emission.
//!
//! Commands are laid out on a line buffer indexed by their source line
//! number, labels are hoisted onto the emptiest nearby line, and each line's
//! tokens join with `;`. The output carries `\n` separators and no trailing
//! newline; writing with the engine's `\r\n` convention is the caller's job.

use crate::env::YEnv;
use crate::error::{Error, Result};
use crate::format::ystb::{ArgData, Ystb};
use crate::ins::{is_lone_int, Ins, InsArg, Opcode};

/// Declared value type of a definition command, by name.
fn def_cmd_typ(name: &str) -> Option<u8> {
    match name {
        "INT" | "G_INT" | "G_INT2" | "G_INT3" | "S_INT" | "F_INT" => Some(1),
        "FLT" | "G_FLT" | "G_FLT2" | "G_FLT3" | "S_FLT" | "F_FLT" => Some(2),
        "STR" | "G_STR" | "G_STR2" | "G_STR3" | "S_STR" | "F_STR" => Some(3),
        _ => None,
    }
}

/// Only the plain scopeless forms introduce a new (local) variable; the
/// scoped forms re-declare variables already present in YSVR.
fn local_def_typ(name: &str) -> Option<u8> {
    match name {
        "INT" => Some(1),
        "FLT" => Some(2),
        "STR" => Some(3),
        _ => None,
    }
}

fn lhs_var_operand(list: &[Ins]) -> Result<i64> {
    let ins = list
        .first()
        .ok_or_else(|| Error::layout("definition with an empty left-hand side"))?;
    if !matches!(ins.op, Opcode::Var | Opcode::IdxBeg) {
        return Err(Error::layout(format!(
            "definition left-hand side starts with {}",
            ins.op.mnemonic()
        )));
    }
    match ins.arg {
        InsArg::Int(v) => Ok(v),
        _ => Err(Error::layout("definition left-hand side without a variable operand")),
    }
}

fn check_narg(name: &str, args: usize, want: usize) -> Result<()> {
    if args != want {
        return Err(Error::layout(format!("{name} with {args} arguments (expected {want})")));
    }
    Ok(())
}

/// Emit one script's source text.
pub fn emit_script(env: &mut YEnv, scr_idx: u16, ystb: &Ystb) -> Result<String> {
    let mut lbls = env.script_labels(scr_idx);
    let nline = ystb.cmds.iter().map(|c| c.lno).max().unwrap_or(0) as usize;
    let mut lines: Vec<Vec<String>> = vec![Vec::new(); nline];
    let mut preps: Vec<String> = Vec::new();
    let mut prev_lno = 1u32;

    for (i, cmd) in ystb.cmds.iter().enumerate() {
        if cmd.lno < prev_lno {
            return Err(Error::LineOrder { prev: prev_lno, lno: cmd.lno, cmd: i });
        }
        prev_lno = cmd.lno;
        let lidx = cmd.lno as usize - 1;

        if !preps.is_empty() {
            lines[lidx].append(&mut preps);
        }

        if let Some(names) = lbls.remove(&cmd.off) {
            // Prefer the current line; fall back to an empty previous line
            // so labels between statements do not orphan a line of their own.
            let to_prev = lines[lidx].is_empty() && lidx > 0 && lines[lidx - 1].is_empty();
            let target = if to_prev { &mut lines[lidx - 1] } else { &mut lines[lidx] };
            target.extend(names.iter().map(|n| format!("#{n}")));
        }

        let name = env.command(cmd.code)?.0.to_string();
        let args = &cmd.args;
        let narg = args.len();

        match name.as_str() {
            "IFBLEND" => check_narg(&name, narg, 0)?,
            "IF" | "ELSE" if narg == 3 => {
                let cond = env.dat_to_argstr(args[0].expr()?)?;
                lines[lidx].push(format!("{name}[{cond}]"));
            }
            "LOOP" if narg == 2 => {
                let dat = args[0].expr()?;
                if is_lone_int(dat, Opcode::I8, -1) {
                    lines[lidx].push("LOOP[]".to_string());
                } else {
                    lines[lidx].push(format!("LOOP[SET={}]", env.dat_to_argstr(dat)?));
                }
            }
            "ELSE" => {
                check_narg(&name, narg, 0)?;
                lines[lidx].push("ELSE[]".to_string());
            }
            "IF" | "LOOP" => {
                return Err(Error::layout(format!("{name} with {narg} arguments")));
            }
            "RETURNCODE" => {
                check_narg(&name, narg, 1)?;
                match args[0].len {
                    0 => {}
                    1 => preps.push("PREP[TEXTVAL=1]".to_string()),
                    c => return Err(Error::layout(format!("unknown RETURNCODE payload {c}"))),
                }
            }
            "WORD" => {
                check_narg(&name, narg, 1)?;
                let ArgData::Text(s) = &args[0].data else {
                    return Err(Error::layout("WORD argument without text payload"));
                };
                lines[lidx].push(s.clone());
            }
            "END" if i + 1 == ystb.cmds.len() => check_narg(&name, narg, 0)?,
            _ if name == "LET" || def_cmd_typ(&name).is_some() => {
                check_narg(&name, narg, 2)?;
                let (lhs, rhs) = (&args[0], &args[1]);
                if rhs.aop != 0 {
                    return Err(Error::layout(format!(
                        "{name} right-hand side with assign op {}",
                        rhs.aop
                    )));
                }
                let lhsdat = lhs.expr()?;
                let rhsdat = rhs.expr()?;
                if let Some(typ) = local_def_typ(&name) {
                    env.def_local(lhs_var_operand(lhsdat)?, typ)?;
                }
                let lhsstr = env.dat_to_argstr(lhsdat)?;
                let rhsstr = env.dat_to_argstr(rhsdat)?;
                if name == "LET" {
                    lines[lidx].push(format!("{lhsstr}{}{rhsstr}", lhs.aop_str()));
                } else {
                    if lhs.aop != 0 {
                        return Err(Error::layout(format!(
                            "{name} left-hand side with assign op {}",
                            lhs.aop
                        )));
                    }
                    let x = lhs_var_operand(lhsdat)?;
                    // No `=value` tail for a plain zero initializer, nor
                    // when the variable record says it never had one.
                    let n_noinit = is_lone_int(rhsdat, Opcode::I64, 0);
                    let s_noinit = env.has_empty_initializer((x >> 8) as u16);
                    if n_noinit || s_noinit {
                        lines[lidx].push(format!("{name}[{lhsstr}]"));
                    } else {
                        lines[lidx].push(format!("{name}[{lhsstr}={rhsstr}]"));
                    }
                }
            }
            "_" => {
                check_narg(&name, narg, 1)?;
                let s = env.dat_to_argstr(args[0].expr()?)?;
                lines[lidx].push(format!("_[{s}]"));
            }
            _ => {
                let mut segs = Vec::with_capacity(narg);
                for arg in args {
                    let arg_name = {
                        let (_, arg_names) = env.command(cmd.code)?;
                        arg_names
                            .get(arg.id as usize)
                            .filter(|n| !n.is_empty())
                            .cloned()
                            .ok_or_else(|| {
                                Error::layout(format!(
                                    "{name}: no parameter name for argument id {}",
                                    arg.id
                                ))
                            })?
                    };
                    segs.push(format!("{arg_name}{}{}", arg.aop_str(), env.dat_to_argstr(arg.expr()?)?));
                }
                lines[lidx].push(format!("{name}[{}]", segs.join(" ")));
            }
        }
    }

    if !lbls.is_empty() {
        let names = lbls.into_values().flatten().collect();
        return Err(Error::LabelsUnconsumed { names });
    }

    let text: Vec<String> = lines.into_iter().map(|l| l.join(";")).collect();
    Ok(text.join("\n"))
}
