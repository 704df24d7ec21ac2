//! Human-readable listings of parsed containers.
//!
//! These mirror what the engine's own debug tooling prints and exist to
//! diff two compiled script sets (e.g. an original against a recompile of
//! the decompiler's output).

use std::io::{self, Write};

use crate::format::ystb::{Arg, ArgData, Ystb};
use crate::format::ysvr::InitValue;
use crate::format::{Yscd, Yscf, Yscm, Yser, Yslb, Ystl, Ysvr};
use crate::ins::fmt_ins_list;

fn fmt_arg(arg: &Arg) -> String {
    let head = format!(
        "id={} typ={:0>2x} aop={}({})",
        arg.id,
        arg.typ,
        arg.aop,
        arg.aop_str()
    );
    match &arg.data {
        ArgData::None => format!("{head} len={} off={}", arg.len, arg.off),
        ArgData::Text(s) => format!("{head}: {s}"),
        ArgData::Expr(list) => format!("{head}: {}", fmt_ins_list(list)),
    }
}

fn fmt_init(init: &InitValue) -> String {
    match init {
        InitValue::None => "None".to_string(),
        InitValue::Int(v) => v.to_string(),
        InitValue::Float(v) => format!("{v:?}"),
        InitValue::Expr(list) => fmt_ins_list(list),
    }
}

pub fn dump_yscm<W: Write>(w: &mut W, y: &Yscm) -> io::Result<()> {
    writeln!(w, "YSCM ver={} ncmd={}", y.ver, y.cmds.len())?;
    writeln!(w, "- COMMANDS -")?;
    for (i, c) in y.cmds.iter().enumerate() {
        writeln!(w, "[{i}]C:{}", c.name)?;
        for (j, a) in c.args.iter().enumerate() {
            writeln!(w, "\t[{i}][{j}]A:{} typ={} val={}", a.name, a.typ, a.chk)?;
        }
    }
    Ok(())
}

pub fn dump_yser<W: Write>(w: &mut W, y: &Yser) -> io::Result<()> {
    writeln!(w, "YSER ver={} nerr={}", y.ver, y.errs.len())?;
    for (i, e) in y.errs.iter().enumerate() {
        writeln!(w, "[{i}]E id={} msg={:?}", e.id, e.msg)?;
    }
    Ok(())
}

pub fn dump_yscf<W: Write>(w: &mut W, y: &Yscf) -> io::Result<()> {
    writeln!(w, "YSCF ver={} caption={:?}", y.ver, y.caption)?;
    writeln!(
        w,
        "screen={}x{} compile={} enable={} thread={} debug_mode={} sound={}",
        y.screen_width, y.screen_height, y.compile, y.enable, y.thread, y.debug_mode, y.sound
    )?;
    writeln!(
        w,
        "window_resize={} window_frame={} file_priority=dev:{},debug:{},release:{}",
        y.window_resize,
        y.window_frame,
        y.file_priority_dev,
        y.file_priority_debug,
        y.file_priority_release
    )?;
    writeln!(w, "image_slots={:?} sound_slots={:?}", y.image_type_slots, y.sound_type_slots)
}

pub fn dump_yslb<W: Write>(w: &mut W, y: &Yslb) -> io::Result<()> {
    writeln!(w, "YSLB ver={} nlbl={}", y.ver, y.lbls.len())?;
    for (i, l) in y.lbls.iter().enumerate() {
        writeln!(
            w,
            "[{i:3}] name={:<10} id={:0>8x} ip={} scr_idx={} if={} loop={}",
            l.name, l.id, l.ip, l.scr_idx, l.if_lvl, l.loop_lvl
        )?;
    }
    Ok(())
}

pub fn dump_ystl<W: Write>(w: &mut W, y: &Ystl) -> io::Result<()> {
    writeln!(w, "YSTL ver={} nscr={}", y.ver, y.scrs.len())?;
    for (i, s) in y.scrs.iter().enumerate() {
        writeln!(
            w,
            "[{i:>3}] idx={:<3} path={} time={} nvar={} nlbl={} ntext={}",
            s.idx, s.path, s.time, s.nvar, s.nlbl, s.ntext
        )?;
    }
    Ok(())
}

pub fn dump_ysvr<W: Write>(w: &mut W, y: &Ysvr, sys_only: bool) -> io::Result<()> {
    writeln!(w, "YSVR ver={} nvar={}", y.ver, y.vars.len())?;
    for (i, v) in y.vars.iter().enumerate() {
        if sys_only && !v.is_compiler_slot() {
            continue;
        }
        writeln!(
            w,
            "[{i}]: var_idx={} scope={} g_ext={} scr_idx={} dims={:?} init={}",
            v.var_idx,
            v.scope,
            v.g_ext,
            v.scr_idx,
            v.dim,
            fmt_init(&v.initv)
        )?;
    }
    Ok(())
}

pub fn dump_yscd<W: Write>(w: &mut W, y: &Yscd) -> io::Result<()> {
    writeln!(w, "YSCD ver={}", y.ver)?;
    writeln!(w, "- COMMANDS ncmd={} -", y.cmds.len())?;
    for (i, c) in y.cmds.iter().enumerate() {
        writeln!(w, "[{i}]C:{}", c.name)?;
        for (j, a) in c.args.iter().enumerate() {
            writeln!(
                w,
                "\t[{i}][{j:2}]A:{:10} unk={:?} typ={} val={}",
                a.name, a.unk2, a.typ, a.val
            )?;
        }
    }
    writeln!(w, "- VARS nvar={} -", y.vars.len())?;
    for (i, v) in y.vars.iter().enumerate() {
        writeln!(w, "[{i}]V:{} typ={}, dim={:?}", v.name, v.typ, v.dim)?;
    }
    writeln!(w, "- ERRS nerr={} -", y.errs.len())?;
    for (i, e) in y.errs.iter().enumerate() {
        writeln!(w, "[{i}]E id={} msg={:?}", e.id, e.msg)?;
    }
    writeln!(w, "- ESTR nestr={} -", y.estr.len())?;
    for (i, e) in y.estr.iter().enumerate() {
        writeln!(w, "[{i}]S {:?}", e)?;
    }
    Ok(())
}

/// Per-command disassembly listing, resolved against a command vocabulary
/// (`(name, parameter names)` per opcode, in vocabulary order).
pub fn dump_ystb<W: Write>(
    w: &mut W,
    y: &Ystb,
    vocab: &[(String, Vec<String>)],
) -> io::Result<()> {
    writeln!(w, "YSTB ver={} key={:0>8x} ncmd={}", y.ver, y.key, y.cmds.len())?;
    for (i, cmd) in y.cmds.iter().enumerate() {
        let unknown = (String::from("?"), Vec::new());
        let (name, arg_names) = vocab.get(cmd.code as usize).unwrap_or(&unknown);
        writeln!(w, "[{i}] off={} npar={} {}:{}", cmd.off, cmd.npar, cmd.code, name)?;
        match name.as_str() {
            "IF" | "ELSE" if cmd.args.len() == 3 => {
                writeln!(w, "-  cond: {}", fmt_arg(&cmd.args[0]))?;
                writeln!(w, "-  else: {}", fmt_arg(&cmd.args[1]))?;
                writeln!(w, "- ifend: {}", fmt_arg(&cmd.args[2]))?;
            }
            "LOOP" if cmd.args.len() == 2 => {
                writeln!(w, "- count: {}", fmt_arg(&cmd.args[0]))?;
                writeln!(w, "- break: {}", fmt_arg(&cmd.args[1]))?;
            }
            "WORD" => {
                if let Some(Arg { data: ArgData::Text(s), .. }) = cmd.args.first() {
                    writeln!(w, "# {s}")?;
                }
            }
            _ => {
                for (j, arg) in cmd.args.iter().enumerate() {
                    let aname = arg_names
                        .get(arg.id as usize)
                        .map(|n| format!("{n} "))
                        .unwrap_or_default();
                    writeln!(w, "- [{j}] {aname}{}", fmt_arg(arg))?;
                }
            }
        }
    }
    Ok(())
}

/// Vocabulary view of a YSCM for [`dump_ystb`].
pub fn yscm_vocab(y: &Yscm) -> Vec<(String, Vec<String>)> {
    y.cmds
        .iter()
        .map(|c| (c.name.clone(), c.args.iter().map(|a| a.name.clone()).collect()))
        .collect()
}

/// Vocabulary view of a YSCD for [`dump_ystb`].
pub fn yscd_vocab(y: &Yscd) -> Vec<(String, Vec<String>)> {
    y.cmds
        .iter()
        .map(|c| (c.name.clone(), c.args.iter().map(|a| a.name.clone()).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use yuris_nls::Codec;

    use crate::format::ystb::tests::{build_v300, i8_payload};
    use crate::format::ystb::Ystb;
    use crate::format::yscm::tests::sample_yscm_bytes;
    use crate::format::Yscm;
    use crate::reader::Reader;

    use super::*;

    #[test]
    fn ystb_listing_shows_commands_and_args() {
        let c = Codec::default();
        let yscm_buf = sample_yscm_bytes(480, &[("WAIT", &["TIME"])]);
        let yscm = Yscm::parse(&mut Reader::new(&yscm_buf, c)).unwrap();
        let buf = build_v300(
            480,
            0,
            &[
                (5, 1, vec![(0, 0, i8_payload(30))]),
                (2, 2, vec![(0, 0, i8_payload(-1)), (1, 0, vec![])]),
            ],
        );
        let ystb = Ystb::parse(&buf, &yscm.known, 0, c).unwrap();
        let mut out = Vec::new();
        dump_ystb(&mut out, &ystb, &yscm_vocab(&yscm)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[0] off=0 npar=0 5:WAIT"), "{text}");
        assert!(text.contains("- [0] TIME id=0 typ=00 aop=0(=): [(i8:0x1e=30)]"), "{text}");
        assert!(text.contains("- count: id=0 typ=00 aop=0(=): [(i8:-0x1=-1)]"), "{text}");
    }
}
