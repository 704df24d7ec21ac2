use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use yuris_core::dump::{dump_ystb, yscm_vocab};
use yuris_core::format::{Yscd, Yscm, Yslb, Ystl, Ysvr};
use yuris_core::reader::Reader;
use yuris_core::{Decompiler, Options, DEFAULT_YSTB_KEY};
use yuris_nls::{Codec, Encoding};

/// Decompile a compiled YU-RIS script set (`ysbin` directory) to source.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding ysv.ybn, ysl.ybn, ysc.ybn, yst_list.ybn and the
    /// per-script yst*.ybn files.
    input: PathBuf,

    /// Output directory; script paths from yst_list.ybn are mirrored here.
    output: PathBuf,

    /// Compiler definition (YSCom.ycd) for real compiler-variable names.
    #[arg(long)]
    yscd: Option<PathBuf>,

    /// Engine command table; defaults to <input>/ysc.ybn.
    #[arg(long)]
    yscm: Option<PathBuf>,

    /// YSTB obfuscation key (hex).
    #[arg(short, long, value_parser = parse_key, default_value = "D36FAC96")]
    key: u32,

    /// Character set of the compiled files.
    #[arg(long, default_value = "cp932")]
    input_encoding: Encoding,

    /// Character set of the emitted sources. The vendor compiler only
    /// accepts cp932.
    #[arg(long, default_value = "cp932")]
    output_encoding: Encoding,

    /// Rewrite the legacy `$@var` spelling as `$(@var)`.
    #[arg(long)]
    new_tostr: bool,

    /// Also write a `.dump` disassembly listing next to each script.
    #[arg(long)]
    dump: bool,
}

fn parse_key(s: &str) -> Result<u32, String> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(s, 16).map_err(|e| format!("bad key {s:?}: {e}"))
}

fn read_container<T>(
    path: &Path,
    codec: Codec,
    parse: impl FnOnce(&mut Reader) -> yuris_core::Result<T>,
) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mut r = Reader::new(&bytes, codec);
    parse(&mut r).with_context(|| format!("parse {}", path.display()))
}

/// Write script text with the engine's `\r\n` convention in the requested
/// character set.
fn write_script(path: &Path, text: &str, codec: Codec) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let crlf = text.replace('\n', "\r\n");
    fs::write(path, codec.encode(&crlf))
        .with_context(|| format!("write {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let in_codec = Codec::new(args.input_encoding);
    let out_codec = Codec::new(args.output_encoding);

    let ysvr: Ysvr = read_container(&args.input.join("ysv.ybn"), in_codec, Ysvr::parse)?;
    let yslb: Yslb = read_container(&args.input.join("ysl.ybn"), in_codec, Yslb::parse)?;
    let yscm_path = args.yscm.clone().unwrap_or_else(|| args.input.join("ysc.ybn"));
    let yscm: Yscm = read_container(&yscm_path, in_codec, Yscm::parse)?;
    let ystl: Ystl = read_container(&args.input.join("yst_list.ybn"), in_codec, Ystl::parse)?;
    let yscd: Option<Yscd> = match &args.yscd {
        Some(p) => Some(read_container(p, in_codec, Yscd::parse)?),
        None => None,
    };

    let opts = Options { ystb_key: args.key, to_new_tostr: args.new_tostr };
    if args.key != DEFAULT_YSTB_KEY {
        info!("using non-default ystb key {:08x}", args.key);
    }
    let mut decompiler =
        Decompiler::new(yscd.as_ref(), &ysvr, &yslb, &yscm, in_codec, opts)?;

    for scr in &ystl.scrs {
        let rel = scr.path.replace('\\', "/");
        let out_path = args.output.join(&rel);
        if scr.is_empty_slot() {
            let had_globals = decompiler.has_pending_globals();
            let text = decompiler.empty_script_source(&scr.path);
            if had_globals && !decompiler.has_pending_globals() {
                info!("{} {} - empty, globals placed here", scr.idx, rel);
            } else {
                info!("{} {} - empty", scr.idx, rel);
            }
            write_script(&out_path, &text, out_codec)?;
            continue;
        }
        info!("{} {}", scr.idx, rel);
        let ystb_path = args.input.join(format!("yst{:0>5}.ybn", scr.idx));
        let bytes =
            fs::read(&ystb_path).with_context(|| format!("read {}", ystb_path.display()))?;
        let ystb = decompiler
            .load_ystb(&bytes)
            .with_context(|| format!("parse {}", ystb_path.display()))?;
        let text = decompiler
            .emit(scr.idx as u16, &ystb)
            .with_context(|| format!("emit {rel}"))?;
        write_script(&out_path, &text, out_codec)?;
        if args.dump {
            let dump_path = args.output.join(format!("{rel}.dump"));
            let mut out = Vec::new();
            dump_ystb(&mut out, &ystb, &yscm_vocab(&yscm))?;
            fs::write(&dump_path, out)
                .with_context(|| format!("write {}", dump_path.display()))?;
        }
    }

    if let Some(globals) = decompiler.take_globals() {
        info!("no empty slot for globals, writing global.yst");
        write_script(&args.output.join("global.yst"), &globals, out_codec)?;
    }
    if yscd.is_none() {
        warn!("no YSCom.ycd given: compiler variables keep _comXXX placeholder names");
    }
    Ok(())
}
