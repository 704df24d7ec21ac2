use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use yuris_core::format::{Ypf, YpfOverrides};
use yuris_nls::{Codec, Encoding};

/// Extract a YU-RIS YPF archive to a directory tree.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Archive to extract (e.g. YSbin.ypf).
    archive: PathBuf,

    /// Output directory.
    output: PathBuf,

    /// Character set of the entry names.
    #[arg(short, long, default_value = "cp932")]
    encoding: Encoding,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let bytes = fs::read(&args.archive)
        .with_context(|| format!("read {}", args.archive.display()))?;
    let ypf = Ypf::parse(&bytes, Codec::new(args.encoding), YpfOverrides::default())
        .with_context(|| format!("parse {}", args.archive.display()))?;
    log::info!("archive version {}, {} entries", ypf.ver, ypf.files.len());

    for (name, data) in &ypf.files {
        let rel = name.replace('\\', "/");
        let out_path = args.output.join(&rel);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        println!("{rel}");
        fs::write(&out_path, data).with_context(|| format!("write {}", out_path.display()))?;
    }
    Ok(())
}
