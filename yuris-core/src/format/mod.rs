//! Parsers for the magic-tagged binary containers of a compiled script set.
//!
//! Every container opens with a 4-byte magic and a `u32` engine version;
//! layout differences between engine builds are handled by explicit
//! match-on-version inside each parser.

pub mod yscd;
pub mod yscf;
pub mod yscm;
pub mod yser;
pub mod yslb;
pub mod ystb;
pub mod ystd;
pub mod ystl;
pub mod ysvr;
pub mod ypf;

pub use yscd::{DArg, DCmd, DVar, Yscd};
pub use yscf::Yscf;
pub use yscm::{KnownCmds, MArg, MCmd, Yscm};
pub use yser::{ErrEntry, Yser};
pub use yslb::{Lbl, Yslb};
pub use ystb::{xor_trans, Arg, ArgData, Cmd, Ystb, ASSIGN_OPS};
pub use ystd::Ystd;
pub use ystl::{Scr, Ystl};
pub use ysvr::{InitValue, Var, Ysvr};
pub use ypf::{HashKind, Ypf, YpfOverrides};

use crate::error::{Error, Result};
use crate::reader::Reader;

/// Read and check the common `magic + u32 version` prefix.
pub(crate) fn read_header(r: &mut Reader, magic: &'static str) -> Result<u32> {
    let found = r.read(4)?;
    if found != magic.as_bytes() {
        return Err(Error::BadMagic {
            expected: magic,
            found: [found[0], found[1], found[2], found[3]],
        });
    }
    crate::check_version(r.u32()?)
}

pub(crate) fn check_pad(value: u32, what: &str) -> Result<()> {
    if value != 0 {
        return Err(Error::layout(format!("{what}: nonzero pad word {value:#x}")));
    }
    Ok(())
}
