//! Core library for decompiling YU-RIS script sets.
//!
//! The library is strictly buffer-in / text-out: containers are parsed from
//! in-memory byte slices and the emitter produces `String`s. All filesystem
//! traffic lives in the tool crates.

pub mod decompile;
pub mod dump;
pub mod emit;
pub mod env;
pub mod error;
pub mod expr;
pub mod format;
pub mod ins;
pub mod reader;

pub use decompile::{Decompiler, Options};
pub use error::{Error, Result};

/// Engine versions are supported in `VER_MIN..VER_MAX`.
pub const VER_MIN: u32 = 200;
pub const VER_MAX: u32 = 501;

/// Variable indices below this come from the compiler definition file;
/// indices at or above it are user variables declared in script source.
pub const USER_VAR_MIN: u16 = 1000;

/// Key the stock engine uses to obfuscate YSTB sections.
pub const DEFAULT_YSTB_KEY: u32 = 0xD36F_AC96;

pub fn version_supported(ver: u32) -> bool {
    (VER_MIN..VER_MAX).contains(&ver)
}

pub(crate) fn check_version(ver: u32) -> Result<u32> {
    if !version_supported(ver) {
        return Err(Error::UnsupportedVersion { ver });
    }
    Ok(ver)
}
