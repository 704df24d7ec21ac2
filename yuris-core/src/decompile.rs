//! Whole-project orchestration: build the symbol environment once, then
//! turn each script's YSTB bytes into source text.

use yuris_nls::Codec;

use crate::emit::emit_script;
use crate::env::YEnv;
use crate::error::Result;
use crate::format::{KnownCmds, Yscd, Yscm, Yslb, Ystb, Ysvr};
use crate::DEFAULT_YSTB_KEY;

#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub ystb_key: u32,
    /// Rewrite the legacy `$@var` spelling as an explicit `$(@var)`.
    pub to_new_tostr: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { ystb_key: DEFAULT_YSTB_KEY, to_new_tostr: false }
    }
}

pub struct Decompiler {
    env: YEnv,
    known: KnownCmds,
    key: u32,
    codec: Codec,
}

impl Decompiler {
    pub fn new(
        yscd: Option<&Yscd>,
        ysvr: &Ysvr,
        yslb: &Yslb,
        yscm: &Yscm,
        codec: Codec,
        opts: Options,
    ) -> Result<Decompiler> {
        let env = YEnv::new(yscd, ysvr, yslb, yscm, opts.to_new_tostr)?;
        Ok(Decompiler { env, known: yscm.known, key: opts.ystb_key, codec })
    }

    pub fn env(&self) -> &YEnv {
        &self.env
    }

    pub fn known(&self) -> &KnownCmds {
        &self.known
    }

    pub fn load_ystb(&self, bytes: &[u8]) -> Result<Ystb> {
        Ystb::parse(bytes, &self.known, self.key, self.codec)
    }

    pub fn emit(&mut self, scr_idx: u16, ystb: &Ystb) -> Result<String> {
        emit_script(&mut self.env, scr_idx, ystb)
    }

    /// Decode and emit one script in a single step.
    pub fn script_source(&mut self, scr_idx: u16, ystb_bytes: &[u8]) -> Result<String> {
        let ystb = self.load_ystb(ystb_bytes)?;
        self.emit(scr_idx, &ystb)
    }

    /// Content for an empty placeholder slot (`nvar < 0`).
    ///
    /// The first empty slot whose path does not mention "macro" hosts the
    /// global declarations; every other empty slot becomes the engine's
    /// canonical empty script, a lone `;`.
    pub fn empty_script_source(&mut self, path: &str) -> String {
        if self.env.globals_text().is_some() && !path.to_lowercase().contains("macro") {
            return self.env.take_globals().unwrap();
        }
        ";".to_string()
    }

    pub fn has_pending_globals(&self) -> bool {
        self.env.globals_text().is_some()
    }

    /// Globals that no empty slot absorbed; the caller writes them to a
    /// standalone `global.yst`.
    pub fn take_globals(&mut self) -> Option<String> {
        self.env.take_globals()
    }
}
