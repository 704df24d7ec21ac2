//! YSCF: project configuration (`yscfg.ybn`).
//!
//! Only the dump tooling reads this; the decompiler proper never needs it.

use crate::error::Result;
use crate::reader::Reader;

use super::read_header;

#[derive(Debug, Clone)]
pub struct Yscf {
    pub ver: u32,
    pub pad1: u32,
    pub compile: u32,
    pub screen_width: u32,
    pub screen_height: u32,
    pub enable: u32,
    pub image_type_slots: [u8; 8],
    pub sound_type_slots: [u8; 4],
    pub thread: u32,
    pub debug_mode: u32,
    pub sound: u32,
    pub window_resize: u32,
    pub window_frame: u32,
    pub file_priority_dev: u32,
    pub file_priority_debug: u32,
    pub file_priority_release: u32,
    pub pad2: u32,
    pub caption: String,
}

impl Yscf {
    pub fn parse(r: &mut Reader) -> Result<Yscf> {
        let ver = read_header(r, "YSCF")?;
        let pad1 = r.u32()?;
        let compile = r.u32()?;
        let screen_width = r.u32()?;
        let screen_height = r.u32()?;
        let enable = r.u32()?;
        let mut image_type_slots = [0u8; 8];
        image_type_slots.copy_from_slice(r.read(8)?);
        let mut sound_type_slots = [0u8; 4];
        sound_type_slots.copy_from_slice(r.read(4)?);
        let thread = r.u32()?;
        let debug_mode = r.u32()?;
        let sound = r.u32()?;
        let window_resize = r.u32()?;
        let window_frame = r.u32()?;
        let file_priority_dev = r.u32()?;
        let file_priority_debug = r.u32()?;
        let file_priority_release = r.u32()?;
        let pad2 = r.u32()?;
        let cap_len = r.u16()? as usize;
        let caption = r.str(cap_len)?;
        r.assert_eof(ver)?;
        Ok(Yscf {
            ver,
            pad1,
            compile,
            screen_width,
            screen_height,
            enable,
            image_type_slots,
            sound_type_slots,
            thread,
            debug_mode,
            sound,
            window_resize,
            window_frame,
            file_priority_dev,
            file_priority_debug,
            file_priority_release,
            pad2,
            caption,
        })
    }
}
