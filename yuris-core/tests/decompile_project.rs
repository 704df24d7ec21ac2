//! End-to-end: assemble a small compiled script set from raw bytes and
//! check the emitted sources, the globals placement and the dump listing.

use pretty_assertions::assert_eq;

use yuris_core::dump::{dump_ystb, yscm_vocab};
use yuris_core::format::{xor_trans, Yscm, Yslb, Ystl, Ysvr};
use yuris_core::reader::Reader;
use yuris_core::{Decompiler, Options, DEFAULT_YSTB_KEY};
use yuris_nls::Codec;

const VER: u32 = 480;

// Vocabulary opcodes used by the script below.
const CMD_IF: u8 = 0;
const CMD_ELSE: u8 = 1;
const CMD_LOOP: u8 = 2;
const CMD_WORD: u8 = 4;
const CMD_END: u8 = 5;
const CMD_G_INT: u8 = 6;
const CMD_WAIT: u8 = 7;

fn le32(v: u32) -> [u8; 4] {
    v.to_le_bytes()
}

fn yscm_bytes() -> Vec<u8> {
    let cmds: &[(&str, &[&str])] = &[
        ("IF", &[]),
        ("ELSE", &[]),
        ("LOOP", &[]),
        ("RETURNCODE", &[]),
        ("WORD", &[]),
        ("END", &[]),
        ("G_INT", &[]),
        ("WAIT", &["TIME", "RESULT"]),
    ];
    let mut buf = b"YSCM".to_vec();
    buf.extend_from_slice(&le32(VER));
    buf.extend_from_slice(&le32(cmds.len() as u32));
    buf.extend_from_slice(&le32(0));
    for (name, args) in cmds {
        buf.extend_from_slice(name.as_bytes());
        buf.push(0);
        buf.push(args.len() as u8);
        for a in *args {
            buf.extend_from_slice(a.as_bytes());
            buf.push(0);
            buf.push(0);
            buf.push(0);
        }
    }
    for _ in 0..37 {
        buf.push(0);
    }
    buf.extend_from_slice(&[0u8; 256]);
    buf
}

fn ysvr_bytes() -> Vec<u8> {
    // one user global: @gInt1000 = 42
    let mut buf = b"YSVR".to_vec();
    buf.extend_from_slice(&le32(VER));
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.push(1); // scope: global
    buf.extend_from_slice(&0u16.to_le_bytes()); // scr_idx
    buf.extend_from_slice(&1000u16.to_le_bytes()); // var_idx
    buf.push(1); // typ: int
    buf.push(0); // ndim
    buf.extend_from_slice(&42i64.to_le_bytes());
    buf
}

fn yslb_bytes() -> Vec<u8> {
    // one label on script 1, command index 1
    let mut buf = b"YSLB".to_vec();
    buf.extend_from_slice(&le32(VER));
    buf.extend_from_slice(&le32(1));
    buf.extend_from_slice(&[0u8; 1024]);
    buf.push(4);
    buf.extend_from_slice(b"MAIN");
    buf.extend_from_slice(&le32(0)); // id
    buf.extend_from_slice(&le32(1)); // ip (command index)
    buf.extend_from_slice(&1u16.to_le_bytes()); // scr_idx
    buf.push(0);
    buf.push(0);
    buf
}

fn ystl_bytes() -> Vec<u8> {
    let scrs: &[(&str, i32)] = &[("data\\script\\empty.yst", -1), ("data\\script\\main.yst", 1)];
    let mut buf = b"YSTL".to_vec();
    buf.extend_from_slice(&le32(VER));
    buf.extend_from_slice(&le32(scrs.len() as u32));
    for (i, (path, nvar)) in scrs.iter().enumerate() {
        buf.extend_from_slice(&le32(i as u32));
        buf.extend_from_slice(&le32(path.len() as u32));
        buf.extend_from_slice(path.as_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&nvar.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes()); // ntext (v >= 470)
    }
    buf
}

fn ystb_bytes(key: u32) -> Vec<u8> {
    // line 1: WORD "「こんにちは」"
    // line 2: WAIT[TIME=30 RESULT=@gInt1000]   <- label #MAIN points here
    // line 3: LOOP[]
    // line 3: END
    let word = Codec::default().encode_owned("「こんにちは」");
    let cmds: &[(u8, u32, &[(u16, u8, &[u8])])] = &[
        (CMD_WORD, 1, &[(0, 0, &word)]),
        (CMD_WAIT, 2, &[(0, 0, &[0x42, 0x01, 0x00, 30]), (1, 0, &[0x48, 0x03, 0x00, 0x40, 0xE8, 0x03])]),
        (CMD_LOOP, 3, &[(0, 0, &[0x42, 0x01, 0x00, 0xFF]), (1, 0, &[])]),
        (CMD_END, 3, &[]),
    ];
    let mut dcmd = Vec::new();
    let mut darg = Vec::new();
    let mut dexp = Vec::new();
    let mut dlno = Vec::new();
    for (code, lno, args) in cmds {
        dcmd.push(*code);
        dcmd.push(args.len() as u8);
        dcmd.extend_from_slice(&0u16.to_le_bytes());
        dlno.extend_from_slice(&le32(*lno));
        for (id, aop, payload) in *args {
            let off = dexp.len() as u32;
            dexp.extend_from_slice(payload);
            darg.extend_from_slice(&id.to_le_bytes());
            darg.push(0);
            darg.push(*aop);
            darg.extend_from_slice(&le32(payload.len() as u32));
            darg.extend_from_slice(&le32(off));
        }
    }
    let mut buf = b"YSTB".to_vec();
    buf.extend_from_slice(&le32(VER));
    buf.extend_from_slice(&le32(cmds.len() as u32));
    for len in [dcmd.len(), darg.len(), dexp.len(), dlno.len()] {
        buf.extend_from_slice(&le32(len as u32));
    }
    buf.extend_from_slice(&le32(0));
    for mut section in [dcmd, darg, dexp, dlno] {
        xor_trans(&mut section, key);
        buf.extend_from_slice(&section);
    }
    buf
}

#[test]
fn decompiles_a_whole_project() {
    let codec = Codec::default();
    let yscm = Yscm::parse(&mut Reader::new(&yscm_bytes(), codec)).unwrap();
    let ysvr = Ysvr::parse(&mut Reader::new(&ysvr_bytes(), codec)).unwrap();
    let yslb = Yslb::parse(&mut Reader::new(&yslb_bytes(), codec)).unwrap();
    let ystl = Ystl::parse(&mut Reader::new(&ystl_bytes(), codec)).unwrap();

    let mut decompiler =
        Decompiler::new(None, &ysvr, &yslb, &yscm, codec, Options::default()).unwrap();

    let mut outputs = Vec::new();
    for scr in &ystl.scrs {
        let text = if scr.is_empty_slot() {
            decompiler.empty_script_source(&scr.path)
        } else {
            decompiler
                .script_source(scr.idx as u16, &ystb_bytes(DEFAULT_YSTB_KEY))
                .unwrap()
        };
        outputs.push((scr.path.replace('\\', "/"), text));
    }

    assert_eq!(outputs[0].0, "data/script/empty.yst");
    assert_eq!(outputs[0].1, "G_INT[@gInt1000=42]");

    assert_eq!(outputs[1].0, "data/script/main.yst");
    assert_eq!(
        outputs[1].1,
        "「こんにちは」\n#MAIN;WAIT[TIME=30 RESULT=@gInt1000]\nLOOP[]"
    );

    assert!(decompiler.take_globals().is_none());
}

#[test]
fn dump_listing_resolves_names() {
    let codec = Codec::default();
    let yscm = Yscm::parse(&mut Reader::new(&yscm_bytes(), codec)).unwrap();
    let decomp = {
        let ysvr = Ysvr::parse(&mut Reader::new(&ysvr_bytes(), codec)).unwrap();
        let yslb = Yslb::parse(&mut Reader::new(&yslb_bytes(), codec)).unwrap();
        Decompiler::new(None, &ysvr, &yslb, &yscm, codec, Options::default()).unwrap()
    };
    let ystb = decomp.load_ystb(&ystb_bytes(DEFAULT_YSTB_KEY)).unwrap();
    let mut out = Vec::new();
    dump_ystb(&mut out, &ystb, &yscm_vocab(&yscm)).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("4:WORD"), "{text}");
    assert!(text.contains("7:WAIT"), "{text}");
    assert!(text.contains("- count: id=0 typ=00 aop=0(=): [(i8:-0x1=-1)]"), "{text}");
}

#[test]
fn wrong_key_refuses_to_decode() {
    let codec = Codec::default();
    let yscm = Yscm::parse(&mut Reader::new(&yscm_bytes(), codec)).unwrap();
    let ysvr = Ysvr::parse(&mut Reader::new(&ysvr_bytes(), codec)).unwrap();
    let yslb = Yslb::parse(&mut Reader::new(&yslb_bytes(), codec)).unwrap();
    let mut decompiler = Decompiler::new(
        None,
        &ysvr,
        &yslb,
        &yscm,
        codec,
        Options { ystb_key: 0x1111_1111, ..Options::default() },
    )
    .unwrap();
    assert!(decompiler.script_source(1, &ystb_bytes(DEFAULT_YSTB_KEY)).is_err());
}
