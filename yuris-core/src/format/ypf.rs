//! YPF packaged archives.
//!
//! Entry names are stored with a permuted length byte and a per-version
//! byte substitution; name and file hashes switched algorithms twice over
//! the engine's lifetime. All transforms can be overridden for oddball
//! repacks; defaults follow the archive's own version field.

use std::io::Read;

use adler32::RollingAdler32;
use flate2::read::ZlibDecoder;
use log::debug;
use yuris_nls::Codec;

use crate::error::{Error, Result};
use crate::reader::Reader;

use super::read_header;

/// Hash algorithm used by a verification slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    None,
    Crc32,
    Adler32,
    /// MurmurHash2 with seed 0.
    Murmur2,
}

impl HashKind {
    /// `Some(actual)` iff a hash was computed and it mismatched.
    pub fn verify(self, data: &[u8], expected: u32) -> Option<u32> {
        let actual = match self {
            HashKind::None => return None,
            HashKind::Crc32 => crc32fast::hash(data),
            HashKind::Adler32 => {
                let mut a = RollingAdler32::new();
                a.update_buffer(data);
                a.hash()
            }
            HashKind::Murmur2 => murmur2::murmur2(data, 0),
        };
        (actual != expected).then_some(actual)
    }

    /// `(name, file)` verifier pair an archive version defaults to.
    pub fn defaults_for(ver: u32) -> (HashKind, HashKind) {
        if ver < 265 {
            (HashKind::None, HashKind::None)
        } else if ver < 470 {
            (HashKind::Crc32, HashKind::Adler32)
        } else {
            (HashKind::Murmur2, HashKind::Murmur2)
        }
    }
}

const NL_SWAPS: [(usize, usize); 9] = [
    (6, 53),
    (9, 11),
    (12, 16),
    (13, 19),
    (21, 27),
    (28, 30),
    (32, 35),
    (38, 41),
    (44, 47),
];

fn swap_trans(extra: [(usize, usize); 3]) -> [u8; 256] {
    let mut t = [0u8; 256];
    for (i, b) in t.iter_mut().enumerate() {
        *b = i as u8;
    }
    for &(i, j) in extra.iter().chain(NL_SWAPS.iter()) {
        t.swap(i, j);
    }
    t
}

/// Name-length permutation; 500 moved three of the swap pairs.
pub fn name_size_trans(ver: u32) -> [u8; 256] {
    if ver == 500 {
        swap_trans([(3, 10), (17, 24), (20, 46)])
    } else {
        swap_trans([(3, 72), (17, 25), (46, 50)])
    }
}

/// Name-byte substitution: complement, with an extra XOR on 290 and 500.
pub fn name_byte_trans(ver: u32) -> [u8; 256] {
    let extra = match ver {
        290 => 0x40,
        500 => 0x36,
        _ => 0x00,
    };
    let mut t = [0u8; 256];
    for (i, b) in t.iter_mut().enumerate() {
        *b = i as u8 ^ 0xff ^ extra;
    }
    t
}

/// Transform overrides; `None` fields fall back to version defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct YpfOverrides {
    pub name_size_trans: Option<[u8; 256]>,
    pub name_byte_trans: Option<[u8; 256]>,
    pub hashes: Option<(HashKind, HashKind)>,
}

struct RawEntry {
    name: String,
    compressed: bool,
    raw_size: u32,
    stored_size: u32,
    offset: u64,
    hash: u32,
}

#[derive(Debug, Clone)]
pub struct Ypf {
    pub ver: u32,
    /// `(archive path, decompressed bytes)` in directory order.
    pub files: Vec<(String, Vec<u8>)>,
}

impl Ypf {
    pub fn parse(buf: &[u8], codec: Codec, ovr: YpfOverrides) -> Result<Ypf> {
        let mut r = Reader::new(buf, codec);
        let ver = read_header(&mut r, "YPF\0")?;
        let nent = r.u32()?;
        let lhdr = r.u32()?;
        if r.read(16)?.iter().any(|&b| b != 0) {
            return Err(Error::layout("YPF: nonzero reserved header bytes"));
        }
        let size_trans = ovr.name_size_trans.unwrap_or_else(|| name_size_trans(ver));
        let byte_trans = ovr.name_byte_trans.unwrap_or_else(|| name_byte_trans(ver));
        let (hash_name, hash_file) = ovr.hashes.unwrap_or_else(|| HashKind::defaults_for(ver));
        // Before 300 the directory length excluded the 32-byte header.
        let dir_end = if ver >= 300 { lhdr as usize } else { lhdr as usize + 32 };

        let mut entries = Vec::with_capacity(nent as usize);
        for _ in 0..nent {
            let name_hash = r.u32()?;
            let enc_len = r.byte()?;
            let name_len = size_trans[(enc_len ^ 0xff) as usize] as usize;
            let at = r.pos();
            let name_bytes: Vec<u8> =
                r.read(name_len)?.iter().map(|&b| byte_trans[b as usize]).collect();
            if let Some(actual) = hash_name.verify(&name_bytes, name_hash) {
                return Err(Error::HashMismatch {
                    kind: "name",
                    name: codec.decode(&name_bytes).into_owned(),
                    expected: name_hash,
                    actual,
                });
            }
            let name = codec
                .decode_strict(&name_bytes)
                .map_err(|_| Error::Decode { at })?
                .into_owned();
            let _kind = r.byte()?;
            let compressed = r.byte()? != 0;
            let raw_size = r.u32()?;
            let stored_size = r.u32()?;
            let offset = if ver >= 470 { r.u64()? } else { r.u32()? as u64 };
            let hash = r.u32()?;
            entries.push(RawEntry { name, compressed, raw_size, stored_size, offset, hash });
        }
        if r.pos() != dir_end {
            return Err(Error::layout(format!(
                "YPF: directory ends at {}, header declares {dir_end}",
                r.pos()
            )));
        }

        let mut files = Vec::with_capacity(entries.len());
        for e in entries {
            let beg = e.offset as usize;
            let end = beg + e.stored_size as usize;
            if end > buf.len() {
                return Err(Error::TruncatedRead {
                    at: beg,
                    want: e.stored_size as usize,
                    left: buf.len().saturating_sub(beg),
                });
            }
            let data = &buf[beg..end];
            if let Some(actual) = hash_file.verify(data, e.hash) {
                return Err(Error::HashMismatch {
                    kind: "file",
                    name: e.name,
                    expected: e.hash,
                    actual,
                });
            }
            let out = if e.compressed {
                let mut v = Vec::with_capacity(e.raw_size as usize);
                ZlibDecoder::new(data)
                    .read_to_end(&mut v)
                    .map_err(|err| Error::layout(format!("YPF: decompress {}: {err}", e.name)))?;
                if v.len() != e.raw_size as usize {
                    return Err(Error::layout(format!(
                        "YPF: {} decompressed to {} bytes, directory says {}",
                        e.name,
                        v.len(),
                        e.raw_size
                    )));
                }
                v
            } else {
                data.to_vec()
            };
            debug!("ypf entry {} ({} bytes)", e.name, out.len());
            files.push((e.name, out));
        }
        Ok(Ypf { ver, files })
    }
}

#[cfg(test)]
mod tests {
    use flate2::read::ZlibEncoder;
    use flate2::Compression;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn swap_tables_are_permutations() {
        for ver in [265u32, 500] {
            let t = name_size_trans(ver);
            let mut seen = [false; 256];
            for &b in t.iter() {
                assert!(!seen[b as usize]);
                seen[b as usize] = true;
            }
        }
        // the moved pairs differ between generations
        assert_eq!(name_size_trans(265)[3], 72);
        assert_eq!(name_size_trans(500)[3], 10);
    }

    #[test]
    fn name_byte_tables_complement() {
        assert_eq!(name_byte_trans(265)[0x41], 0xBE);
        assert_eq!(name_byte_trans(290)[0x41], 0xBE ^ 0x40);
        assert_eq!(name_byte_trans(500)[0x41], 0xBE ^ 0x36);
    }

    #[test]
    fn hash_kinds_verify() {
        let data = b"hello ypf";
        for kind in [HashKind::Crc32, HashKind::Adler32, HashKind::Murmur2] {
            let actual = kind.verify(data, 0).expect("0 is not the hash of this buffer");
            assert_eq!(kind.verify(data, actual), None);
        }
        assert_eq!(HashKind::None.verify(data, 0), None);
    }

    fn build_archive(ver: u32, name: &str, data: &[u8], compress: bool) -> Vec<u8> {
        let (hash_name, hash_file) = HashKind::defaults_for(ver);
        let stored: Vec<u8> = if compress {
            let mut v = Vec::new();
            ZlibEncoder::new(data, Compression::default()).read_to_end(&mut v).unwrap();
            v
        } else {
            data.to_vec()
        };
        // invert the byte substitution (it is an involution)
        let byte_trans = name_byte_trans(ver);
        let enc_name: Vec<u8> = name.bytes().map(|b| byte_trans[b as usize]).collect();
        let size_trans = name_size_trans(ver);
        let enc_len = size_trans
            .iter()
            .position(|&v| v as usize == name.len())
            .unwrap() as u8
            ^ 0xff;
        let off_size = if ver >= 470 { 8 } else { 4 };
        let ent_size = 4 + 1 + name.len() + 2 + 4 + 4 + off_size + 4;
        let dir_end = 32 + ent_size;
        let offset = dir_end as u64;

        let mut buf = b"YPF\0".to_vec();
        buf.extend_from_slice(&ver.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        let lhdr = if ver >= 300 { dir_end as u32 } else { dir_end as u32 - 32 };
        buf.extend_from_slice(&lhdr.to_le_bytes());
        buf.extend_from_slice(&[0u8; 16]);

        let name_hash = match hash_name.verify(name.as_bytes(), 0) {
            Some(actual) => actual,
            None => 0,
        };
        buf.extend_from_slice(&name_hash.to_le_bytes());
        buf.push(enc_len);
        buf.extend_from_slice(&enc_name);
        buf.push(0); // kind
        buf.push(compress as u8);
        buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(stored.len() as u32).to_le_bytes());
        if ver >= 470 {
            buf.extend_from_slice(&offset.to_le_bytes());
        } else {
            buf.extend_from_slice(&(offset as u32).to_le_bytes());
        }
        let file_hash = match hash_file.verify(&stored, 0) {
            Some(actual) => actual,
            None => 0,
        };
        buf.extend_from_slice(&file_hash.to_le_bytes());
        buf.extend_from_slice(&stored);
        buf
    }

    #[test]
    fn extracts_stored_and_compressed_entries() {
        for ver in [264u32, 300, 480] {
            for compress in [false, true] {
                let payload = b"YSTB payload bytes / YSTB payload bytes";
                let buf = build_archive(ver, "data\\a.ybn", payload, compress);
                let y = Ypf::parse(&buf, Codec::default(), YpfOverrides::default()).unwrap();
                assert_eq!(y.files.len(), 1, "ver={ver} compress={compress}");
                assert_eq!(y.files[0].0, "data\\a.ybn");
                assert_eq!(y.files[0].1, payload);
            }
        }
    }

    #[test]
    fn corrupted_file_hash_is_fatal() {
        let mut buf = build_archive(480, "a.ybn", b"payload-payload", false);
        let n = buf.len();
        buf[n - 1] ^= 0xFF;
        match Ypf::parse(&buf, Codec::default(), YpfOverrides::default()) {
            Err(Error::HashMismatch { kind: "file", .. }) => {}
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn hash_overrides_disable_verification() {
        let mut buf = build_archive(480, "a.ybn", b"payload-payload", false);
        let n = buf.len();
        buf[n - 1] ^= 0xFF;
        let ovr = YpfOverrides {
            hashes: Some((HashKind::None, HashKind::None)),
            ..Default::default()
        };
        let y = Ypf::parse(&buf, Codec::default(), ovr).unwrap();
        assert_eq!(y.files[0].1.last(), Some(&(b'd' ^ 0xFF)));
    }
}
