use byteorder::{ByteOrder, LittleEndian};
use yuris_nls::Codec;

use crate::error::{Error, Result};

/// Cursor over an in-memory byte buffer.
///
/// All integer reads are little-endian. Reading past the end of the buffer
/// is a hard error (`TruncatedRead`), never a short read.
pub struct Reader<'a> {
    buf: &'a [u8],
    idx: usize,
    codec: Codec,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8], codec: Codec) -> Self {
        Self { buf, idx: 0, codec }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.idx
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.idx
    }

    #[inline]
    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn read(&mut self, n: usize) -> Result<&'a [u8]> {
        let left = self.remaining();
        if n > left {
            return Err(Error::TruncatedRead {
                at: self.idx,
                want: n,
                left,
            });
        }
        let ret = &self.buf[self.idx..self.idx + n];
        self.idx += n;
        Ok(ret)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read(n).map(|_| ())
    }

    pub fn byte(&mut self) -> Result<u8> {
        Ok(self.read(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read(2)?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read(4)?))
    }

    pub fn u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read(8)?))
    }

    pub fn i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read(4)?))
    }

    pub fn i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.read(8)?))
    }

    pub fn f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.read(8)?))
    }

    /// Signed little-endian integer of `width` bytes (1..=8), sign-extended.
    pub fn sint(&mut self, width: usize) -> Result<i64> {
        debug_assert!((1..=8).contains(&width));
        let bytes = self.read(width)?;
        let v = LittleEndian::read_uint(bytes, width);
        let shift = 64 - 8 * width as u32;
        Ok(((v << shift) as i64) >> shift)
    }

    /// Bytes up to (not including) the next NUL; the cursor advances past it.
    pub fn bz(&mut self) -> Result<&'a [u8]> {
        let beg = self.idx;
        match self.buf[beg..].iter().position(|&b| b == 0) {
            Some(n) => {
                self.idx = beg + n + 1;
                Ok(&self.buf[beg..beg + n])
            }
            None => Err(Error::TruncatedRead {
                at: beg,
                want: 1,
                left: 0,
            }),
        }
    }

    /// NUL-terminated string, decoded strictly through the codec.
    pub fn sz(&mut self) -> Result<String> {
        let at = self.idx;
        let bytes = self.bz()?;
        self.decode(bytes, at)
    }

    /// `n` bytes decoded strictly through the codec.
    pub fn str(&mut self, n: usize) -> Result<String> {
        let at = self.idx;
        let bytes = self.read(n)?;
        self.decode(bytes, at)
    }

    fn decode(&self, bytes: &[u8], at: usize) -> Result<String> {
        self.codec
            .decode_strict(bytes)
            .map(|c| c.into_owned())
            .map_err(|_| Error::Decode { at })
    }

    /// Parsing a container must consume the whole buffer.
    pub fn assert_eof(&self, ver: u32) -> Result<()> {
        if self.idx != self.buf.len() {
            return Err(Error::IncompleteParse {
                idx: self.idx,
                len: self.buf.len(),
                ver,
            });
        }
        Ok(())
    }
}
