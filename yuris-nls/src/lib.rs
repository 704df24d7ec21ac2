use std::borrow::Cow;
use std::str::FromStr;

use encoding_rs::{Encoding as RsEncoding, GB18030, SHIFT_JIS, UTF_8};

/// Character set of a script project.
///
/// YU-RIS games almost universally ship cp932 assets; encoding_rs models
/// cp932 as its SHIFT_JIS (windows-31j) instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Cp932,
    Utf8,
    /// Treat GBK as GB18030 (superset); robust for CN fan-translated assets.
    Gbk,
}

impl Encoding {
    #[inline]
    pub fn as_encoding_rs(self) -> &'static RsEncoding {
        match self {
            Encoding::Cp932 => SHIFT_JIS,
            Encoding::Utf8 => UTF_8,
            Encoding::Gbk => GB18030,
        }
    }
}

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cp932" | "sjis" | "shift-jis" | "shift_jis" => Ok(Encoding::Cp932),
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "gbk" | "gb18030" => Ok(Encoding::Gbk),
            _ => Err(UnknownEncoding(s.to_string())),
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("unknown encoding name: {0}")]
pub struct UnknownEncoding(pub String);

#[derive(thiserror::Error, Debug)]
#[error("byte sequence is not valid {encoding:?} text")]
pub struct DecodeError {
    pub encoding: Encoding,
}

/// A codec bound to one encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    enc: Encoding,
}

impl Codec {
    #[inline]
    pub fn new(enc: Encoding) -> Self {
        Self { enc }
    }

    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.enc
    }

    /// Lossy decode: undecodable sequences become replacement characters.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let (cow, _, _) = self.enc.as_encoding_rs().decode(bytes);
        cow
    }

    /// Strict decode: any undecodable sequence is an error.
    ///
    /// Container parsing treats text as structural, so a broken byte
    /// sequence means a corrupt or mis-declared input, not mojibake to
    /// paper over.
    pub fn decode_strict<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>, DecodeError> {
        let (cow, had_errors) = self
            .enc
            .as_encoding_rs()
            .decode_without_bom_handling(bytes);
        if had_errors {
            return Err(DecodeError { encoding: self.enc });
        }
        Ok(cow)
    }

    /// Encode a Rust string. Best effort: unrepresentable chars are
    /// replaced with numeric references, matching encoding_rs defaults.
    pub fn encode<'a>(&self, s: &'a str) -> Cow<'a, [u8]> {
        let (cow, _, _) = self.enc.as_encoding_rs().encode(s);
        cow
    }

    pub fn encode_owned(&self, s: &str) -> Vec<u8> {
        self.encode(s).into_owned()
    }
}
