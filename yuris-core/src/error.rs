pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every way a decompilation can fail.
///
/// All of these are fatal: a structural deviation means the input is
/// corrupt or from an unsupported engine build, and no output is produced.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("bad magic: expected {expected:?}, found {found:02x?}")]
    BadMagic {
        expected: &'static str,
        found: [u8; 4],
    },

    #[error("unsupported engine version {ver} (supported: {}..{})", crate::VER_MIN, crate::VER_MAX)]
    UnsupportedVersion { ver: u32 },

    #[error("truncated read: want {want} bytes at offset {at}, {left} left")]
    TruncatedRead { at: usize, want: usize, left: usize },

    #[error("container not fully consumed: idx={idx}, len={len}, ver={ver}")]
    IncompleteParse { idx: usize, len: usize, ver: u32 },

    #[error("{kind} hash mismatch for {name:?}: expected {expected:08x}, actual {actual:08x}")]
    HashMismatch {
        kind: &'static str,
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("vocabulary mismatch: {0}")]
    VocabularyMismatch(String),

    #[error("local variable #{idx} redefined (already named {name})")]
    RedefinedLocal { idx: u32, name: String },

    #[error("variable {name}: reference qualifier {want} disagrees with declared type {have}")]
    TypeMismatch {
        name: String,
        want: String,
        have: String,
    },

    #[error("unknown opcode 0x{code:02x} at offset {at}")]
    UnknownOpcode { code: u8, at: usize },

    #[error("expression stack underflow at instruction {at}")]
    StackUnderflow { at: usize },

    #[error("expression did not reduce to a single tree ({depth} items left)")]
    NonSingleton { depth: usize },

    #[error("line numbers decreased: {prev} then {lno} at command {cmd}")]
    LineOrder { prev: u32, lno: u32, cmd: usize },

    #[error("labels not consumed after script emission: {names:?}")]
    LabelsUnconsumed { names: Vec<String> },

    #[error("undecodable text at offset {at}")]
    Decode { at: usize },

    #[error("{0}")]
    Layout(String),
}

impl Error {
    /// Shorthand for the residual structural checks that have no dedicated kind.
    pub(crate) fn layout(msg: impl Into<String>) -> Error {
        Error::Layout(msg.into())
    }
}
