use thiserror::Error;

#[derive(Error, Debug)]
pub enum CandidateReadError {
    #[error("The file ended part way through the {section} of block {block}")]
    Truncated { block: usize, section: &'static str },

    #[error("Block {block} has an invalid header: {field} = {value}")]
    BadHeader {
        block: usize,
        field: &'static str,
        value: i32,
    },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

impl CandidateReadError {
    /// Turn an unexpected EOF into a [`CandidateReadError::Truncated`]; other
    /// IO errors pass through.
    pub(super) fn from_io(e: std::io::Error, block: usize, section: &'static str) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::Truncated { block, section },
            _ => Self::IO(e),
        }
    }
}
