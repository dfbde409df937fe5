use std::fmt::{Display, Formatter};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Resolution Error: {0}")]
    Resolve(std::io::Error),
    #[error("Connection Error: {0}")]
    Connect(std::io::Error),
    #[error("Write Error: {0}")]
    Write(std::io::Error),
    #[error("Read Error: {0}")]
    Read(std::io::Error),
    #[error("Invalid Response: {0}")]
    InvalidResponse(String),
    #[error("Operation Aborted")]
    Aborted,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    Resolve,
    Connect,
    Write,
    Read,
    InvalidResponse,
    Aborted,
}

impl Error {
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolve(_) => ErrorKind::Resolve,
            Self::Connect(_) => ErrorKind::Connect,
            Self::Write(_) => ErrorKind::Write,
            Self::Read(_) => ErrorKind::Read,
            Self::InvalidResponse(_) => ErrorKind::InvalidResponse,
            Self::Aborted => ErrorKind::Aborted,
        }
    }
}

impl Display for ErrorKind {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Resolve => "resolve",
            Self::Connect => "connect",
            Self::Write => "write",
            Self::Read => "read",
            Self::InvalidResponse => "invalid-response",
            Self::Aborted => "aborted",
        })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Final result of a pipeline. `Ok(())` means the body was read to the end.
pub type Outcome = Result<()>;
