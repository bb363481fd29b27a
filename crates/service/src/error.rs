use std::fmt;

/// Errors surfaced by the room runtime.
///
/// Admission errors (`UnknownRoom` .. `Duplicate`) close the connection before any room mutation.
/// `Malformed` and `TooLarge` close the offending session. `Transport` closes the session whose I/O
/// produced it. `ServiceError` is logged but does not by itself close anything.
#[derive(Debug)]
pub enum Error {
    Malformed,
    TooLarge,
    UnknownRoom,
    WrongApp,
    WrongVersion,
    WrongPassword,
    WrongToken,
    Full,
    Duplicate,
    Exhausted,
    Transport(std::io::Error),
    ServiceError(anyhow::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "frame too short for its layout"),
            Self::TooLarge => write!(f, "outbound frame exceeds the maximum payload size"),
            Self::UnknownRoom => write!(f, "no room with that id"),
            Self::WrongApp => write!(f, "application name does not match the room"),
            Self::WrongVersion => write!(f, "version does not match the room"),
            Self::WrongPassword => write!(f, "password does not match the room"),
            Self::WrongToken => write!(f, "creator token does not match the room"),
            Self::Full => write!(f, "room is at capacity"),
            Self::Duplicate => write!(f, "id already in use"),
            Self::Exhausted => write!(f, "id allocator has no free ids"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::ServiceError(e) => write!(f, "service hook error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::ServiceError(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<codec::Error> for Error {
    fn from(e: codec::Error) -> Self {
        match e {
            codec::Error::Malformed => Self::Malformed,
            codec::Error::TooLarge => Self::TooLarge,
            codec::Error::UnknownDiscriminant(_) => Self::Malformed,
        }
    }
}
