use std::{error, fmt};

/// An error from the engine itself: unreadable configuration, bad filters,
/// or broken bookkeeping. Test failures are never reported through this
/// type; they are recorded into results instead.
pub struct TickError(pub String);

impl fmt::Debug for TickError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl error::Error for TickError {}

impl From<std::io::Error> for TickError {
    fn from(err: std::io::Error) -> Self {
        TickError(err.to_string())
    }
}

impl From<toml::de::Error> for TickError {
    fn from(err: toml::de::Error) -> Self {
        TickError(err.to_string())
    }
}

impl From<regex::Error> for TickError {
    fn from(err: regex::Error) -> Self {
        TickError(err.to_string())
    }
}
