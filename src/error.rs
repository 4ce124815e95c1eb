use std::io;

use thiserror::Error;


/// LDAP result codes this crate produces or inspects itself.
pub mod result_code {
    pub const SUCCESS: u32 = 0;
    pub const SIZE_LIMIT_EXCEEDED: u32 = 4;
    pub const NO_SUCH_ATTRIBUTE: u32 = 16;
    pub const ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;
    pub const NO_SUCH_OBJECT: u32 = 32;
    pub const INVALID_DN_SYNTAX: u32 = 34;
    pub const INVALID_CREDENTIALS: u32 = 49;
    pub const NOT_ALLOWED_ON_NON_LEAF: u32 = 66;
    pub const ENTRY_ALREADY_EXISTS: u32 = 68;
}


#[derive(Debug, Error)]
pub enum Error {
    #[error("LDAP client error: {0}")]
    Ldap(#[from] ldap3::LdapError),

    #[error("directory rejected the operation (result code {code}): {text}")]
    Rejected { code: u32, text: String },

    #[error("no entry found at {0:?}")]
    NoSuchEntry(String),

    #[error("{0:?} is not a valid GUID: {1}")]
    InvalidGuid(String, #[source] uuid::Error),

    #[error("{0:?} is not a valid distinguished name")]
    InvalidDn(String),

    #[error("invalid search filter {0:?}")]
    InvalidFilter(String),

    #[error("write operations require an authenticated connection")]
    NotAuthenticated,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),
}
impl Error {
    pub(crate) fn rejected<T: Into<String>>(code: u32, text: T) -> Self {
        Self::Rejected { code, text: text.into() }
    }

    /// The LDAP result code, if the directory answered with one.
    pub fn result_code(&self) -> Option<u32> {
        match self {
            Self::Rejected { code, .. } => Some(*code),
            Self::Ldap(ldap3::LdapError::LdapResult { result }) => Some(result.rc),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;


/// Turns a non-success `LdapResult` into [`Error::Rejected`].
pub(crate) fn check(result: ldap3::LdapResult) -> Result<ldap3::LdapResult> {
    if result.rc == result_code::SUCCESS {
        Ok(result)
    } else {
        Err(Error::rejected(result.rc, result.text))
    }
}


#[cfg(test)]
mod tests {
    use super::{result_code, Error};

    #[test]
    fn test_result_code() {
        let err = Error::rejected(result_code::NO_SUCH_OBJECT, "gone");
        assert_eq!(err.result_code(), Some(32));
        assert_eq!(err.to_string(), "directory rejected the operation (result code 32): gone");

        assert_eq!(Error::NotAuthenticated.result_code(), None);
    }
}
