use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;


#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Ldap,
    Ldaps,
}
impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Ldap => "ldap",
            Self::Ldaps => "ldaps",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Ldap => 389,
            Self::Ldaps => 636,
        }
    }
}


#[derive(Clone, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Credentials {
    pub bind_dn: String,
    pub password: String,
}
impl Credentials {
    pub fn new<D: Into<String>, P: Into<String>>(bind_dn: D, password: P) -> Self {
        Self {
            bind_dn: bind_dn.into(),
            password: password.into(),
        }
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let credentials_string = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&credentials_string)?)
    }
}
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bind_dn", &self.bind_dn)
            .field("password", &"<redacted>")
            .finish()
    }
}


/// Where and how to connect.
///
/// Can be deserialized, e.g. from TOML:
///
/// ```toml
/// server = "ldap.example.com"
/// protocol = "ldaps"
/// search_base = "ou=users,dc=example,dc=com"
///
/// [credentials]
/// bind_dn = "cn=admin,dc=example,dc=com"
/// password = "secret"
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConnectOptions {
    pub server: String,

    #[serde(default)]
    pub protocol: Protocol,

    /// Defaults to the protocol's well-known port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Verify the server's TLS certificate.
    #[serde(default = "default_verify")]
    pub verify: bool,

    /// Root of all searches.
    #[serde(default)]
    pub search_base: String,

    /// Bind with these; connect anonymously without.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

fn default_verify() -> bool { true }

impl ConnectOptions {
    pub fn new<S: Into<String>>(server: S) -> Self {
        Self {
            server: server.into(),
            protocol: Protocol::default(),
            port: None,
            verify: default_verify(),
            search_base: String::new(),
            credentials: None,
        }
    }

    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn search_base<B: Into<String>>(mut self, search_base: B) -> Self {
        self.search_base = search_base.into();
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.server, self.effective_port())
    }

    pub fn from_toml_str(toml_string: &str) -> Result<Self> {
        Ok(toml::from_str(toml_string)?)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let toml_string = std::fs::read_to_string(path)?;
        Self::from_toml_str(&toml_string)
    }
}
