use std::fmt;

use ldap3::Scope;
use tracing::{debug, info};

use crate::attributes::{AttributeMap, Value};
use crate::directory::{Directory, Modification};
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::filter::{guid_filter, simple_filter};


const ACTIVE_DIRECTORY_CAPABILITY: &str = "1.2.840.113556.1.4.800";
const ROOT_DSE_ATTRIBUTES: [&str; 3] = ["objectClass", "vendorName", "supportedCapabilities"];


/// Directory server products recognized from the root DSE.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ServerType {
    EDirectory,
    ActiveDirectory,
    ApacheDs,
    OpenLdap,
    Unknown,
}
impl ServerType {
    /// Fingerprints the server from its root DSE attributes.
    pub fn from_root_dse(root_dse: &AttributeMap) -> Self {
        let vendor_name = root_dse.get("vendorName");
        if vendor_name == ["Novell, Inc."] {
            Self::EDirectory
        } else if root_dse.get("supportedCapabilities").iter().any(|c| c == ACTIVE_DIRECTORY_CAPABILITY) {
            Self::ActiveDirectory
        } else if vendor_name == ["Apache Software Foundation"] {
            Self::ApacheDs
        } else if root_dse.get("objectClass").iter().any(|c| c == "OpenLDAProotDSE") {
            Self::OpenLdap
        } else {
            Self::Unknown
        }
    }
}
impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EDirectory => "eDirectory",
            Self::ActiveDirectory => "Active Directory",
            Self::ApacheDs => "Apache DS",
            Self::OpenLdap => "OpenLDAP",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}


/// A session to a directory, with searches rooted at a base DN.
///
/// Write operations are only available once the session is bound with credentials.
/// The handle must be closed explicitly with [`Connection::close`].
#[derive(Debug)]
pub struct Connection<D: Directory> {
    directory: D,
    search_base: String,
    authenticated: bool,
}
impl<D: Directory> Connection<D> {
    /// Wraps an anonymous session.
    pub fn new<B: Into<String>>(directory: D, search_base: B) -> Self {
        Self {
            directory,
            search_base: search_base.into(),
            authenticated: false,
        }
    }

    /// Binds the session with the given credentials and wraps it.
    pub async fn bind<B: Into<String>>(mut directory: D, search_base: B, bind_dn: &str, password: &str) -> Result<Self> {
        directory.simple_bind(bind_dn, password).await?;
        Ok(Self {
            directory,
            search_base: search_base.into(),
            authenticated: true,
        })
    }

    pub fn search_base(&self) -> &str { &self.search_base }

    pub fn is_authenticated(&self) -> bool { self.authenticated }

    pub fn directory(&self) -> &D { &self.directory }

    async fn search_raw(&mut self, filter: &str, size_limit: i32) -> Result<Vec<Entry>> {
        let entries = self.directory
            .search(&self.search_base, Scope::Subtree, filter, &[], size_limit)
            .await?;
        Ok(entries.into_iter().map(Entry::from).collect())
    }

    /// All entries below the base DN matching a bare `attr=value` assertion.
    ///
    /// Filter metacharacters in the assertion are escaped, so it is matched literally.
    pub async fn search(&mut self, filter: &str) -> Result<Vec<Entry>> {
        self.search_raw(&simple_filter(filter), 0).await
    }

    /// All entries below the base DN whose `objectGUID` is the given GUID.
    pub async fn search_by_guid(&mut self, guid: &str) -> Result<Vec<Entry>> {
        let filter = guid_filter(guid)?;
        self.search_raw(&filter, 0).await
    }

    /// The first entry matching the assertion, if any.
    pub async fn get(&mut self, filter: &str) -> Result<Option<Entry>> {
        let entries = self.search_raw(&simple_filter(filter), 1).await?;
        Ok(entries.into_iter().next())
    }

    /// The entry at exactly this DN.
    pub async fn get_by_dn(&mut self, dn: &str) -> Result<Entry> {
        let entries = self.directory
            .search(dn, Scope::Base, "(objectClass=*)", &[], 0)
            .await?;
        entries.into_iter()
            .next()
            .map(Entry::from)
            .ok_or_else(|| Error::NoSuchEntry(dn.to_owned()))
    }

    /// The DNs of all entries matching the assertion.
    pub async fn get_dn(&mut self, filter: &str) -> Result<Vec<String>> {
        let entries = self.search(filter).await?;
        Ok(entries.into_iter().map(|e| e.dn().to_owned()).collect())
    }

    pub async fn get_values(&mut self, dn: &str, attr: &str) -> Result<Vec<Value>> {
        let entry = self.get_by_dn(dn).await?;
        Ok(entry.get(attr).to_vec())
    }

    pub async fn get_value(&mut self, dn: &str, attr: &str) -> Result<Option<Value>> {
        let values = self.get_values(dn, attr).await?;
        Ok(values.into_iter().next())
    }

    /// Whether the credentials are accepted, checked on a separate session.
    ///
    /// Any failure, not only rejected credentials, counts as `false`. An empty password
    /// is always `false`, as servers accept it as an unauthenticated bind.
    pub async fn verify_password(&mut self, dn: &str, password: &str) -> bool {
        if password.is_empty() {
            debug!(dn = %dn, "refusing to verify an empty password");
            return false;
        }
        match self.directory.check_credentials(dn, password).await {
            Ok(()) => true,
            Err(e) => {
                debug!(dn = %dn, error = %e, "password verification failed");
                false
            },
        }
    }

    /// Which directory server product this is.
    pub async fn server_type(&mut self) -> Result<ServerType> {
        let entries = self.directory
            .search("", Scope::Base, "(objectClass=*)", &ROOT_DSE_ATTRIBUTES, 0)
            .await?;
        let Some(root_dse) = entries.into_iter().next() else {
            debug!("no root DSE returned");
            return Ok(ServerType::Unknown);
        };
        Ok(ServerType::from_root_dse(&root_dse.attributes))
    }

    /// Unbinds and releases the session.
    pub async fn close(mut self) -> Result<()> {
        self.directory.unbind().await?;
        info!(search_base = %self.search_base, "connection closed");
        Ok(())
    }

    fn require_authenticated(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(Error::NotAuthenticated)
        }
    }

    pub async fn add(&mut self, dn: &str, attrs: AttributeMap) -> Result<()> {
        self.require_authenticated()?;
        self.directory.add(dn, attrs).await
    }

    pub async fn modify(&mut self, dn: &str, modifications: Vec<Modification>) -> Result<()> {
        self.require_authenticated()?;
        self.directory.modify(dn, modifications).await
    }

    /// Replaces all values of the attribute with `value`.
    pub async fn set_value<V: Into<Value>>(&mut self, dn: &str, attr: &str, value: V) -> Result<()> {
        self.modify(dn, vec![Modification::Replace(attr.to_owned(), vec![value.into()])]).await
    }

    pub async fn add_value<V: Into<Value>>(&mut self, dn: &str, attr: &str, value: V) -> Result<()> {
        self.modify(dn, vec![Modification::Add(attr.to_owned(), vec![value.into()])]).await
    }

    pub async fn delete_value<V: Into<Value>>(&mut self, dn: &str, attr: &str, value: V) -> Result<()> {
        self.modify(dn, vec![Modification::Delete(attr.to_owned(), vec![value.into()])]).await
    }

    pub async fn delete(&mut self, dn: &str) -> Result<()> {
        self.require_authenticated()?;
        self.directory.delete(dn).await
    }
}
