use async_trait::async_trait;
use ldap3::Scope;

use crate::attributes::{AttributeMap, Value};
use crate::error::Result;


/// An entry exactly as a directory returned it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: AttributeMap,
}
impl DirectoryEntry {
    pub fn new<D: Into<String>>(dn: D, attributes: AttributeMap) -> Self {
        Self {
            dn: dn.into(),
            attributes,
        }
    }
}


/// One change within a modify request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Modification {
    /// Adds the values to the attribute.
    Add(String, Vec<Value>),

    /// Removes the values from the attribute, or the whole attribute if no values are given.
    Delete(String, Vec<Value>),

    /// Replaces all values of the attribute; no values removes it.
    Replace(String, Vec<Value>),
}
impl Modification {
    pub fn attribute(&self) -> &str {
        match self {
            Self::Add(a, _) => a,
            Self::Delete(a, _) => a,
            Self::Replace(a, _) => a,
        }
    }
}


/// The requests a directory session has to answer.
#[async_trait]
pub trait Directory {
    /// Binds this session with the given credentials.
    async fn simple_bind(&mut self, bind_dn: &str, password: &str) -> Result<()>;

    /// Checks the credentials without touching the state of this session.
    async fn check_credentials(&mut self, bind_dn: &str, password: &str) -> Result<()>;

    /// Searches; a `size_limit` of 0 means unlimited.
    ///
    /// Results without a distinguished name (continuation references) are not returned.
    async fn search(
        &mut self,
        base_dn: &str,
        scope: Scope,
        filter: &str,
        attribute_names: &[&str],
        size_limit: i32,
    ) -> Result<Vec<DirectoryEntry>>;

    async fn add(&mut self, dn: &str, attributes: AttributeMap) -> Result<()>;

    async fn modify(&mut self, dn: &str, modifications: Vec<Modification>) -> Result<()>;

    async fn delete(&mut self, dn: &str) -> Result<()>;

    async fn unbind(&mut self) -> Result<()>;
}
