use std::fmt;

use tracing::warn;
use uuid::Uuid;

use crate::attributes::{AttributeMap, Value};
use crate::connection::Connection;
use crate::directory::{Directory, DirectoryEntry};
use crate::error::Result;
use crate::ldif::to_ldif;


const GUID_ATTRIBUTE: &str = "objectGUID";

/// Values longer than this (in characters) are shown as `binary` when pretty-printing.
const MAX_PRINTABLE_LENGTH: usize = 80;


/// A snapshot of one directory entry, taken when it was fetched.
///
/// The mutating methods write through to the directory, using the entry's own DN, and
/// then update the snapshot to match. Nothing else is re-fetched, so attributes the
/// server computes in response are not reflected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    dn: String,
    attrs: AttributeMap,
    guid: Option<Uuid>,
}
impl Entry {
    pub fn new<D: Into<String>>(dn: D, attrs: AttributeMap) -> Self {
        let dn = dn.into();
        let guid = attrs.first(GUID_ATTRIBUTE)
            .and_then(|raw| match Uuid::from_slice(raw.as_bytes()) {
                Ok(guid) => Some(guid),
                Err(e) => {
                    warn!(dn = %dn, error = %e, "ignoring malformed objectGUID");
                    None
                },
            });
        Self {
            dn,
            attrs,
            guid,
        }
    }

    pub fn dn(&self) -> &str { &self.dn }

    pub fn attrs(&self) -> &AttributeMap { &self.attrs }

    /// All values of an attribute, looked up ignoring case; empty if unset.
    pub fn get(&self, attr: &str) -> &[Value] { self.attrs.get(attr) }

    pub fn first(&self, attr: &str) -> Option<&Value> { self.attrs.first(attr) }

    /// The entry's `objectGUID`, if it has a well-formed one.
    pub fn guid(&self) -> Option<Uuid> { self.guid }

    pub fn to_ldif(&self) -> String {
        to_ldif(&self.dn, &self.attrs)
    }

    /// The attribute name as the entry spells it, or as given if the entry lacks it.
    fn cased(&self, attr: &str) -> String {
        self.attrs.stored_name(attr)
            .unwrap_or(attr)
            .to_owned()
    }

    /// Replaces all values of `attr` with `value`.
    pub async fn set_value<D: Directory, V: Into<Value>>(&mut self, conn: &mut Connection<D>, attr: &str, value: V) -> Result<()> {
        let attr = self.cased(attr);
        let value = value.into();
        conn.set_value(&self.dn, &attr, value.clone()).await?;
        self.attrs.insert(attr, vec![value]);
        self.refresh_guid();
        Ok(())
    }

    /// Adds `value` to the values of `attr`.
    pub async fn add_value<D: Directory, V: Into<Value>>(&mut self, conn: &mut Connection<D>, attr: &str, value: V) -> Result<()> {
        let attr = self.cased(attr);
        let value = value.into();
        conn.add_value(&self.dn, &attr, value.clone()).await?;
        self.attrs.push(attr, value);
        self.refresh_guid();
        Ok(())
    }

    /// Removes `value` from the values of `attr`, leaving the others in place.
    pub async fn remove_value<D: Directory, V: Into<Value>>(&mut self, conn: &mut Connection<D>, attr: &str, value: V) -> Result<()> {
        let attr = self.cased(attr);
        let value = value.into();
        conn.delete_value(&self.dn, &attr, value.clone()).await?;
        self.attrs.remove_value(&attr, &value);
        self.refresh_guid();
        Ok(())
    }

    fn refresh_guid(&mut self) {
        self.guid = self.attrs.first(GUID_ATTRIBUTE)
            .and_then(|raw| Uuid::from_slice(raw.as_bytes()).ok());
    }
}
impl From<DirectoryEntry> for Entry {
    fn from(value: DirectoryEntry) -> Self {
        Self::new(value.dn, value.attributes)
    }
}
impl fmt::Display for Entry {
    /// One line per value, the name column padded to the longest attribute name.
    ///
    /// Only the first line of a multi-valued attribute carries its name. Attributes whose
    /// first value is long or not text are shown as a single `binary` line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.attrs
            .names()
            .map(|name| name.chars().count())
            .max()
            .unwrap_or(0);
        writeln!(f, "{:width$} : {}", "dn", self.dn, width = width)?;
        for (name, values) in self.attrs.iter() {
            let looks_binary = values.first()
                .map(|v| match v.as_str() {
                    Some(s) => s.chars().count() > MAX_PRINTABLE_LENGTH,
                    None => true,
                })
                .unwrap_or(false);

            let mut label = name;
            if looks_binary {
                writeln!(f, "{:width$} : binary", label, width = width)?;
                continue;
            }
            for value in values {
                writeln!(f, "{:width$} : {}", label, value, width = width)?;
                label = "";
            }
        }
        Ok(())
    }
}
