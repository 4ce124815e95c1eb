//! A directory held entirely in memory.
//!
//! Answers the same requests as a server would, with the same result codes, which makes
//! it suitable for working offline on an LDIF export and for exercising code written
//! against [`Directory`].

use async_trait::async_trait;
use ldap3::Scope;
use tracing::debug;

use crate::attributes::{AttributeMap, Value};
use crate::directory::{Directory, DirectoryEntry, Modification};
use crate::dn::{is_within, normalized_rdns, Rdn};
use crate::error::{result_code, Error, Result};
use crate::filter::Filter;
use crate::ldif::parse_ldif;


const PASSWORD_ATTRIBUTE: &str = "userPassword";


#[derive(Clone, Debug, Eq, PartialEq)]
struct StoredEntry {
    rdns: Vec<Rdn>,
    entry: DirectoryEntry,
}


#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MemoryDirectory {
    entries: Vec<StoredEntry>,
    root_dse: Option<AttributeMap>,
    bound_dn: Option<String>,
}
impl MemoryDirectory {
    pub fn new() -> Self { Self::default() }

    /// Loads all records of an LDIF document, in order.
    pub fn from_ldif(ldif: &str) -> Result<Self> {
        let mut directory = Self::new();
        for record in parse_ldif(ldif) {
            if record.dn.is_empty() {
                directory.root_dse = Some(record.attributes);
                continue;
            }
            directory.insert(record)?;
        }
        Ok(directory)
    }

    /// Sets the attributes served for the root DSE (base search on the empty DN).
    pub fn set_root_dse(&mut self, attributes: AttributeMap) {
        self.root_dse = Some(attributes);
    }

    /// Stores an entry without any of the checks `add` performs.
    pub fn insert(&mut self, entry: DirectoryEntry) -> Result<()> {
        let rdns = parse_dn(&entry.dn)?;
        match self.position(&rdns) {
            Some(i) => self.entries[i].entry = entry,
            None => self.entries.push(StoredEntry { rdns, entry }),
        }
        Ok(())
    }

    pub fn bound_dn(&self) -> Option<&str> {
        self.bound_dn.as_deref()
    }

    fn position(&self, rdns: &[Rdn]) -> Option<usize> {
        self.entries
            .iter()
            .position(|stored| stored.rdns == rdns)
    }

    fn authenticate(&self, bind_dn: &str, password: &str) -> Result<()> {
        let invalid = || Error::rejected(result_code::INVALID_CREDENTIALS, "invalid credentials");
        let rdns = parse_dn(bind_dn).map_err(|_| invalid())?;
        let stored = self.position(&rdns)
            .map(|i| &self.entries[i])
            .ok_or_else(invalid)?;
        let matches = stored.entry.attributes
            .get(PASSWORD_ATTRIBUTE)
            .iter()
            .any(|v| v == password);
        if password.is_empty() || !matches {
            return Err(invalid());
        }
        Ok(())
    }

    fn search_sync(&self, base_dn: &str, scope: Scope, filter: &str, attribute_names: &[&str], size_limit: i32) -> Result<Vec<DirectoryEntry>> {
        let filter = Filter::parse(filter)?;
        let base_rdns = parse_dn(base_dn)?;

        if base_rdns.is_empty() {
            if let (Scope::Base, Some(root_dse)) = (&scope, &self.root_dse) {
                let mut found = Vec::new();
                if filter.matches(root_dse) {
                    found.push(select(&DirectoryEntry::new("", root_dse.clone()), attribute_names));
                }
                return Ok(found);
            }
        } else if self.position(&base_rdns).is_none() {
            return Err(Error::rejected(result_code::NO_SUCH_OBJECT, format!("no such object: {}", base_dn)));
        }

        let mut found = Vec::new();
        for stored in &self.entries {
            let in_scope = match scope {
                Scope::Base => stored.rdns == base_rdns,
                Scope::OneLevel => stored.rdns.len() == base_rdns.len() + 1 && is_within(&stored.rdns, &base_rdns),
                Scope::Subtree => is_within(&stored.rdns, &base_rdns),
            };
            if !in_scope || !filter.matches(&stored.entry.attributes) {
                continue;
            }
            found.push(select(&stored.entry, attribute_names));
            if size_limit > 0 && found.len() >= size_limit as usize {
                break;
            }
        }
        Ok(found)
    }

    fn add_sync(&mut self, dn: &str, attributes: AttributeMap) -> Result<()> {
        let rdns = parse_dn(dn)?;
        if self.position(&rdns).is_some() {
            return Err(Error::rejected(result_code::ENTRY_ALREADY_EXISTS, format!("entry already exists: {}", dn)));
        }
        if rdns.len() > 1 && self.position(&rdns[1..]).is_none() {
            return Err(Error::rejected(result_code::NO_SUCH_OBJECT, format!("parent of {} does not exist", dn)));
        }
        self.entries.push(StoredEntry {
            rdns,
            entry: DirectoryEntry::new(dn, attributes),
        });
        Ok(())
    }

    fn modify_sync(&mut self, dn: &str, modifications: Vec<Modification>) -> Result<()> {
        let rdns = parse_dn(dn)?;
        let i = self.position(&rdns)
            .ok_or_else(|| Error::rejected(result_code::NO_SUCH_OBJECT, format!("no such object: {}", dn)))?;

        // all or nothing: work on a copy
        let mut attributes = self.entries[i].entry.attributes.clone();
        for modification in modifications {
            apply(&mut attributes, modification)?;
        }
        self.entries[i].entry.attributes = attributes;
        Ok(())
    }

    fn delete_sync(&mut self, dn: &str) -> Result<()> {
        let rdns = parse_dn(dn)?;
        let i = self.position(&rdns)
            .ok_or_else(|| Error::rejected(result_code::NO_SUCH_OBJECT, format!("no such object: {}", dn)))?;
        let has_children = self.entries
            .iter()
            .any(|stored| stored.rdns.len() > rdns.len() && is_within(&stored.rdns, &rdns));
        if has_children {
            return Err(Error::rejected(result_code::NOT_ALLOWED_ON_NON_LEAF, format!("{} has subordinate entries", dn)));
        }
        self.entries.remove(i);
        Ok(())
    }
}

fn parse_dn(dn: &str) -> Result<Vec<Rdn>> {
    normalized_rdns(dn)
        .ok_or_else(|| Error::rejected(result_code::INVALID_DN_SYNTAX, format!("invalid DN syntax: {}", dn)))
}

fn select(entry: &DirectoryEntry, attribute_names: &[&str]) -> DirectoryEntry {
    if attribute_names.is_empty() || attribute_names.contains(&"*") {
        return entry.clone();
    }
    let mut attributes = AttributeMap::new();
    for (name, values) in entry.attributes.iter() {
        if attribute_names.iter().any(|wanted| unicase::eq(*wanted, name)) {
            attributes.insert(name, values.to_vec());
        }
    }
    DirectoryEntry::new(entry.dn.clone(), attributes)
}

fn apply(attributes: &mut AttributeMap, modification: Modification) -> Result<()> {
    match modification {
        Modification::Add(attribute, values) => {
            for value in values {
                if attributes.get(&attribute).contains(&value) {
                    return Err(Error::rejected(result_code::ATTRIBUTE_OR_VALUE_EXISTS, format!("{} already has that value", attribute)));
                }
                attributes.push(attribute.clone(), value);
            }
        },
        Modification::Delete(attribute, values) => {
            if !attributes.contains(&attribute) {
                return Err(Error::rejected(result_code::NO_SUCH_ATTRIBUTE, format!("no such attribute: {}", attribute)));
            }
            if values.is_empty() {
                attributes.remove(&attribute);
            }
            for value in values {
                if !attributes.remove_value(&attribute, &value) {
                    return Err(Error::rejected(result_code::NO_SUCH_ATTRIBUTE, format!("{} does not have that value", attribute)));
                }
            }
        },
        Modification::Replace(attribute, values) => {
            if values.is_empty() {
                attributes.remove(&attribute);
            } else {
                attributes.insert(attribute, values);
            }
        },
    }
    Ok(())
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn simple_bind(&mut self, bind_dn: &str, password: &str) -> Result<()> {
        self.authenticate(bind_dn, password)?;
        debug!(bind_dn = %bind_dn, "bound to in-memory directory");
        self.bound_dn = Some(bind_dn.to_owned());
        Ok(())
    }

    async fn check_credentials(&mut self, bind_dn: &str, password: &str) -> Result<()> {
        self.authenticate(bind_dn, password)
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: Scope,
        filter: &str,
        attribute_names: &[&str],
        size_limit: i32,
    ) -> Result<Vec<DirectoryEntry>> {
        debug!(base_dn = %base_dn, ?scope, filter = %filter, size_limit, "searching in-memory directory");
        self.search_sync(base_dn, scope, filter, attribute_names, size_limit)
    }

    async fn add(&mut self, dn: &str, attributes: AttributeMap) -> Result<()> {
        self.add_sync(dn, attributes)
    }

    async fn modify(&mut self, dn: &str, modifications: Vec<Modification>) -> Result<()> {
        self.modify_sync(dn, modifications)
    }

    async fn delete(&mut self, dn: &str) -> Result<()> {
        self.delete_sync(dn)
    }

    async fn unbind(&mut self) -> Result<()> {
        self.bound_dn = None;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use ldap3::Scope;

    use super::MemoryDirectory;
    use crate::attributes::{AttributeMap, Value};
    use crate::directory::{Directory, Modification};
    use crate::error::result_code;

    const SEED: &str = "\
dn: ou=system
objectClass: organizationalUnit
ou: system

dn: ou=users,ou=system
objectClass: organizationalUnit
ou: users

dn: cn=jdoe,ou=users,ou=system
objectClass: inetOrgPerson
cn: jdoe
sn: Doe
userPassword: secret
";

    fn directory() -> MemoryDirectory {
        MemoryDirectory::from_ldif(SEED).unwrap()
    }

    #[tokio::test]
    async fn test_search_scopes() {
        let mut dir = directory();

        let subtree = dir.search("ou=system", Scope::Subtree, "(objectClass=*)", &[], 0).await.unwrap();
        assert_eq!(subtree.len(), 3);

        let one_level = dir.search("ou=system", Scope::OneLevel, "(objectClass=*)", &[], 0).await.unwrap();
        assert_eq!(one_level.len(), 1);
        assert_eq!(one_level[0].dn, "ou=users,ou=system");

        let base = dir.search("CN=JDOE, OU=Users,ou=system", Scope::Base, "(objectClass=*)", &[], 0).await.unwrap();
        assert_eq!(base.len(), 1);
        assert_eq!(base[0].dn, "cn=jdoe,ou=users,ou=system");

        let limited = dir.search("ou=system", Scope::Subtree, "(objectClass=*)", &[], 2).await.unwrap();
        assert_eq!(limited.len(), 2);

        let selected = dir.search("ou=system", Scope::Subtree, "(cn=jdoe)", &["SN"], 0).await.unwrap();
        assert_eq!(selected[0].attributes.names().collect::<Vec<_>>(), ["sn"]);

        let err = dir.search("ou=nowhere", Scope::Subtree, "(objectClass=*)", &[], 0).await.unwrap_err();
        assert_eq!(err.result_code(), Some(result_code::NO_SUCH_OBJECT));
    }

    #[tokio::test]
    async fn test_root_dse() {
        let mut dir = directory();
        assert!(dir.search("", Scope::Base, "(objectClass=*)", &[], 0).await.unwrap().is_empty());

        let attrs: AttributeMap = vec![("vendorName", vec!["Apache Software Foundation"])].into_iter().collect();
        dir.set_root_dse(attrs);
        // matches although the root DSE above lists no objectClass
        let found = dir.search("", Scope::Base, "(objectClass=*)", &["vendorName"], 0).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].attributes["vendorName"], ["Apache Software Foundation"]);
        let found = dir.search("", Scope::Base, "(vendorName=*)", &["vendorName"], 0).await.unwrap();
        assert_eq!(found[0].dn, "");
        assert_eq!(found[0].attributes["vendorname"], ["Apache Software Foundation"]);
    }

    #[tokio::test]
    async fn test_add_and_delete() {
        let mut dir = directory();
        let attrs: AttributeMap = vec![("objectClass", vec!["inetOrgPerson"]), ("cn", vec!["asmith"])].into_iter().collect();

        dir.add("cn=asmith,ou=users,ou=system", attrs.clone()).await.unwrap();
        let err = dir.add("cn=asmith,ou=users,ou=system", attrs.clone()).await.unwrap_err();
        assert_eq!(err.result_code(), Some(result_code::ENTRY_ALREADY_EXISTS));
        let err = dir.add("cn=asmith,ou=nowhere,ou=system", attrs).await.unwrap_err();
        assert_eq!(err.result_code(), Some(result_code::NO_SUCH_OBJECT));

        let err = dir.delete("ou=users,ou=system").await.unwrap_err();
        assert_eq!(err.result_code(), Some(result_code::NOT_ALLOWED_ON_NON_LEAF));
        dir.delete("cn=asmith,ou=users,ou=system").await.unwrap();
        let err = dir.delete("cn=asmith,ou=users,ou=system").await.unwrap_err();
        assert_eq!(err.result_code(), Some(result_code::NO_SUCH_OBJECT));
    }

    #[tokio::test]
    async fn test_modify() {
        let mut dir = directory();
        let dn = "cn=jdoe,ou=users,ou=system";

        dir.modify(dn, vec![
            Modification::Replace("mobile".to_owned(), vec![Value::from("1")]),
            Modification::Add("mobile".to_owned(), vec![Value::from("2")]),
        ]).await.unwrap();
        let entry = &dir.search(dn, Scope::Base, "(objectClass=*)", &[], 0).await.unwrap()[0];
        assert_eq!(entry.attributes["mobile"], ["1", "2"]);

        let err = dir.modify(dn, vec![Modification::Add("mobile".to_owned(), vec![Value::from("1")])]).await.unwrap_err();
        assert_eq!(err.result_code(), Some(result_code::ATTRIBUTE_OR_VALUE_EXISTS));

        // a failing modification leaves the entry untouched
        let err = dir.modify(dn, vec![
            Modification::Delete("mobile".to_owned(), vec![Value::from("1")]),
            Modification::Delete("mobile".to_owned(), vec![Value::from("3")]),
        ]).await.unwrap_err();
        assert_eq!(err.result_code(), Some(result_code::NO_SUCH_ATTRIBUTE));
        let entry = &dir.search(dn, Scope::Base, "(objectClass=*)", &[], 0).await.unwrap()[0];
        assert_eq!(entry.attributes["mobile"], ["1", "2"]);

        dir.modify(dn, vec![Modification::Delete("mobile".to_owned(), vec![])]).await.unwrap();
        let entry = &dir.search(dn, Scope::Base, "(objectClass=*)", &[], 0).await.unwrap()[0];
        assert!(entry.attributes["mobile"].is_empty());
    }

    #[tokio::test]
    async fn test_bind() {
        let mut dir = directory();
        let dn = "cn=jdoe,ou=users,ou=system";

        assert!(dir.check_credentials(dn, "secret").await.is_ok());
        let err = dir.check_credentials(dn, "wrong").await.unwrap_err();
        assert_eq!(err.result_code(), Some(result_code::INVALID_CREDENTIALS));
        assert!(dir.check_credentials(dn, "").await.is_err());
        assert!(dir.check_credentials("cn=nobody,ou=system", "secret").await.is_err());
        assert_eq!(dir.bound_dn(), None);

        dir.simple_bind(dn, "secret").await.unwrap();
        assert_eq!(dir.bound_dn(), Some(dn));
        dir.unbind().await.unwrap();
        assert_eq!(dir.bound_dn(), None);
    }
}
