use std::collections::HashSet;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry, SearchOptions};
use tracing::{debug, info, warn};

use crate::attributes::{AttributeMap, Value};
use crate::directory::{Directory, DirectoryEntry, Modification};
use crate::error::{check, result_code, Error, Result};


/// A directory session on an LDAP server.
#[derive(Debug)]
pub struct LdapDirectory {
    ldap: Ldap,
    url: String,
    verify_certificates: bool,
}
impl LdapDirectory {
    /// Opens an (anonymous) session to the server at `url`.
    pub async fn connect(url: &str, verify_certificates: bool) -> Result<Self> {
        let ldap = open_session(url, verify_certificates).await?;
        info!(url = %url, "connected to LDAP server");
        Ok(Self {
            ldap,
            url: url.to_owned(),
            verify_certificates,
        })
    }

    pub fn url(&self) -> &str { &self.url }
}

async fn open_session(url: &str, verify_certificates: bool) -> Result<Ldap> {
    let settings = LdapConnSettings::new()
        .set_no_tls_verify(!verify_certificates);
    let (conn, ldap) = LdapConnAsync::with_settings(settings, url).await?;
    tokio::spawn(async move {
        if let Err(e) = conn.drive().await {
            warn!(error = %e, "LDAP connection driver error");
        }
    });
    Ok(ldap)
}

fn to_directory_entry(search_entry: SearchEntry) -> DirectoryEntry {
    // the client hands out attributes as hash maps; sort for a stable order
    let mut text_attributes: Vec<(String, Vec<String>)> = search_entry.attrs.into_iter().collect();
    text_attributes.sort_by(|a, b| a.0.cmp(&b.0));
    let mut binary_attributes: Vec<(String, Vec<Vec<u8>>)> = search_entry.bin_attrs.into_iter().collect();
    binary_attributes.sort_by(|a, b| a.0.cmp(&b.0));

    let mut attributes = AttributeMap::new();
    for (key, string_values) in text_attributes {
        for string_value in string_values {
            attributes.push(key.clone(), Value::from(string_value));
        }
    }
    for (key, bytes_values) in binary_attributes {
        for bytes_value in bytes_values {
            attributes.push(key.clone(), Value::from(bytes_value));
        }
    }
    DirectoryEntry::new(search_entry.dn, attributes)
}

fn to_value_set(values: Vec<Value>) -> HashSet<Vec<u8>> {
    values
        .into_iter()
        .map(Value::into_bytes)
        .collect()
}

fn to_client_mod(modification: Modification) -> Mod<Vec<u8>> {
    match modification {
        Modification::Add(attribute, values) => Mod::Add(attribute.into_bytes(), to_value_set(values)),
        Modification::Delete(attribute, values) => Mod::Delete(attribute.into_bytes(), to_value_set(values)),
        Modification::Replace(attribute, values) => Mod::Replace(attribute.into_bytes(), to_value_set(values)),
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    async fn simple_bind(&mut self, bind_dn: &str, password: &str) -> Result<()> {
        debug!(bind_dn = %bind_dn, "binding");
        let result = self.ldap.simple_bind(bind_dn, password).await?;
        check(result)?;
        info!(bind_dn = %bind_dn, url = %self.url, "bound to LDAP server");
        Ok(())
    }

    async fn check_credentials(&mut self, bind_dn: &str, password: &str) -> Result<()> {
        let mut test_ldap = open_session(&self.url, self.verify_certificates).await?;
        let outcome = match test_ldap.simple_bind(bind_dn, password).await {
            Ok(result) => check(result).map(|_| ()),
            Err(e) => Err(Error::from(e)),
        };
        if let Err(e) = test_ldap.unbind().await {
            debug!(error = %e, "failed to unbind credential check session");
        }
        outcome
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: Scope,
        filter: &str,
        attribute_names: &[&str],
        size_limit: i32,
    ) -> Result<Vec<DirectoryEntry>> {
        debug!(base_dn = %base_dn, ?scope, filter = %filter, size_limit, "searching");
        let attrs: Vec<&str> = if attribute_names.is_empty() {
            vec!["*"]
        } else {
            attribute_names.to_vec()
        };
        let search_result = self.ldap
            .with_search_options(SearchOptions::new().sizelimit(size_limit))
            .search(base_dn, scope, filter, attrs)
            .await?;
        let ldap3::SearchResult(ldap_entries, ldap_result) = search_result;

        // a limited search that hit its limit still delivered what we asked for
        let limit_hit = size_limit > 0 && ldap_result.rc == result_code::SIZE_LIMIT_EXCEEDED;
        if !limit_hit {
            check(ldap_result)?;
        }

        let mut entries = Vec::with_capacity(ldap_entries.len());
        for ldap_entry in ldap_entries {
            if ldap_entry.is_ref() || ldap_entry.is_intermediate() {
                debug!(base_dn = %base_dn, "skipping search result without a DN");
                continue;
            }
            entries.push(to_directory_entry(SearchEntry::construct(ldap_entry)));
        }
        Ok(entries)
    }

    async fn add(&mut self, dn: &str, attributes: AttributeMap) -> Result<()> {
        debug!(dn = %dn, "adding entry");
        let ldap_attributes: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = attributes
            .iter()
            .map(|(name, values)| (
                name.as_bytes().to_vec(),
                values.iter().map(|v| v.as_bytes().to_vec()).collect(),
            ))
            .collect();
        let result = self.ldap.add(dn, ldap_attributes).await?;
        check(result)?;
        Ok(())
    }

    async fn modify(&mut self, dn: &str, modifications: Vec<Modification>) -> Result<()> {
        debug!(dn = %dn, count = modifications.len(), "modifying entry");
        let mods: Vec<Mod<Vec<u8>>> = modifications
            .into_iter()
            .map(to_client_mod)
            .collect();
        let result = self.ldap.modify(dn, mods).await?;
        check(result)?;
        Ok(())
    }

    async fn delete(&mut self, dn: &str) -> Result<()> {
        debug!(dn = %dn, "deleting entry");
        let result = self.ldap.delete(dn).await?;
        check(result)?;
        Ok(())
    }

    async fn unbind(&mut self) -> Result<()> {
        self.ldap.unbind().await?;
        info!(url = %self.url, "unbound from LDAP server");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ldap3::{Mod, SearchEntry};

    use super::{to_client_mod, to_directory_entry};
    use crate::attributes::Value;
    use crate::directory::Modification;

    #[test]
    fn test_to_directory_entry_merges_binary_attributes() {
        let mut attrs = HashMap::new();
        attrs.insert("sn".to_owned(), vec!["Doe".to_owned()]);
        attrs.insert("cn".to_owned(), vec!["jdoe".to_owned(), "John Doe".to_owned()]);
        let mut bin_attrs = HashMap::new();
        bin_attrs.insert("objectGUID".to_owned(), vec![vec![0u8; 16]]);
        let search_entry = SearchEntry {
            dn: "cn=jdoe,ou=users,ou=system".to_owned(),
            attrs,
            bin_attrs,
        };

        let entry = to_directory_entry(search_entry);
        assert_eq!(entry.dn, "cn=jdoe,ou=users,ou=system");
        let names: Vec<&str> = entry.attributes.names().collect();
        assert_eq!(names, ["cn", "sn", "objectGUID"]);
        assert_eq!(entry.attributes.get("CN"), ["jdoe", "John Doe"]);
        assert_eq!(entry.attributes.get("objectguid")[0].as_bytes(), &[0u8; 16]);
    }

    #[test]
    fn test_to_client_mod() {
        let modification = Modification::Replace("givenName".to_owned(), vec![Value::from("Jack")]);
        match to_client_mod(modification) {
            Mod::Replace(attribute, values) => {
                assert_eq!(attribute, b"givenName");
                assert_eq!(values.len(), 1);
                assert!(values.contains(&b"Jack".to_vec()));
            },
            _ => panic!("expected a replace"),
        }
    }
}
