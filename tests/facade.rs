use ldappr::{AttributeMap, Connection, Error, MemoryDirectory, ServerType, Value};


const SEARCH_BASE: &str = "ou=users,ou=system";
const BIND_DN: &str = "uid=admin,ou=system";
const PASSWORD: &str = "secret";
const NEW_DN: &str = "cn=jdoe,ou=users,ou=system";

const SEED: &str = "\
dn:
objectClass: top
objectClass: extensibleObject
vendorName: Apache Software Foundation

dn: ou=system
objectClass: top
objectClass: organizationalUnit
ou: system

dn: uid=admin,ou=system
objectClass: top
objectClass: person
uid: admin
cn: system administrator
sn: administrator
userPassword: secret

dn: ou=users,ou=system
objectClass: top
objectClass: organizationalUnit
ou: users
";


/// An authenticated connection with `cn=jdoe` freshly added.
async fn setup() -> Connection<MemoryDirectory> {
    let directory = MemoryDirectory::from_ldif(SEED).unwrap();
    let mut ldap = Connection::bind(directory, SEARCH_BASE, BIND_DN, PASSWORD).await.unwrap();
    let modlist: AttributeMap = vec![
        ("objectClass", vec!["top", "inetOrgPerson"]),
        ("cn", vec!["jdoe"]),
        ("givenName", vec!["John"]),
        ("sn", vec!["Doe"]),
    ].into_iter().collect();
    ldap.add(NEW_DN, modlist).await.unwrap();
    ldap
}


#[tokio::test]
async fn anonymous_bind() {
    let directory = MemoryDirectory::from_ldif(SEED).unwrap();
    let ldap = Connection::new(directory, SEARCH_BASE);
    assert!(!ldap.is_authenticated());
    ldap.close().await.unwrap();
}

#[tokio::test]
async fn bind_with_wrong_password_fails() {
    let directory = MemoryDirectory::from_ldif(SEED).unwrap();
    let err = Connection::bind(directory, SEARCH_BASE, BIND_DN, "wrong_password").await.unwrap_err();
    assert_eq!(err.result_code(), Some(49));
}

#[tokio::test]
async fn anonymous_connection_cannot_write() {
    let directory = MemoryDirectory::from_ldif(SEED).unwrap();
    let mut ldap = Connection::new(directory, SEARCH_BASE);
    let err = ldap.set_value(BIND_DN, "sn", "nobody").await.unwrap_err();
    assert!(matches!(err, Error::NotAuthenticated));
    let err = ldap.delete(BIND_DN).await.unwrap_err();
    assert!(matches!(err, Error::NotAuthenticated));
    assert_eq!(ldap.get_value(BIND_DN, "sn").await.unwrap().unwrap(), "administrator");
}

#[tokio::test]
async fn get_attributes_from_entry() {
    let mut ldap = setup().await;
    let user = ldap.get("cn=jdoe").await.unwrap().unwrap();
    assert_eq!(user.get("givenname"), ["John"]);
    assert_eq!(user.get("gIvEnNaMe"), ["John"]);
    assert_eq!(user.get("GIVENNAME"), ["John"]);
}

#[tokio::test]
async fn get_nonexisting_attribute_from_entry() {
    let mut ldap = setup().await;
    let user = ldap.get("cn=jdoe").await.unwrap().unwrap();
    assert!(user.get("nonexisting").is_empty());
}

#[tokio::test]
async fn search_instead_of_get() {
    let mut ldap = setup().await;
    assert_eq!(ldap.search("cn=jdoe").await.unwrap().len(), 1);
}

#[tokio::test]
async fn search_and_find_nothing() {
    let mut ldap = setup().await;
    assert!(ldap.search("cn=non-existent").await.unwrap().is_empty());
    assert!(ldap.get("cn=non-existent").await.unwrap().is_none());
}

#[tokio::test]
async fn search_escapes_metacharacters() {
    let mut ldap = setup().await;
    // a wildcard is matched literally, not expanded
    assert!(ldap.search("cn=j*").await.unwrap().is_empty());
    assert!(ldap.search("cn=*").await.unwrap().is_empty());
}

#[tokio::test]
async fn search_is_scoped_to_search_base() {
    let mut ldap = setup().await;
    assert!(ldap.search("uid=admin").await.unwrap().is_empty());
}

#[tokio::test]
async fn pretty_print() {
    let mut ldap = setup().await;
    let user = ldap.get("cn=jdoe").await.unwrap().unwrap();
    let expected = format!("\
dn          : cn=jdoe,{}
objectClass : top
            : inetOrgPerson
cn          : jdoe
givenName   : John
sn          : Doe
", SEARCH_BASE);
    assert_eq!(user.to_string(), expected);
}

#[tokio::test]
async fn print_ldif() {
    let mut ldap = setup().await;
    let user = ldap.get("cn=jdoe").await.unwrap().unwrap();
    let expected = format!("\
dn: cn=jdoe,{}
cn: jdoe
givenName: John
objectClass: top
objectClass: inetOrgPerson
sn: Doe

", SEARCH_BASE);
    assert_eq!(user.to_ldif(), expected);
}

#[tokio::test]
async fn get_attribute_values_from_dn() {
    let mut ldap = setup().await;
    assert_eq!(ldap.get_value(NEW_DN, "sn").await.unwrap().unwrap(), "Doe");
    assert_eq!(ldap.get_values(NEW_DN, "sn").await.unwrap(), [Value::from("Doe")]);
    assert_eq!(ldap.get_value(NEW_DN, "mobile").await.unwrap(), None);
}

#[tokio::test]
async fn get_by_missing_dn_fails() {
    let mut ldap = setup().await;
    let err = ldap.get_by_dn("cn=nobody,ou=users,ou=system").await.unwrap_err();
    assert_eq!(err.result_code(), Some(32));
}

#[tokio::test]
async fn get_dnlist() {
    let mut ldap = setup().await;
    assert_eq!(ldap.get_dn("cn=jdoe").await.unwrap(), [NEW_DN]);
}

#[tokio::test]
async fn set_value() {
    let mut ldap = setup().await;
    let mut user = ldap.get_by_dn(NEW_DN).await.unwrap();
    user.set_value(&mut ldap, "givenName", "Jack").await.unwrap();
    assert_eq!(user.get("givenName"), ["Jack"]);

    let user = ldap.get_by_dn(NEW_DN).await.unwrap();
    assert_eq!(user.get("givenName"), ["Jack"]);

    ldap.set_value(NEW_DN, "givenName", "John").await.unwrap();
    let user = ldap.get_by_dn(NEW_DN).await.unwrap();
    assert_eq!(user.get("givenName"), ["John"]);
}

#[tokio::test]
async fn set_value_keeps_attribute_casing() {
    let mut ldap = setup().await;
    let mut user = ldap.get_by_dn(NEW_DN).await.unwrap();
    user.set_value(&mut ldap, "GIVENNAME", "Jack").await.unwrap();
    assert_eq!(user.attrs().stored_name("givenname"), Some("givenName"));
}

#[tokio::test]
async fn add_value() {
    let mut ldap = setup().await;
    let mut user = ldap.get_by_dn(NEW_DN).await.unwrap();
    user.set_value(&mut ldap, "mobile", "0123456789").await.unwrap();
    user.add_value(&mut ldap, "mobile", "9876543210").await.unwrap();
    assert_eq!(user.get("mobile"), ["0123456789", "9876543210"]);

    let user = ldap.get_by_dn(NEW_DN).await.unwrap();
    assert_eq!(user.get("mobile"), ["0123456789", "9876543210"]);
}

#[tokio::test]
async fn add_value_to_absent_attribute() {
    let mut ldap = setup().await;
    let mut user = ldap.get_by_dn(NEW_DN).await.unwrap();
    user.add_value(&mut ldap, "mobile", "0123456789").await.unwrap();
    assert_eq!(user.get("mobile"), ["0123456789"]);
}

#[tokio::test]
async fn remove_value() {
    let mut ldap = setup().await;
    let mut user = ldap.get_by_dn(NEW_DN).await.unwrap();
    user.set_value(&mut ldap, "mobile", "0123456789").await.unwrap();
    user.add_value(&mut ldap, "mobile", "9876543210").await.unwrap();
    user.remove_value(&mut ldap, "mobile", "0123456789").await.unwrap();
    assert_eq!(user.get("mobile"), ["9876543210"]);

    let user = ldap.get_by_dn(NEW_DN).await.unwrap();
    assert_eq!(user.get("mobile"), ["9876543210"]);
}

#[tokio::test]
async fn failed_write_leaves_snapshot_untouched() {
    let mut ldap = setup().await;
    let mut user = ldap.get_by_dn(NEW_DN).await.unwrap();
    let err = user.remove_value(&mut ldap, "mobile", "0123456789").await.unwrap_err();
    assert_eq!(err.result_code(), Some(16));
    assert_eq!(user.get("sn"), ["Doe"]);
}

#[tokio::test]
async fn verify_password() {
    let mut ldap = setup().await;
    assert!(ldap.verify_password(BIND_DN, PASSWORD).await);
    assert!(!ldap.verify_password(BIND_DN, "wrong_password").await);
    assert!(!ldap.verify_password(BIND_DN, "").await);
    assert!(!ldap.verify_password("uid=nobody,ou=system", PASSWORD).await);
    assert!(!ldap.verify_password("not a dn", PASSWORD).await);
}

#[tokio::test]
async fn server_type() {
    let mut ldap = setup().await;
    assert_eq!(ldap.server_type().await.unwrap(), ServerType::ApacheDs);

    let directory = MemoryDirectory::new();
    let mut ldap = Connection::new(directory, "");
    assert_eq!(ldap.server_type().await.unwrap(), ServerType::Unknown);
}

#[tokio::test]
async fn server_type_without_object_class() {
    let directory = MemoryDirectory::from_ldif("dn:\nvendorName: Novell, Inc.\n").unwrap();
    let mut ldap = Connection::new(directory, "");
    assert_eq!(ldap.server_type().await.unwrap(), ServerType::EDirectory);
}

#[tokio::test]
async fn get_by_dn_without_object_class() {
    let directory = MemoryDirectory::from_ldif("dn: cn=x\ncn: x\n").unwrap();
    let mut ldap = Connection::new(directory, "");
    let entry = ldap.get_by_dn("cn=x").await.unwrap();
    assert_eq!(entry.dn(), "cn=x");
    assert_eq!(entry.get("cn"), ["x"]);
}

#[tokio::test]
async fn search_by_guid() {
    let mut ldap = setup().await;
    let guid = "12345678-9abc-def0-1234-56789abcdef0";
    let guid_bytes = uuid::Uuid::parse_str(guid).unwrap().as_bytes().to_vec();
    ldap.set_value(NEW_DN, "objectGUID", guid_bytes).await.unwrap();

    let found = ldap.search_by_guid(guid).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].dn(), NEW_DN);
    assert_eq!(found[0].guid().map(|g| g.to_string()).as_deref(), Some(guid));

    assert!(ldap.search_by_guid("00000000-0000-0000-0000-000000000000").await.unwrap().is_empty());
    assert!(matches!(ldap.search_by_guid("nope").await, Err(Error::InvalidGuid(..))));
}

#[tokio::test]
async fn delete() {
    let mut ldap = setup().await;
    ldap.delete(NEW_DN).await.unwrap();
    assert!(ldap.get("cn=jdoe").await.unwrap().is_none());
    ldap.close().await.unwrap();
}
