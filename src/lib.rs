//! A friendlier face for LDAP directories.
//!
//! Connect with [`connect_to`], search with plain `attr=value` assertions, and work with
//! [`Entry`] snapshots whose attributes are looked up ignoring case, with missing
//! attributes reading as empty.
//!
//! ```no_run
//! # async fn run() -> ldappr::Result<()> {
//! use ldappr::{connect_to, ConnectOptions, Credentials, Protocol};
//!
//! let options = ConnectOptions::new("127.0.0.1")
//!     .protocol(Protocol::Ldaps)
//!     .port(10636)
//!     .verify(false)
//!     .search_base("ou=users,ou=system")
//!     .credentials(Credentials::new("uid=admin,ou=system", "secret"));
//! let mut ldap = connect_to(&options).await?;
//!
//! if let Some(mut user) = ldap.get("cn=jdoe").await? {
//!     println!("{}", user);
//!     user.set_value(&mut ldap, "givenName", "Jack").await?;
//! }
//!
//! ldap.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Everything goes through the [`Directory`] trait, implemented for live servers by
//! [`LdapDirectory`] and in memory by [`MemoryDirectory`].

pub mod attributes;
pub mod config;
pub mod connection;
pub mod directory;
pub mod dn;
pub mod entry;
pub mod error;
pub mod filter;
pub mod ldap;
pub mod ldif;
pub mod memory;


use tracing::info;

pub use crate::attributes::{AttributeMap, Value};
pub use crate::config::{ConnectOptions, Credentials, Protocol};
pub use crate::connection::{Connection, ServerType};
pub use crate::directory::{Directory, DirectoryEntry, Modification};
pub use crate::entry::Entry;
pub use crate::error::{Error, Result};
pub use crate::ldap::LdapDirectory;
pub use crate::memory::MemoryDirectory;


/// Connects to a server; binds if the options carry credentials, stays anonymous otherwise.
pub async fn connect_to(options: &ConnectOptions) -> Result<Connection<LdapDirectory>> {
    let directory = LdapDirectory::connect(&options.url(), options.verify).await?;
    match &options.credentials {
        Some(credentials) => {
            let conn = Connection::bind(
                directory,
                options.search_base.clone(),
                &credentials.bind_dn,
                &credentials.password,
            ).await?;
            info!(bind_dn = %credentials.bind_dn, "authenticated connection ready");
            Ok(conn)
        },
        None => {
            info!("anonymous connection ready");
            Ok(Connection::new(directory, options.search_base.clone()))
        },
    }
}
