use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};


#[derive(Clone, Debug, Eq, Hash, Ord, Parser, PartialEq, PartialOrd)]
#[command(version, about = "Query and modify LDAP directories")]
pub struct Opts {
    #[command(flatten)]
    pub source: Source,

    #[arg(long)]
    pub ldaps: bool,

    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Do not verify the server's TLS certificate.
    #[arg(long)]
    pub no_verify: bool,

    /// Root of all searches.
    #[arg(short = 'b', long)]
    pub base: Option<String>,

    /// Bind as this DN; the password is prompted for.
    #[arg(short = 'D', long, group = "auth")]
    pub bind_dn: Option<String>,

    /// TOML file with `bind_dn` and `password`.
    #[arg(short = 'c', long, group = "auth")]
    pub credentials_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[group(required = true, multiple = false)]
pub struct Source {
    /// LDAP server host name or address.
    #[arg(short = 'H', long)]
    pub server: Option<String>,

    /// TOML file with connection options.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Serve an LDIF file from memory instead of contacting a server.
    #[arg(long)]
    pub ldif: Option<PathBuf>,
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Subcommand)]
pub enum Command {
    /// Print all entries matching an `attr=value` assertion.
    Search {
        filter: String,

        /// Print as LDIF.
        #[arg(long)]
        ldif: bool,
    },

    /// Print all entries with the given objectGUID.
    SearchGuid {
        guid: String,
    },

    /// Print the first entry matching an `attr=value` assertion.
    Get {
        filter: String,
    },

    /// Print the entry at a DN.
    Show {
        dn: String,

        #[arg(long)]
        ldif: bool,
    },

    /// Print the DNs of all entries matching an `attr=value` assertion.
    Dns {
        filter: String,
    },

    /// Print all values of an attribute.
    Values {
        dn: String,
        attr: String,
    },

    /// Print the first value of an attribute.
    Value {
        dn: String,
        attr: String,
    },

    /// Print which directory server product this is.
    Type,

    /// Check a password (prompted for) of a DN.
    Verify {
        dn: String,
    },

    /// Replace all values of an attribute.
    Set {
        dn: String,
        attr: String,
        value: String,
    },

    /// Add a value to an attribute.
    AddValue {
        dn: String,
        attr: String,
        value: String,
    },

    /// Remove a value from an attribute.
    DeleteValue {
        dn: String,
        attr: String,
        value: String,
    },

    /// Delete an entry.
    Delete {
        dn: String,
    },
}


#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Command, Opts};

    #[test]
    fn test_parse_args() {
        let opts = Opts::try_parse_from([
            "ldappr", "-H", "127.0.0.1", "--ldaps", "-p", "10636", "--no-verify",
            "-b", "ou=users,ou=system", "-D", "uid=admin,ou=system",
            "search", "cn=jdoe", "--ldif",
        ]).unwrap();
        assert_eq!(opts.source.server.as_deref(), Some("127.0.0.1"));
        assert!(opts.ldaps);
        assert_eq!(opts.port, Some(10636));
        assert!(opts.no_verify);
        assert_eq!(opts.bind_dn.as_deref(), Some("uid=admin,ou=system"));
        assert_eq!(opts.command, Command::Search { filter: "cn=jdoe".to_owned(), ldif: true });
    }

    #[test]
    fn test_source_is_required_and_exclusive() {
        assert!(Opts::try_parse_from(["ldappr", "type"]).is_err());
        assert!(Opts::try_parse_from(["ldappr", "-H", "a", "--ldif", "b.ldif", "type"]).is_err());
        assert!(Opts::try_parse_from(["ldappr", "--ldif", "b.ldif", "type"]).is_ok());
    }

    #[test]
    fn test_auth_is_exclusive() {
        assert!(Opts::try_parse_from(["ldappr", "-H", "a", "-D", "x", "-c", "y", "type"]).is_err());
    }
}
