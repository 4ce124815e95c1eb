mod args;


use std::process::ExitCode;

use clap::Parser;
use ldappr::{
    connect_to, ConnectOptions, Connection, Credentials, Directory, Entry, MemoryDirectory, Protocol,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::args::{Command, Opts};


fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}


fn print_entry(entry: &Entry, as_ldif: bool) {
    if as_ldif {
        print!("{}", entry.to_ldif());
    } else {
        println!("{}", entry);
    }
}


fn obtain_credentials(opts: &Opts) -> ldappr::Result<Option<Credentials>> {
    if let Some(bind_dn) = &opts.bind_dn {
        let password = rpassword::prompt_password("LDAP password: ")?;
        Ok(Some(Credentials::new(bind_dn.clone(), password)))
    } else if let Some(credentials_file) = &opts.credentials_file {
        Ok(Some(Credentials::from_toml_file(credentials_file)?))
    } else {
        Ok(None)
    }
}


/// Lets command-line flags override connection options from `-H` or a config file.
fn apply_overrides(opts: &Opts, mut options: ConnectOptions) -> ConnectOptions {
    if opts.no_verify {
        options = options.verify(false);
    }
    if opts.ldaps {
        options = options.protocol(Protocol::Ldaps);
    }
    if let Some(port) = opts.port {
        options = options.port(port);
    }
    if let Some(base) = &opts.base {
        options = options.search_base(base.clone());
    }
    options
}


async fn run_command<D: Directory>(conn: &mut Connection<D>, command: Command) -> ldappr::Result<()> {
    match command {
        Command::Search { filter, ldif } => {
            for entry in conn.search(&filter).await? {
                print_entry(&entry, ldif);
            }
        },
        Command::SearchGuid { guid } => {
            for entry in conn.search_by_guid(&guid).await? {
                print_entry(&entry, false);
            }
        },
        Command::Get { filter } => {
            match conn.get(&filter).await? {
                Some(entry) => print_entry(&entry, false),
                None => eprintln!("no entry matches {:?}", filter),
            }
        },
        Command::Show { dn, ldif } => {
            let entry = conn.get_by_dn(&dn).await?;
            print_entry(&entry, ldif);
        },
        Command::Dns { filter } => {
            for dn in conn.get_dn(&filter).await? {
                println!("{}", dn);
            }
        },
        Command::Values { dn, attr } => {
            for value in conn.get_values(&dn, &attr).await? {
                println!("{}", value);
            }
        },
        Command::Value { dn, attr } => {
            if let Some(value) = conn.get_value(&dn, &attr).await? {
                println!("{}", value);
            }
        },
        Command::Type => {
            println!("{}", conn.server_type().await?);
        },
        Command::Verify { dn } => {
            let password = rpassword::prompt_password("password to verify: ")?;
            if conn.verify_password(&dn, &password).await {
                println!("password is correct");
            } else {
                println!("password is NOT correct");
            }
        },
        Command::Set { dn, attr, value } => {
            conn.set_value(&dn, &attr, value).await?;
        },
        Command::AddValue { dn, attr, value } => {
            conn.add_value(&dn, &attr, value).await?;
        },
        Command::DeleteValue { dn, attr, value } => {
            conn.delete_value(&dn, &attr, value).await?;
        },
        Command::Delete { dn } => {
            conn.delete(&dn).await?;
        },
    }
    Ok(())
}


/// Runs the command, then closes the connection even if the command failed.
async fn run_and_close<D: Directory>(mut conn: Connection<D>, command: Command) -> ldappr::Result<()> {
    let outcome = run_command(&mut conn, command).await;
    let closed = conn.close().await;
    outcome.and(closed)
}


async fn run() -> ldappr::Result<()> {
    let opts = Opts::parse();
    let credentials = obtain_credentials(&opts)?;

    if let Some(ldif_path) = &opts.source.ldif {
        let ldif_string = std::fs::read_to_string(ldif_path)?;
        let directory = MemoryDirectory::from_ldif(&ldif_string)?;
        let base = opts.base.clone().unwrap_or_default();
        let conn = match credentials {
            Some(c) => Connection::bind(directory, base, &c.bind_dn, &c.password).await?,
            None => Connection::new(directory, base),
        };
        return run_and_close(conn, opts.command).await;
    }

    let options = if let Some(config_path) = &opts.source.config {
        ConnectOptions::from_toml_file(config_path)?
    } else if let Some(server) = &opts.source.server {
        ConnectOptions::new(server.as_str())
    } else {
        unreachable!("clap requires one source");
    };
    let mut options = apply_overrides(&opts, options);
    if credentials.is_some() {
        options.credentials = credentials;
    }

    let conn = connect_to(&options).await?;
    run_and_close(conn, opts.command).await
}


#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        },
    }
}
