//! services/api/src/bin/hash_password.rs
//!
//! Prints an Argon2id hash for `ADMIN_PASSWORD_HASH`.

use api_lib::web::auth::hash_password;
use clap::Parser;
use std::io::{self, BufRead, Write};

#[derive(Parser)]
#[command(name = "hash-password", about = "Hash the admin password for ADMIN_PASSWORD_HASH")]
struct Cli {
    /// The password to hash. Read from stdin when omitted, which keeps it out of shell history.
    password: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let password = match cli.password {
        Some(password) => password,
        None => {
            eprint!("Password: ");
            io::stderr().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.is_empty() {
        return Err("password must not be empty".into());
    }

    let hash = hash_password(&password).map_err(|e| format!("failed to hash password: {e}"))?;
    println!("{hash}");
    Ok(())
}
