//! Generate the admin password hash.
//!
//! ```bash
//! staffline hash-password                  # prompts on stdin
//! staffline hash-password --password '...'
//! ```
//!
//! The printed PHC string goes into `ADMIN_PASSWORD_HASH`.

use std::io::BufRead;

use staffline_site::services::auth::hash_password;

use super::CliError;

/// Hash `password`, or a line read from stdin, and print the hash.
///
/// # Errors
///
/// Returns an error if stdin cannot be read or the password is too short.
#[allow(clippy::print_stdout)]
pub fn run(password: Option<String>) -> Result<(), CliError> {
    let password = match password {
        Some(password) => password,
        None => {
            tracing::info!("Enter the admin password and press enter");
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| CliError::io("<stdin>", e))?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    let hash = hash_password(&password)?;
    println!("{hash}");
    Ok(())
}
