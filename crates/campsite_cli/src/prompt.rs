use std::io::{self, BufRead, Write};

use anyhow::{Result, bail};
use notification_services::{Credentials, PushsaferClient};

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("stdin closed while waiting for input");
    }
    Ok(line.trim().to_string())
}

/// Ask for Pushsafer credentials until Pushsafer accepts them.
pub async fn prompt_credentials(client: &PushsaferClient) -> Result<Credentials> {
    loop {
        let username = read_line("Pushsafer username or email: ")?;
        let api_key = rpassword::prompt_password("Pushsafer private key: ")?
            .trim()
            .to_string();

        if username.is_empty() || api_key.is_empty() {
            println!("Both a username and a key are required.");
            continue;
        }

        let credentials = Credentials { username, api_key };
        if client.validate_key(&credentials).await? {
            return Ok(credentials);
        }
        println!("Pushsafer did not accept those credentials, try again.");
    }
}

/// Yes/no question; anything but y or yes is no.
pub fn confirm(question: &str) -> Result<bool> {
    let answer = read_line(&format!("{} [y/N] ", question))?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}
