use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::types::{Credentials, NotificationError};

/// Reads a two-line credential file: username, then API key.
pub fn read_credentials(path: &Path) -> Result<Credentials, NotificationError> {
    let content = fs::read_to_string(path)?;
    let mut lines = content.lines().map(str::trim);

    match (lines.next(), lines.next()) {
        (Some(username), Some(api_key)) if !username.is_empty() && !api_key.is_empty() => {
            Ok(Credentials {
                username: username.to_string(),
                api_key: api_key.to_string(),
            })
        }
        _ => Err(NotificationError::MalformedCredentials(format!(
            "{} must contain a username line and an API key line",
            path.display()
        ))),
    }
}

/// Writes the credential file, readable and writable by the owner only.
pub fn write_credentials(path: &Path, credentials: &Credentials) -> Result<(), NotificationError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    // mode() only applies on creation
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{}", credentials.username)?;
    write!(file, "{}", credentials.api_key)?;

    log::info!("🔐 Saved Pushsafer credentials to {}", path.display());
    Ok(())
}
