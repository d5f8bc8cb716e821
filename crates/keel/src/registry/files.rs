use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Replaces the port record at `path` with `port`.
///
/// The record is staged in a hidden sibling file and renamed over the old
/// one, so a concurrent reader sees either the previous port or the new one.
pub(super) fn replace_port_record(path: &Path, port: u16) -> io::Result<()> {
    let Some(directory) = path.parent() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "port record path has no parent directory",
        ));
    };

    let mut staged = stage_in(directory, path)?;
    write!(staged, "{port}")?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|error| error.error)?;
    Ok(())
}

fn stage_in(directory: &Path, target: &Path) -> io::Result<NamedTempFile> {
    let stem = target.file_name().map_or_else(
        || ".port.".to_owned(),
        |name| format!(".{}.", name.to_string_lossy()),
    );
    let mut builder = tempfile::Builder::new();
    builder.prefix(&stem).suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o600));
    }
    builder.tempfile_in(directory)
}
