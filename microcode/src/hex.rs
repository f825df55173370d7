use std::{
    fmt::LowerHex,
    fs::{self, Permissions},
    io::{self, BufWriter, Write},
    path::Path,
};

use log::info;
use tempfile::NamedTempFile;

use crate::error::OutputError;

/// First line of every image, identifying the format to the ROM loader.
pub(crate) const HEADER: &str = "v2.0 raw";

/// Values per line.
pub(crate) const LINE_WIDTH: usize = 16;

/// Writes `values` as a raw hex image. Each value is printed in lowercase hex, zero-padded to
/// `digits` (0 for no padding) and followed by a space.
pub(crate) fn write_hex<W, T, I>(out: &mut W, values: I, digits: usize) -> io::Result<()>
where
    W: Write,
    T: LowerHex,
    I: IntoIterator<Item = T>,
{
    writeln!(out, "{}", HEADER)?;
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 && i % LINE_WIDTH == 0 {
            writeln!(out)?;
        }
        write!(out, "{:0width$x} ", value, width = digits)?;
    }
    Ok(())
}

/// Writes a hex image to `path`. The image goes to a temporary file next to `path` that only
/// replaces it once everything has been written. An existing image keeps its permissions, a new
/// one is readable by everyone.
pub(crate) fn write_hex_file<T, I>(path: &Path, values: I, digits: usize) -> Result<(), OutputError>
where
    T: LowerHex,
    I: IntoIterator<Item = T>,
{
    let fail = |e: io::Error| OutputError::new(path, e);
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(fail)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        write_hex(&mut writer, values, digits).map_err(fail)?;
        writer.flush().map_err(fail)?;
    }
    if let Some(permissions) = image_permissions(path) {
        let image = file.as_file();
        image.set_permissions(permissions).map_err(fail)?;
    }
    file.persist(path).map_err(|e| fail(e.error))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Temp files are created owner-only, so the image gets the mode it would have had if written
/// in place.
fn image_permissions(path: &Path) -> Option<Permissions> {
    match fs::metadata(path) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(_) => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;

    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}
