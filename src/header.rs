use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::error::{ConvertError, Result};

/// Read the first `n` lines of `path`, newline stripped.
pub fn read_header(path: &Path, n: usize) -> Result<Vec<String>> {
    let mut rdr = BufReader::new(File::open(path).map_err(|e| ConvertError::io(path, e))?);
    read_header_from(&mut rdr, n, path)
}

/// Same as [`read_header`] but pulls from an already open reader, leaving it
/// positioned on the first line after the header block.
///
/// `path` is only used for error messages.
pub fn read_header_from<R: BufRead>(rdr: &mut R, n: usize, path: &Path) -> Result<Vec<String>> {
    let mut lines = Vec::with_capacity(n);
    let mut buf = String::new();
    while lines.len() < n {
        buf.clear();
        if rdr.read_line(&mut buf).map_err(|e| ConvertError::io(path, e))? == 0 {
            return Err(ConvertError::MalformedHeader {
                path: path.to_path_buf(),
                reason: format!("expected {} header lines, file ends after {}", n, lines.len()),
            });
        }
        let line = buf.strip_suffix('\n').unwrap_or(&buf);
        let line = line.strip_suffix('\r').unwrap_or(line);
        lines.push(line.to_string());
    }
    Ok(lines)
}
