//! Backward scan for the last line of a newline-delimited log.
//!
//! The scan reads windows from the end of the file towards its start,
//! doubling the window each time, until it finds the newline that ends the
//! previous line. Cost is proportional to the length of the last line, not
//! to the size of the file.

use std::io::{self, Read, Seek, SeekFrom};

use tracing::trace;

/// First backward window, in bytes.
const INITIAL_WINDOW: u64 = 256;

/// Upper bound for a single backward window, in bytes.
const MAX_WINDOW: u64 = 64 * 1024;

/// Locate the last line of a `len`-byte file.
///
/// Returns the byte range `[start, end)` of the line without its terminator,
/// or `None` when the file is empty. A trailing `\n` belongs to the last
/// line; the scan looks for the newline before it. When no such newline
/// exists the whole content is the last line and `start` is 0.
pub fn last_line_span<R: Read + Seek>(reader: &mut R, len: u64) -> io::Result<Option<(u64, u64)>> {
    if len == 0 {
        return Ok(None);
    }

    let mut last = [0u8; 1];
    reader.seek(SeekFrom::Start(len - 1))?;
    reader.read_exact(&mut last)?;
    let end = if last[0] == b'\n' { len - 1 } else { len };

    let mut window = INITIAL_WINDOW;
    let mut cursor = end;
    let mut buf = Vec::new();
    while cursor > 0 {
        let start = cursor.saturating_sub(window);
        buf.resize((cursor - start) as usize, 0);
        reader.seek(SeekFrom::Start(start))?;
        reader.read_exact(&mut buf)?;

        if let Some(pos) = buf.iter().rposition(|&b| b == b'\n') {
            let line_start = start + pos as u64 + 1;
            trace!(line_start, end, "last line located");
            return Ok(Some((line_start, end)));
        }

        cursor = start;
        window = (window * 2).min(MAX_WINDOW);
    }

    Ok(Some((0, end)))
}

/// Read the last line of a `len`-byte file, trimmed of surrounding ASCII
/// whitespace. Returns `None` when the file is empty.
pub fn read_last_line<R: Read + Seek>(reader: &mut R, len: u64) -> io::Result<Option<Vec<u8>>> {
    let Some((start, end)) = last_line_span(reader, len)? else {
        return Ok(None);
    };

    let mut line = vec![0u8; (end - start) as usize];
    reader.seek(SeekFrom::Start(start))?;
    reader.read_exact(&mut line)?;
    Ok(Some(line.trim_ascii().to_vec()))
}
