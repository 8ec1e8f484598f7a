use std::fs::File;
use std::io::{self, Read};
use std::ops::{Deref, DerefMut};
use std::path::Path;

use memmap2::{MmapMut, MmapOptions};

/// Holds the record buffer being sorted — either a private copy-on-write
/// mapping of the input file or an owned Vec. Dereferences to `[u8]`
/// mutably since the sort rearranges it in place.
pub enum FileData {
    Mmap(MmapMut),
    Owned(Vec<u8>),
}

impl Deref for FileData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileData::Mmap(m) => m,
            FileData::Owned(v) => v,
        }
    }
}

impl DerefMut for FileData {
    fn deref_mut(&mut self) -> &mut [u8] {
        match self {
            FileData::Mmap(m) => m,
            FileData::Owned(v) => v,
        }
    }
}

/// A fully framed record buffer: every record, including the last, ends
/// with the separator byte. `padded` records whether the final separator
/// was supplied by the reader rather than the input; the writer trims it
/// back on output.
pub struct InputBuffer {
    pub data: FileData,
    pub padded: bool,
}

/// Read all inputs into one contiguous, separator-framed buffer.
/// A single regular file is mapped copy-on-write (zero-copy, the file
/// itself is never modified); stdin and multi-file inputs are
/// concatenated into an owned Vec.
pub fn read_input(inputs: &[String], separator: u8) -> io::Result<InputBuffer> {
    if inputs.len() == 1 && inputs[0] != "-" {
        if let Some(buf) = map_file_private(Path::new(&inputs[0]), separator)? {
            return Ok(buf);
        }
    }

    let mut data = Vec::new();
    let mut padded = false;
    for input in inputs {
        if input == "-" {
            read_stdin_into(&mut data)?;
        } else {
            let mut file = File::open(input)
                .map_err(|e| io::Error::new(e.kind(), format!("open failed: {}: {}", input, e)))?;
            file.read_to_end(&mut data)?;
        }
        // Complete the framing at each file boundary so the last record of
        // one input cannot fuse with the first record of the next.
        padded = false;
        if !data.is_empty() && data.last() != Some(&separator) {
            data.push(separator);
            padded = true;
        }
    }

    Ok(InputBuffer {
        data: FileData::Owned(data),
        padded,
    })
}

/// Map a regular file as a private copy-on-write region. The sort mutates
/// the mapping; the underlying file stays untouched. Returns None when the
/// file is empty, not regular, missing its trailing separator, or cannot
/// be mapped — the caller falls back to an owned read.
fn map_file_private(path: &Path, separator: u8) -> io::Result<Option<InputBuffer>> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("open failed: {}: {}", path.display(), e),
        )
    })?;
    let metadata = file.metadata()?;
    if metadata.len() == 0 || !metadata.file_type().is_file() {
        return Ok(None);
    }

    match unsafe { MmapOptions::new().map_copy(&file) } {
        Ok(mmap) => {
            if mmap.last() != Some(&separator) {
                // Unframed final record: the owned path appends the separator.
                return Ok(None);
            }
            #[cfg(target_os = "linux")]
            {
                let _ = mmap.advise(memmap2::Advice::Sequential);
            }
            Ok(Some(InputBuffer {
                data: FileData::Mmap(mmap),
                padded: false,
            }))
        }
        Err(_) => Ok(None),
    }
}

/// Read all of stdin into `data`. Pre-reserves 16MB and reads into the
/// spare capacity, avoiding read_to_end's grow-and-probe pattern (extra
/// read() calls and memcpy).
fn read_stdin_into(data: &mut Vec<u8>) -> io::Result<()> {
    const PREALLOC: usize = 16 * 1024 * 1024;
    const MIN_READ: usize = 64 * 1024;

    let mut stdin = io::stdin().lock();
    data.reserve(PREALLOC);

    loop {
        if data.capacity() - data.len() < MIN_READ {
            data.reserve(PREALLOC);
        }
        let start = data.len();
        data.resize(data.capacity(), 0);

        match stdin.read(&mut data[start..]) {
            Ok(0) => {
                data.truncate(start);
                break;
            }
            Ok(n) => data.truncate(start + n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => data.truncate(start),
            Err(e) => {
                data.truncate(start);
                return Err(e);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn maps_framed_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"beta\nalpha\n").unwrap();
        let inputs = vec![f.path().to_str().unwrap().to_string()];

        let buf = read_input(&inputs, b'\n').unwrap();
        assert!(matches!(buf.data, FileData::Mmap(_)));
        assert!(!buf.padded);
        assert_eq!(&buf.data[..], b"beta\nalpha\n");
    }

    #[test]
    fn pads_unterminated_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"beta\nalpha").unwrap();
        let inputs = vec![f.path().to_str().unwrap().to_string()];

        let buf = read_input(&inputs, b'\n').unwrap();
        assert!(matches!(buf.data, FileData::Owned(_)));
        assert!(buf.padded);
        assert_eq!(&buf.data[..], b"beta\nalpha\n");
    }

    #[test]
    fn frames_between_files() {
        let mut a = tempfile::NamedTempFile::new().unwrap();
        a.write_all(b"one\ntwo").unwrap();
        let mut b = tempfile::NamedTempFile::new().unwrap();
        b.write_all(b"three\n").unwrap();
        let inputs = vec![
            a.path().to_str().unwrap().to_string(),
            b.path().to_str().unwrap().to_string(),
        ];

        let buf = read_input(&inputs, b'\n').unwrap();
        assert!(!buf.padded);
        assert_eq!(&buf.data[..], b"one\ntwo\nthree\n");
    }

    #[test]
    fn empty_file_yields_empty_buffer() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let inputs = vec![f.path().to_str().unwrap().to_string()];

        let buf = read_input(&inputs, b'\n').unwrap();
        assert!(buf.data.is_empty());
        assert!(!buf.padded);
    }
}
