//! File plumbing shared by the credential store and the ranking table.
//!
//! Wordlists read here can grow to hundreds of megabytes over many campaigns,
//! so readers switch to a memory map above a size threshold. Every rewrite goes
//! through [`write_atomic`]: the new content lands in a temporary sibling file
//! which is then renamed over the target.
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;
use tempfile::NamedTempFile;

/// Threshold in bytes above which wordlists are memory-mapped.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

/// Decide whether to use mmap based on file size and threshold.
pub fn should_use_mmap(file_size_bytes: u64, threshold_bytes: u64) -> bool {
    file_size_bytes >= threshold_bytes
}

/// Read every non-empty line of `path`, picking buffered or mmap reading from
/// the file size. Trailing `\r` is stripped; line bytes are kept as they are,
/// valid UTF-8 or not.
pub fn read_lines<P: AsRef<Path>>(path: P, threshold_bytes: u64) -> Result<Vec<Vec<u8>>> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    if meta.len() == 0 {
        return Ok(Vec::new());
    }
    if meta.is_file() && should_use_mmap(meta.len(), threshold_bytes) {
        read_lines_mmap(path)
    } else {
        read_lines_bufread(path)
    }
}

fn read_lines_bufread(path: &Path) -> Result<Vec<Vec<u8>>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for chunk in BufReader::new(file).split(b'\n') {
        let chunk = chunk.with_context(|| format!("read {}", path.display()))?;
        if let Some(line) = line_from_bytes(&chunk) {
            out.push(line);
        }
    }
    Ok(out)
}

fn read_lines_mmap(path: &Path) -> Result<Vec<Vec<u8>>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {}", path.display()))?;
    let data: &[u8] = &mmap;
    let mut out = Vec::new();
    let mut start = 0;
    for end in memchr::memchr_iter(b'\n', data) {
        if let Some(line) = line_from_bytes(&data[start..end]) {
            out.push(line);
        }
        start = end + 1;
    }
    // last line without trailing newline
    if start < data.len() {
        if let Some(line) = line_from_bytes(&data[start..]) {
            out.push(line);
        }
    }
    Ok(out)
}

fn line_from_bytes(bytes: &[u8]) -> Option<Vec<u8>> {
    let slice = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    if slice.is_empty() {
        return None;
    }
    Some(slice.to_vec())
}

/// Replace `path` with `contents` via a temporary file in the same directory.
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temporary file in {}", dir.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("write {}", tmp.path().display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("sync {}", tmp.path().display()))?;
    tmp.persist(path)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

/// Write one entry per line, each terminated by `\n`.
pub fn write_lines_atomic<P: AsRef<Path>, L: AsRef<[u8]>>(path: P, lines: &[L]) -> Result<()> {
    let size = lines.iter().map(|l| l.as_ref().len() + 1).sum();
    let mut buf = Vec::with_capacity(size);
    for line in lines {
        buf.extend_from_slice(line.as_ref());
        buf.push(b'\n');
    }
    write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bufread_and_mmap_agree() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("words.dico");
        std::fs::write(&p, "alpha\r\n\nbeta\ngamma delta").unwrap();
        let small = read_lines(&p, u64::MAX).unwrap();
        let mapped = read_lines(&p, 1).unwrap();
        assert_eq!(small, vec![b"alpha".to_vec(), b"beta".to_vec(), b"gamma delta".to_vec()]);
        assert_eq!(small, mapped);
    }

    #[test]
    fn non_utf8_lines_survive_a_rewrite() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("latin1.dico");
        std::fs::write(&p, b"caf\xe9\r\nzzz\n").unwrap();
        for threshold in [u64::MAX, 1] {
            let lines = read_lines(&p, threshold).unwrap();
            assert_eq!(lines, vec![b"caf\xe9".to_vec(), b"zzz".to_vec()]);
        }
        let lines = read_lines(&p, u64::MAX).unwrap();
        write_lines_atomic(&p, &lines).unwrap();
        assert_eq!(std::fs::read(&p).unwrap(), b"caf\xe9\nzzz\n");
    }

    #[test]
    fn empty_file_reads_as_no_lines() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("empty.dico");
        std::fs::write(&p, "").unwrap();
        assert!(read_lines(&p, 1).unwrap().is_empty());
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("out.txt");
        std::fs::write(&p, "old content that is longer").unwrap();
        write_lines_atomic(&p, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(std::fs::read_to_string(&p).unwrap(), "a\nb\n");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
