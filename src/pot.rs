use std::path::Path;

/// Line hashcat prints in `--show` output for an entry it has not recovered.
pub const NOT_FOUND_SENTINEL: &str = "[notfound]";

#[derive(Debug, thiserror::Error)]
pub enum PotError {
	#[error("cannot stat potfile {path}: {source}")]
	Unreadable {
		path: String,
		#[source]
		source: std::io::Error,
	},
}

/// Current byte size of the potfile, the cheap change detector for extraction.
pub fn potfile_size(path: &Path) -> Result<u64, PotError> {
	std::fs::metadata(path)
		.map(|m| m.len())
		.map_err(|source| PotError::Unreadable {
			path: path.display().to_string(),
			source,
		})
}

/// Parse `--show --outfile-format=2` output: one plaintext per line. Empty
/// lines and the not-found sentinel are skipped; plaintexts are kept verbatim
/// apart from a trailing `\r`, including bytes that are not UTF-8.
pub fn parse_show_output(output: &[u8]) -> Vec<Vec<u8>> {
	output
		.split(|b| *b == b'\n')
		.map(|l| l.strip_suffix(b"\r").unwrap_or(l))
		.filter(|l| !l.is_empty() && *l != NOT_FOUND_SENTINEL.as_bytes())
		.map(<[u8]>::to_vec)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_plaintexts_with_colons_and_spaces() {
		let found = parse_show_output(b"pa:ss:wd\n hunter2 \r\n");
		assert_eq!(found, vec![b"pa:ss:wd".to_vec(), b" hunter2 ".to_vec()]);
	}

	#[test]
	fn ignores_blank_and_sentinel_lines() {
		let found = parse_show_output(b"\n[notfound]\nletmein\n[notfound]\n\n");
		assert_eq!(found, vec![b"letmein".to_vec()]);
	}

	#[test]
	fn keeps_non_utf8_plaintexts() {
		let found = parse_show_output(b"caf\xe9\nok\n");
		assert_eq!(found, vec![b"caf\xe9".to_vec(), b"ok".to_vec()]);
	}

	#[test]
	fn missing_potfile_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		assert!(potfile_size(&dir.path().join("nope.potfile")).is_err());
	}
}
