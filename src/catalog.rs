use std::io;
use std::path::{Path, PathBuf};

pub const RULE_EXTENSION: &str = "rule";
pub const DICT_EXTENSION: &str = "dico";
pub const BEST64_RULE: &str = "best64.rule";

/// Regular files in `dir` with the given extension, sorted by path.
pub fn list_with_extension(dir: &Path, ext: &str) -> io::Result<Vec<PathBuf>> {
	let mut out: Vec<PathBuf> = std::fs::read_dir(dir)?
		.filter_map(|e| e.ok())
		.map(|e| e.path())
		.filter(|p| p.is_file() && p.extension().is_some_and(|e| e == ext))
		.collect();
	out.sort();
	Ok(out)
}

pub fn rule_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
	list_with_extension(dir, RULE_EXTENSION)
}

pub fn dictionaries(dir: &Path) -> io::Result<Vec<PathBuf>> {
	list_with_extension(dir, DICT_EXTENSION)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lists_matching_files_sorted() {
		let dir = tempfile::tempdir().unwrap();
		for name in ["b.dico", "a.dico", "notes.txt", "x.rule"] {
			std::fs::write(dir.path().join(name), "").unwrap();
		}
		std::fs::create_dir(dir.path().join("sub.dico")).unwrap();
		let dicts = dictionaries(dir.path()).unwrap();
		assert_eq!(dicts, vec![dir.path().join("a.dico"), dir.path().join("b.dico")]);
		assert_eq!(rule_files(dir.path()).unwrap(), vec![dir.path().join("x.rule")]);
	}

	#[test]
	fn missing_directory_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		assert!(dictionaries(&dir.path().join("nope")).is_err());
	}
}
