use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, tempdir};

// Stand-in for hashcat: `--show` prints recovered.txt, every other call is
// logged, grows the potfile and exits 1 (exhausted). With a `grow` marker
// present, each attack also "recovers" one new password.
#[cfg(unix)]
const FAKE_HASHCAT: &str = r#"#!/bin/sh
DIR="$(cd "$(dirname "$0")" && pwd)"
pot=""
show=0
prev=""
for a in "$@"; do
  [ "$a" = "--show" ] && show=1
  [ "$prev" = "--potfile-path" ] && pot="$a"
  prev="$a"
done
if [ "$show" -eq 1 ]; then
  [ -f "$DIR/recovered.txt" ] && cat "$DIR/recovered.txt"
  exit 0
fi
echo "$@" >> "$DIR/calls.log"
if [ -f "$DIR/grow" ]; then
  n=$(wc -l < "$DIR/recovered.txt" | tr -d ' ')
  echo "grown$n" >> "$DIR/recovered.txt"
fi
[ -n "$pot" ] && echo "hash:pw" >> "$pot"
exit 1
"#;

#[cfg(unix)]
struct Lab {
    tmp: TempDir,
}

#[cfg(unix)]
impl Lab {
    fn new(recovered: &[&str]) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let root = tmp.path();
        let bin_dir = root.join("hashcat");
        fs::create_dir_all(bin_dir.join("rules")).unwrap();
        fs::create_dir_all(root.join("dico")).unwrap();

        let bin = bin_dir.join("hashcat.bin");
        fs::write(&bin, FAKE_HASHCAT).unwrap();
        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();

        let mut rec = recovered.join("\n");
        if !rec.is_empty() {
            rec.push('\n');
        }
        fs::write(bin_dir.join("recovered.txt"), rec).unwrap();
        fs::write(bin_dir.join("rules").join("toggle.rule"), ":\n").unwrap();
        fs::write(root.join("hashes.txt"), "5f4dcc3b5aa765d61d8327deb882cf99\n").unwrap();
        fs::write(root.join("historical.dico"), "oldpw\n").unwrap();
        fs::write(root.join("hashcat.potfile"), "seed:seed\n").unwrap();
        Self { tmp }
    }

    fn root(&self) -> &Path {
        self.tmp.path()
    }

    fn hashcat_dir(&self) -> PathBuf {
        self.root().join("hashcat")
    }

    fn stats(&self) -> PathBuf {
        self.root().join("dict-stats.json")
    }

    fn cmd(&self) -> Command {
        let root = self.root();
        let mut cmd = Command::cargo_bin("pownmyhash").unwrap();
        cmd.current_dir(root)
            .arg("--hashcat")
            .arg(self.hashcat_dir().join("hashcat.bin"))
            .arg("--hashes")
            .arg(root.join("hashes.txt"))
            .arg("--rules")
            .arg(self.hashcat_dir().join("rules"))
            .arg("--dicts")
            .arg(root.join("dico"))
            .arg("--historical")
            .arg(root.join("historical.dico"))
            .arg("--dict-stats")
            .arg(self.stats())
            .arg("--potfile")
            .arg(root.join("hashcat.potfile"))
            .arg("--color")
            .arg("never")
            .arg("--yes");
        cmd
    }

    fn calls(&self) -> String {
        fs::read_to_string(self.hashcat_dir().join("calls.log")).unwrap_or_default()
    }
}

#[cfg(unix)]
#[test]
fn historical_phase_merges_recovered_passwords() {
    let lab = Lab::new(&["zebra", "alice", "alice"]);
    lab.cmd()
        .args(["--order", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Campaign Results"))
        .stdout(predicate::str::contains("1. Historical dictionary"));

    let historical = fs::read_to_string(lab.root().join("historical.dico")).unwrap();
    assert_eq!(historical, "alice\noldpw\nzebra\n");
    let custom = fs::read_to_string(lab.root().join("hashes.txt.dict")).unwrap();
    assert_eq!(custom, "alice\nzebra\n");

    let calls = lab.calls();
    assert!(calls.contains("-m 0"));
    assert!(calls.contains("-a 0"));
    assert!(calls.contains("toggle.rule"));
    assert!(calls.contains("--session=pownmyhash_"));
}

#[cfg(unix)]
#[test]
fn explicit_type_overrides_detection() {
    let lab = Lab::new(&["alice"]);
    lab.cmd()
        .args(["--type", "ntlm", "--order", "5", "-q"])
        .assert()
        .success();
    let calls = lab.calls();
    assert!(calls.contains("-m 1000"));
    assert!(calls.contains("-a 3 ?a?a?a?a?a?a?a?a"));
}

#[cfg(unix)]
#[test]
fn dictionary_sweep_records_ranking() {
    let lab = Lab::new(&[]);
    fs::write(lab.root().join("dico").join("a.dico"), "password\n").unwrap();
    fs::write(lab.hashcat_dir().join("grow"), "").unwrap();
    lab.cmd()
        .args(["--order", "3", "--max-rounds", "1", "-q"])
        .assert()
        .success();

    let stats = fs::read_to_string(lab.stats()).unwrap();
    assert!(stats.contains("\"a.dico\": 2"), "{}", stats);
    let historical = fs::read_to_string(lab.root().join("historical.dico")).unwrap();
    assert!(historical.contains("grown0"));
}

#[cfg(unix)]
#[test]
fn missing_best64_aborts_phase_but_not_run() {
    let lab = Lab::new(&["alice"]);
    lab.cmd()
        .args(["--order", "6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("best64.rule not found"));
    assert!(lab.calls().is_empty());
}

#[cfg(unix)]
#[test]
fn export_ranking_writes_csv() {
    let lab = Lab::new(&[]);
    fs::write(lab.stats(), r#"{"small.dico": 1, "big.dico": 9}"#).unwrap();
    let out = lab.root().join("ranking.csv");
    Command::cargo_bin("pownmyhash")
        .unwrap()
        .arg("--show-ranking")
        .arg("--color")
        .arg("never")
        .arg("--dict-stats")
        .arg(lab.stats())
        .arg("--dicts")
        .arg(lab.root().join("dico"))
        .arg("--export-ranking")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dictionary Ranking"))
        .stdout(predicate::str::contains("big.dico"));
    let csv = fs::read_to_string(&out).unwrap();
    assert!(csv.starts_with("rank,dictionary,score\n1,big.dico,9\n"));
}

#[test]
fn missing_hash_file_fails() {
    let tmp = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("pownmyhash").unwrap();
    cmd.arg("--hashes")
        .arg(tmp.path().join("nope.txt"))
        .arg("--yes");
    cmd.assert().failure().code(2);
}

#[test]
fn missing_hashcat_fails() {
    let tmp = tempdir().unwrap();
    let hashes = tmp.path().join("hashes.txt");
    fs::write(&hashes, "5f4dcc3b5aa765d61d8327deb882cf99\n").unwrap();
    let mut cmd = Command::cargo_bin("pownmyhash").unwrap();
    cmd.arg("--hashes")
        .arg(&hashes)
        .arg("--hashcat")
        .arg(tmp.path().join("no-hashcat.bin"))
        .arg("--yes");
    cmd.assert().failure().code(3);
}

#[test]
fn hashes_required_without_show_ranking() {
    let mut cmd = Command::cargo_bin("pownmyhash").unwrap();
    cmd.arg("--yes");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--hashes"));
}
