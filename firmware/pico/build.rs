use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

// Build script for the Pico firmware:
//   - places memory.x on the linker search path and emits the cortex-m-rt,
//     RP2040 boot2 and defmt linker scripts;
//   - exports PIMODEM_FW_VERSION:
//       "<crate> <semver> (profile <profile>, <git describe|git unknown>, src <digest>)"
//   - writes tmp/<crate>-fw-version.txt (relative to repo root) for host-side tooling.

fn main() {
    let out = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::write(out.join("memory.x"), include_bytes!("memory.x")).expect("write memory.x");
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");

    // `.cargo/config.toml` is not picked up when building from the repo root,
    // so the linker args live here. Skip any that rustflags already carry to
    // avoid duplicate section definitions.
    let rustflags = env::var("CARGO_ENCODED_RUSTFLAGS").unwrap_or_default();
    for arg in ["--nmagic", "-Tlink.x", "-Tlink-rp.x", "-Tdefmt.x"] {
        if !rustflags.contains(arg) {
            println!("cargo:rustc-link-arg-bins={arg}");
        }
    }

    println!("cargo:rerun-if-changed=src/");
    println!("cargo:rerun-if-changed=../../libs/");
    if let Some(head) = git_head_path() {
        println!("cargo:rerun-if-changed={}", head.display());
    }

    let pkg_name = env::var("CARGO_PKG_NAME").unwrap_or_else(|_| "unknown".to_string());
    let pkg_ver = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let git_info = git_describe().unwrap_or_else(|| "git unknown".to_string());
    let src_hash = source_digest()
        .map(|h| format!("src 0x{h:016x}"))
        .unwrap_or_else(|| "src unknown".to_string());

    let version_string =
        format!("{pkg_name} {pkg_ver} (profile {profile}, {git_info}, {src_hash})");
    println!("cargo:rustc-env=PIMODEM_FW_VERSION={version_string}");

    if let Some(repo_root) = repo_root_from_manifest() {
        let tmp_dir = repo_root.join("tmp");
        let _ = fs::create_dir_all(&tmp_dir);
        let _ = fs::write(
            tmp_dir.join(format!("{pkg_name}-fw-version.txt")),
            &version_string,
        );
    }
}

fn repo_root_from_manifest() -> Option<PathBuf> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").ok()?);
    manifest_dir.parent()?.parent().map(Path::to_path_buf)
}

fn git_head_path() -> Option<PathBuf> {
    let head = repo_root_from_manifest()?.join(".git").join("HEAD");
    head.exists().then_some(head)
}

fn git_describe() -> Option<String> {
    let repo_root = repo_root_from_manifest()?;
    let output = Command::new("git")
        .arg("-C")
        .arg(&repo_root)
        .args(["describe", "--tags", "--dirty", "--always"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let s = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if s.is_empty() { None } else { Some(format!("git {s}")) }
}

// FNV-1a over the firmware and shared lib sources, so a dirty tree without
// git still yields a distinguishable version string.
fn source_digest() -> Option<u64> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").ok()?);
    let mut roots = vec![manifest_dir.join("src")];
    if let Some(repo_root) = repo_root_from_manifest() {
        roots.push(repo_root.join("libs"));
    }

    let mut hash: u64 = 0xcbf29ce484222325;

    fn hash_bytes(state: &mut u64, bytes: &[u8]) {
        for &b in bytes {
            *state ^= u64::from(b);
            *state = state.wrapping_mul(0x100000001b3);
        }
    }

    fn walk_dir(dir: &Path, state: &mut u64) -> std::io::Result<()> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
            .map(|e| e.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        // read_dir order is filesystem-dependent.
        entries.sort();
        for path in entries {
            if path.is_dir() {
                walk_dir(&path, state)?;
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                hash_bytes(state, path.to_string_lossy().as_bytes());
                hash_bytes(state, &fs::read(&path)?);
            }
        }
        Ok(())
    }

    for root in roots.iter().filter(|r| r.is_dir()) {
        walk_dir(root, &mut hash).ok()?;
    }
    Some(hash)
}
