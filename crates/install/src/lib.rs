use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct InstallReport {
    pub files_copied: usize,
    pub dirs_created: usize,
}

/// Recursively copies `source` into `dest`, recreating the directory
/// layout. Any walk or copy failure aborts the install.
pub fn install_tree(source: &Utf8Path, dest: &Utf8Path) -> Result<InstallReport> {
    if !source.exists() {
        anyhow::bail!("source tree {source} missing");
    }
    let mut report = InstallReport::default();
    fs::create_dir_all(dest)?;

    for entry in WalkDir::new(source) {
        let entry = entry.with_context(|| format!("walking {source}"))?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .expect("walked entry is under its root");
        let rel = Utf8PathBuf::from(rel.to_string_lossy().to_string());
        if entry.file_type().is_dir() {
            if !rel.as_str().is_empty() {
                fs::create_dir_all(dest.join(&rel))?;
                report.dirs_created += 1;
            }
            continue;
        }
        let target = dest.join(&rel);
        fs::copy(entry.path(), &target)
            .with_context(|| format!("copying {rel} into {dest}"))?;
        report.files_copied += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).unwrap()
    }

    #[test]
    fn copies_a_nested_tree() {
        let src_dir = tempfile::tempdir().unwrap();
        let dst_dir = tempfile::tempdir().unwrap();
        let src = utf8(src_dir.path());
        let dst = utf8(dst_dir.path()).join(".agent");

        fs::create_dir_all(src.join("skills/converter")).unwrap();
        fs::write(src.join("skills/SKILL.md"), "top").unwrap();
        fs::write(src.join("skills/converter/convert.md"), "nested").unwrap();

        let report = install_tree(&src, &dst).unwrap();
        assert_eq!(report.files_copied, 2);
        assert_eq!(
            fs::read_to_string(dst.join("skills/converter/convert.md")).unwrap(),
            "nested"
        );
    }

    #[test]
    fn missing_source_fails_before_copying() {
        let dst_dir = tempfile::tempdir().unwrap();
        let dst = utf8(dst_dir.path()).join(".agent");
        let err = install_tree(Utf8Path::new("/no/such/tree"), &dst).unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert!(!dst.exists());
    }
}
