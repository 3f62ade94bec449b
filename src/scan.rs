use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

pub fn default_m2_repository() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot resolve home directory"))?;
    Ok(home.join(".m2").join("repository"))
}

/// Narrows the scan root for a class name by walking its package segments
/// down from the repository root as far as directories exist.
pub fn infer_scan_path(repo: &Path, class_name: &str) -> PathBuf {
    let parts: Vec<&str> = class_name.split('.').collect();
    if parts.len() < 3 {
        return repo.to_path_buf();
    }

    for i in (2..parts.len().saturating_sub(1)).rev() {
        let prefix = parts[..i].join("/");
        let path = repo.join(prefix);
        if path.exists() {
            return path;
        }
    }

    repo.to_path_buf()
}

pub fn scan_jars(base_path: &Path) -> Result<Vec<PathBuf>> {
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == "jar") {
                    let _ = tx.send(path.to_path_buf());
                }
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    let mut jars: Vec<PathBuf> = rx.iter().collect();
    jars.sort();
    Ok(jars)
}

/// Maven layout puts the version directory right above the jar.
pub fn extract_version_from_maven_path(jar_path: &Path) -> Option<String> {
    jar_path
        .parent()
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::temp_dir;
    use std::fs;

    #[test]
    fn infer_scan_path_picks_existing_prefix() -> anyhow::Result<()> {
        let base = temp_dir("scan-infer");
        let repo = base.join("repository");
        let target = repo.join("org/apache/commons");
        fs::create_dir_all(&target)?;

        let inferred = infer_scan_path(&repo, "org.apache.commons.lang3.StringUtils");
        assert_eq!(inferred, target);

        fs::remove_dir_all(base)?;
        Ok(())
    }

    #[test]
    fn scan_jars_finds_nested_jars_sorted() -> anyhow::Result<()> {
        let base = temp_dir("scan-jars");
        let a = base.join("org/example/a/1.0/a-1.0.jar");
        let b = base.join("org/example/b/2.0/b-2.0.jar");
        for p in [&a, &b] {
            fs::create_dir_all(p.parent().unwrap())?;
            fs::write(p, b"stub")?;
        }
        fs::write(base.join("org/example/readme.txt"), b"not a jar")?;

        let jars = scan_jars(&base)?;
        assert_eq!(jars, vec![a, b]);

        fs::remove_dir_all(base)?;
        Ok(())
    }

    #[test]
    fn version_comes_from_the_parent_directory() {
        let jar = Path::new("/repo/org/example/demo/1.4.2/demo-1.4.2.jar");
        assert_eq!(
            extract_version_from_maven_path(jar).as_deref(),
            Some("1.4.2")
        );
    }
}
