use anyhow::Result;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::scan::{default_m2_repository, infer_scan_path, scan_jars};

pub fn resolve_repo(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = cli.repo.clone() {
        return Ok(p);
    }
    default_m2_repository()
}

/// The jars a chain is built over: the explicit `--jar` list when given,
/// otherwise whatever the repository scan turns up near the class's package.
pub fn resolve_classpath(cli: &Cli, jars: &[PathBuf], class_name: &str) -> Result<Vec<PathBuf>> {
    if !jars.is_empty() {
        return Ok(jars.to_vec());
    }

    let repo = resolve_repo(cli)?;
    let root = infer_scan_path(&repo, class_name);
    let found = scan_jars(&root)?;
    if found.is_empty() {
        anyhow::bail!(
            "no jars found under {} (pass --jar or --repo)",
            root.display()
        );
    }
    Ok(found)
}
