use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::scan::{has_extension, scan_sources};

/// Health of one watched folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderStatus {
    pub name: String,
    pub path: PathBuf,
    pub exists: bool,
    /// Renderings in this folder that qualify as source documents.
    pub documents: usize,
    /// Annotation files awaiting or past conversion.
    pub annotation_files: usize,
}

/// Status of every watched folder, in configuration order.
pub fn folder_statuses(config: &Config) -> Result<Vec<FolderStatus>> {
    let docs = scan_sources(config)?;
    let mut statuses = Vec::new();

    for (name, path) in config.paths.watched.iter().zip(config.paths.watched_dirs()) {
        let exists = path.is_dir();
        let documents = docs.iter().filter(|d| d.path.starts_with(&path)).count();
        let annotation_files = if exists {
            walkdir::WalkDir::new(&path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| has_extension(e.path(), &config.scan.annotation_extension))
                .count()
        } else {
            0
        };
        statuses.push(FolderStatus {
            name: name.clone(),
            path,
            exists,
            documents,
            annotation_files,
        });
    }
    Ok(statuses)
}

pub fn list_sources(config: &Config) -> Result<()> {
    let statuses = folder_statuses(config)?;

    println!(
        "{:<16} {:<16} {:>9} {:>11}  PATH",
        "FOLDER", "STATUS", "DOCUMENTS", "ANNOTATIONS"
    );
    for s in &statuses {
        let status = if s.exists { "OK" } else { "MISSING" };
        println!(
            "{:<16} {:<16} {:>9} {:>11}  {}",
            s.name,
            status,
            s.documents,
            s.annotation_files,
            s.path.display()
        );
    }
    println!("destination: {}", config.paths.dest().display());

    Ok(())
}
