//! In-place PNG → WebP conversion for project assets.
//!
//! Walks the projects tree, writes `<stem>.webp` beside every PNG, and
//! deletes the PNG once its replacement is on disk. The report lists the
//! URL rewrites site content needs:
//!
//! ```text
//! /projects/demo/hero.png → /projects/demo/hero.webp
//! ```

use crate::config::ProjectsConfig;
use crate::imaging::{ConvertParams, ImageBackend, Quality};
use crate::naming;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProjectsError {
    #[error("Projects root not found: {0}")]
    RootNotFound(PathBuf),
    #[error("Failed to walk {0}: {1}")]
    Walk(PathBuf, #[source] walkdir::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectsOptions {
    pub quality: Quality,
    pub delete_source: bool,
    pub url_prefix: String,
}

impl ProjectsOptions {
    pub fn from_config(config: &ProjectsConfig) -> Self {
        Self {
            quality: Quality::new(config.quality),
            delete_source: config.delete_source,
            url_prefix: config.url_prefix.clone(),
        }
    }
}

/// Old → new public URL for one converted asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlMapping {
    pub old: String,
    pub new: String,
}

/// What happened to the PNG after a successful encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDisposition {
    Kept,
    Deleted,
    /// The WebP was written but the PNG could not be removed.
    DeleteFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectOutcome {
    Converted {
        output: PathBuf,
        mapping: UrlMapping,
        disposition: SourceDisposition,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectItem {
    pub source: PathBuf,
    pub outcome: ProjectOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectsReport {
    pub items: Vec<ProjectItem>,
}

impl ProjectsReport {
    pub fn mappings(&self) -> impl Iterator<Item = &UrlMapping> {
        self.items.iter().filter_map(|item| match &item.outcome {
            ProjectOutcome::Converted { mapping, .. } => Some(mapping),
            ProjectOutcome::Failed { .. } => None,
        })
    }

    pub fn converted(&self) -> usize {
        self.mappings().count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.converted()
    }
}

/// Join `prefix` and a relative path with forward slashes.
pub fn public_url(prefix: &str, relative: &Path) -> String {
    let rel = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let prefix = prefix.trim_end_matches('/');
    format!("{prefix}/{rel}")
}

/// Every `*.png` (any case) under `root`, in sorted order.
pub fn find_pngs(root: &Path) -> Result<Vec<PathBuf>, ProjectsError> {
    let mut pngs = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| ProjectsError::Walk(root.to_path_buf(), e))?;
        if entry.file_type().is_file() && naming::has_extension(entry.path(), &["png"]) {
            pngs.push(entry.into_path());
        }
    }
    Ok(pngs)
}

/// Convert every PNG under `root` to WebP beside it.
pub fn convert_projects(
    backend: &impl ImageBackend,
    root: &Path,
    options: &ProjectsOptions,
) -> Result<ProjectsReport, ProjectsError> {
    if !root.is_dir() {
        return Err(ProjectsError::RootNotFound(root.to_path_buf()));
    }

    let items = find_pngs(root)?
        .into_iter()
        .map(|source| {
            let outcome = convert_png(backend, root, &source, options);
            ProjectItem { source, outcome }
        })
        .collect();

    Ok(ProjectsReport { items })
}

fn convert_png(
    backend: &impl ImageBackend,
    root: &Path,
    source: &Path,
    options: &ProjectsOptions,
) -> ProjectOutcome {
    let output = source.with_extension("webp");
    if let Err(e) = backend.convert(&ConvertParams {
        source: source.to_path_buf(),
        output: output.clone(),
        quality: options.quality,
    }) {
        return ProjectOutcome::Failed {
            reason: e.to_string(),
        };
    }

    let relative = source.strip_prefix(root).unwrap_or(source);
    let mapping = UrlMapping {
        old: public_url(&options.url_prefix, relative),
        new: public_url(&options.url_prefix, &relative.with_extension("webp")),
    };

    let disposition = if !options.delete_source {
        SourceDisposition::Kept
    } else {
        match std::fs::remove_file(source) {
            Ok(()) => SourceDisposition::Deleted,
            Err(e) => {
                log::warn!("could not delete {}: {e}", source.display());
                SourceDisposition::DeleteFailed(e.to_string())
            }
        }
    };

    ProjectOutcome::Converted {
        output,
        mapping,
        disposition,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use std::fs;
    use tempfile::TempDir;

    fn options(delete_source: bool) -> ProjectsOptions {
        ProjectsOptions {
            quality: Quality::new(85),
            delete_source,
            url_prefix: "/projects".to_string(),
        }
    }

    fn setup_tree(root: &Path) {
        fs::create_dir_all(root.join("alpha/img")).unwrap();
        fs::create_dir_all(root.join("beta")).unwrap();
        fs::write(root.join("alpha/img/hero.png"), b"png").unwrap();
        fs::write(root.join("alpha/cover.PNG"), b"png").unwrap();
        fs::write(root.join("beta/shot.png"), b"png").unwrap();
        fs::write(root.join("beta/notes.md"), b"# notes").unwrap();
    }

    #[test]
    fn public_url_uses_forward_slashes() {
        let rel = Path::new("alpha").join("img").join("hero.png");
        assert_eq!(public_url("/projects/", &rel), "/projects/alpha/img/hero.png");
    }

    #[test]
    fn find_pngs_recurses_in_order() {
        let tmp = TempDir::new().unwrap();
        setup_tree(tmp.path());

        let found: Vec<_> = find_pngs(tmp.path())
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            found,
            vec![
                Path::new("alpha/cover.PNG").to_path_buf(),
                Path::new("alpha/img/hero.png").to_path_buf(),
                Path::new("beta/shot.png").to_path_buf(),
            ]
        );
    }

    #[test]
    fn convert_deletes_sources_and_maps_urls() {
        let tmp = TempDir::new().unwrap();
        setup_tree(tmp.path());

        let report = convert_projects(&MockBackend::new(), tmp.path(), &options(true)).unwrap();

        assert_eq!(report.converted(), 3);
        assert!(tmp.path().join("alpha/img/hero.webp").exists());
        assert!(!tmp.path().join("alpha/img/hero.png").exists());
        assert!(tmp.path().join("beta/notes.md").exists());

        let mappings: Vec<_> = report.mappings().cloned().collect();
        assert_eq!(
            mappings[1],
            UrlMapping {
                old: "/projects/alpha/img/hero.png".to_string(),
                new: "/projects/alpha/img/hero.webp".to_string(),
            }
        );
    }

    #[test]
    fn keep_source_leaves_pngs() {
        let tmp = TempDir::new().unwrap();
        setup_tree(tmp.path());

        convert_projects(&MockBackend::new(), tmp.path(), &options(false)).unwrap();

        assert!(tmp.path().join("beta/shot.png").exists());
        assert!(tmp.path().join("beta/shot.webp").exists());
    }

    #[test]
    fn failed_conversion_keeps_source() {
        let tmp = TempDir::new().unwrap();
        setup_tree(tmp.path());
        let backend = MockBackend::failing_on("shot");

        let report = convert_projects(&backend, tmp.path(), &options(true)).unwrap();

        assert_eq!(report.converted(), 2);
        assert_eq!(report.failed(), 1);
        assert!(tmp.path().join("beta/shot.png").exists());
        assert!(!tmp.path().join("beta/shot.webp").exists());
    }

    #[test]
    fn missing_root_is_error() {
        let result = convert_projects(
            &MockBackend::new(),
            Path::new("/nonexistent/projects"),
            &options(true),
        );
        assert!(matches!(result, Err(ProjectsError::RootNotFound(_))));
    }
}
