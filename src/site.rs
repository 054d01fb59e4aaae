//! Site workbooks in the data directory.
//!
//! Every construction site is stored as its own JSON workbook named
//! `<site_name>_site.json`. This module handles naming, discovery and picking
//! the workbook a command operates on.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::db::Database;
use crate::error::{AppError, Result};

const SUFFIX: &str = "_site";

/// A site with its display name and workbook path.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub name: String,
    pub display_name: String,
    pub file_path: PathBuf,
}

impl Site {
    pub fn new(display_name: &str, data_dir: &Path) -> Self {
        let name = sanitize_site_name(display_name);
        let file_path = data_dir.join(format!("{name}{SUFFIX}.json"));
        Site {
            name,
            display_name: display_name.trim().to_string(),
            file_path,
        }
    }

    /// Recognise a workbook file by its `_site.json` suffix.
    pub fn from_file(file_path: PathBuf) -> Option<Self> {
        if file_path.extension()? != "json" {
            return None;
        }
        let stem = file_path.file_stem()?.to_str()?;
        let name = stem.strip_suffix(SUFFIX)?;
        if name.is_empty() {
            return None;
        }
        Some(Site {
            name: name.to_string(),
            display_name: name.replace('_', " "),
            file_path,
        })
    }

    fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.file_path).and_then(|m| m.modified()).ok()
    }
}

/// Lowercase, with runs of anything but letters and digits collapsed to `_`.
pub fn sanitize_site_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// All site workbooks in `data_dir`, sorted by display name.
pub fn discover_sites(data_dir: &Path) -> Result<Vec<Site>> {
    let io_err = |source| AppError::Io {
        path: data_dir.display().to_string(),
        source,
    };
    let mut sites = Vec::new();
    if !data_dir.exists() {
        return Ok(sites);
    }
    for entry in fs::read_dir(data_dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() {
            if let Some(site) = Site::from_file(path) {
                sites.push(site);
            }
        }
    }
    sites.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    Ok(sites)
}

/// Create an empty workbook for a new site.
pub fn create_site(display_name: &str, data_dir: &Path) -> Result<Site> {
    if sanitize_site_name(display_name).is_empty() {
        return Err(AppError::rejected("site name cannot be empty"));
    }
    let site = Site::new(display_name, data_dir);
    if site.file_path.exists() {
        return Err(AppError::rejected(format!("site '{display_name}' already exists")));
    }
    fs::create_dir_all(data_dir).map_err(|source| AppError::Io {
        path: data_dir.display().to_string(),
        source,
    })?;
    Database::default().save(&site.file_path)?;
    log::info!("created site {}", site.file_path.display());
    Ok(site)
}

/// The site whose workbook was modified last.
pub fn most_recent_site(data_dir: &Path) -> Result<Option<Site>> {
    Ok(discover_sites(data_dir)?
        .into_iter()
        .filter_map(|s| s.modified().map(|m| (s, m)))
        .max_by_key(|(_, m)| *m)
        .map(|(s, _)| s))
}

/// Pick the workbook path: explicit `--db`, then the configured default
/// site, then the most recently used site, then `default_site.json`.
pub fn resolve_workbook(
    explicit: Option<PathBuf>,
    default_site: Option<&str>,
    data_dir: &Path,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    if let Some(name) = default_site {
        return Ok(Site::new(name, data_dir).file_path);
    }
    if let Some(site) = most_recent_site(data_dir)? {
        return Ok(site.file_path);
    }
    Ok(Site::new("default", data_dir).file_path)
}
