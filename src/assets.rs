//! Template and stylesheet assets.
//!
//! A component either carries its markup inline or points at files. File
//! assets are loaded explicitly (see [`ComponentDefinition::load_assets`]);
//! until then, connecting an instance is deferred.
//!
//! [`ComponentDefinition::load_assets`]: crate::definition::ComponentDefinition::load_assets

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Result, RuntimeError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assets {
    pub template: String,
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Inline(Assets),
    Files {
        template_path: Option<PathBuf>,
        style_path: Option<PathBuf>,
    },
}

impl AssetSource {
    pub fn is_inline(&self) -> bool {
        matches!(self, AssetSource::Inline(_))
    }

    /// Read the assets, failing on the first unreadable file
    pub fn load(&self) -> Result<Assets> {
        match self {
            AssetSource::Inline(assets) => Ok(assets.clone()),
            AssetSource::Files {
                template_path,
                style_path,
            } => {
                let template = match template_path {
                    Some(path) => read(path)?,
                    None => String::new(),
                };
                let style = match style_path {
                    Some(path) => read(&map_style_path(path))?,
                    None => String::new(),
                };
                Ok(Assets { template, style })
            }
        }
    }

    /// Read the assets, logging failures and substituting empty text
    pub fn load_or_empty(&self) -> Assets {
        match self {
            AssetSource::Inline(assets) => assets.clone(),
            AssetSource::Files {
                template_path,
                style_path,
            } => {
                let template = template_path
                    .as_deref()
                    .map(|p| read_or_empty(p, "template"))
                    .unwrap_or_default();
                let style = style_path
                    .as_deref()
                    .map(|p| read_or_empty(&map_style_path(p), "style"))
                    .unwrap_or_default();
                Assets { template, style }
            }
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| RuntimeError::AssetLoad {
        path: path.to_path_buf(),
        source,
    })
}

fn read_or_empty(path: &Path, kind: &str) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Component {} load failed {:?}: {}", kind, path, e);
            String::new()
        }
    }
}

/// Sass sources are served as their compiled `.css` sibling
pub fn map_style_path(path: &Path) -> PathBuf {
    if path.extension().map(|e| e == "scss").unwrap_or(false) {
        path.with_extension("css")
    } else {
        path.to_path_buf()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

/// Find `*.html` templates under `dir` and pair each with a same-stem
/// stylesheet (`.css` preferred over `.scss`). Keyed by file stem.
pub fn discover_assets(dir: &Path) -> IndexMap<String, AssetSource> {
    let mut catalog = IndexMap::new();

    if !dir.exists() {
        return catalog;
    }

    let mut templates: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && path.extension().map(|e| e == "html").unwrap_or(false))
        .collect();
    templates.sort();

    for template in templates {
        let Some(stem) = template.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            continue;
        };
        let style_path = ["css", "scss"]
            .iter()
            .map(|ext| template.with_extension(ext))
            .find(|p| p.exists());

        if catalog.contains_key(&stem) {
            tracing::warn!("Duplicate component template '{}' at {:?}; keeping the first", stem, template);
            continue;
        }
        catalog.insert(
            stem,
            AssetSource::Files {
                template_path: Some(template),
                style_path,
            },
        );
    }

    catalog
}
