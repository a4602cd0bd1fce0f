//! Template asset sources
//!
//! The engine only requires the ability to load a template by identifier;
//! where the bytes live is the caller's concern. `DirectorySource` covers
//! the common bundled-assets layout, `MemorySource` covers tests and
//! embedded assets.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{VisionError, VisionResult};
use crate::matching::{Template, TemplateCategory};

/// Loader for template images, keyed by identifier.
pub trait TemplateSource {
    fn load(&self, id: &str) -> VisionResult<Template>;
}

/// Templates stored as `<root>/<category>/<name>.png`.
///
/// Identifiers take the form `category/name` (e.g. `ui/attack-button`). The
/// category directory is one of the enumerated [`TemplateCategory`] names;
/// anything else is rejected rather than silently defaulted.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate loadable identifiers, walking one category directory per
    /// enumerated category. Files that are not `.png` are skipped with a
    /// log entry, as are category directories that do not exist.
    pub fn scan(&self) -> VisionResult<Vec<String>> {
        let mut ids = Vec::new();
        for category in TemplateCategory::ALL {
            let dir = self.root.join(category.dir_name());
            if !dir.is_dir() {
                continue;
            }
            let entries = std::fs::read_dir(&dir).map_err(|source| VisionError::AssetStore {
                path: dir.clone(),
                source,
            })?;
            for entry in entries {
                let entry = entry.map_err(|source| VisionError::AssetStore {
                    path: dir.clone(),
                    source,
                })?;
                let path = entry.path();
                match path.extension().and_then(|e| e.to_str()) {
                    Some("png") => {
                        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                            ids.push(format!("{}/{stem}", category.dir_name()));
                        }
                    }
                    _ => {
                        log::debug!("skipping non-template file {path:?}");
                    }
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl TemplateSource for DirectorySource {
    fn load(&self, id: &str) -> VisionResult<Template> {
        let (dir_name, name) = id.split_once('/').ok_or_else(|| {
            VisionError::TemplateNotFound {
                id: id.to_string(),
            }
        })?;
        let category = TemplateCategory::from_dir_name(dir_name).ok_or_else(|| {
            VisionError::UnknownCategory {
                id: id.to_string(),
                directory: dir_name.to_string(),
            }
        })?;

        let path = self.root.join(dir_name).join(format!("{name}.png"));
        if !path.is_file() {
            return Err(VisionError::TemplateNotFound {
                id: id.to_string(),
            });
        }
        let image = image::open(&path).map_err(|source| VisionError::TemplateDecode {
            id: id.to_string(),
            source,
        })?;
        Template::from_dynamic(id, category, &image)
    }
}

/// In-memory template store.
#[derive(Default)]
pub struct MemorySource {
    templates: HashMap<String, Template>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a template under its own identifier.
    pub fn insert(&mut self, template: Template) {
        self.templates.insert(template.id().to_string(), template);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateSource for MemorySource {
    fn load(&self, id: &str) -> VisionResult<Template> {
        self.templates
            .get(id)
            .cloned()
            .ok_or_else(|| VisionError::TemplateNotFound {
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use image::RgbImage;

    fn temp_asset_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "battle-vision-assets-{tag}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("ui")).unwrap();
        root
    }

    fn write_template_png(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 3) as u8, (y * 5) as u8, 90])
        });
        img.save(path).unwrap();
    }

    #[test]
    fn test_directory_source_load_and_scan() {
        let root = temp_asset_root("load");
        write_template_png(&root.join("ui/confirm.png"), 32, 32);
        write_template_png(&root.join("ui/cancel.png"), 24, 24);
        std::fs::write(root.join("ui/notes.txt"), b"not a template").unwrap();

        let source = DirectorySource::new(&root);
        let ids = source.scan().unwrap();
        assert_eq!(ids, vec!["ui/cancel", "ui/confirm"]);

        let template = source.load("ui/confirm").unwrap();
        assert_eq!(template.id(), "ui/confirm");
        assert_eq!(template.category(), TemplateCategory::UiElement);
        assert_eq!(template.width(), 32);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_directory_source_rejects_unknown_category() {
        let root = temp_asset_root("category");
        let source = DirectorySource::new(&root);
        let err = source.load("icons/confirm").unwrap_err();
        assert!(matches!(err, VisionError::UnknownCategory { .. }));

        let err = source.load("no-separator").unwrap_err();
        assert!(matches!(err, VisionError::TemplateNotFound { .. }));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_directory_source_missing_file_is_not_found() {
        let root = temp_asset_root("missing");
        let source = DirectorySource::new(&root);
        let err = source.load("ui/absent").unwrap_err();
        assert!(matches!(err, VisionError::TemplateNotFound { .. }));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_directory_source_rejects_oversized_template_file() {
        let root = temp_asset_root("oversized");
        write_template_png(&root.join("ui/screenshot.png"), 600, 600);

        let source = DirectorySource::new(&root);
        let err = source.load("ui/screenshot").unwrap_err();
        assert!(err.is_size_rejection());

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_memory_source_round_trip() {
        let frame = Frame::from_raw(20, 20, 1, vec![9u8; 400]).unwrap();
        let template = Template::new("card/quick", TemplateCategory::Card, frame).unwrap();

        let mut source = MemorySource::new();
        assert!(source.is_empty());
        source.insert(template);
        assert_eq!(source.len(), 1);

        let loaded = source.load("card/quick").unwrap();
        assert_eq!(loaded.id(), "card/quick");
        assert!(matches!(
            source.load("card/absent").unwrap_err(),
            VisionError::TemplateNotFound { .. }
        ));
    }
}
