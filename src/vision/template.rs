//! Cue templates
//!
//! Templates are loaded once at startup, preprocessed into grayscale and edge
//! maps, and never change afterwards.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use super::capture::to_gray;
use super::matcher::{edge_density, edge_map, EdgeParams};
use crate::config::FileConfig;
use crate::core::ActivityState;
use crate::error::{CookbotError, Result};

/// The five visual cues the classifier searches for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// Recipe selection screen
    Menu,
    /// Quicktime spatula icon, clicked repeatedly while visible
    Spatula,
    /// Finished dish
    Done,
    /// Start button with ingredients available
    CanCook,
    /// Start button with ingredients exhausted
    CannotCook,
}

impl Cue {
    /// Classification order, most urgent first
    pub const PRIORITY: [Cue; 5] = [
        Cue::Spatula,
        Cue::Done,
        Cue::CannotCook,
        Cue::CanCook,
        Cue::Menu,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Cue::Menu => "menu",
            Cue::Spatula => "spatula",
            Cue::Done => "done",
            Cue::CanCook => "can_cook",
            Cue::CannotCook => "cannot_cook",
        }
    }

    /// Activity state this cue signals
    pub fn activity(&self) -> ActivityState {
        match self {
            Cue::Menu => ActivityState::Menu,
            Cue::Spatula => ActivityState::Quicktime,
            Cue::Done => ActivityState::Done,
            Cue::CanCook => ActivityState::CanCook,
            Cue::CannotCook => ActivityState::CannotCook,
        }
    }

    /// Only the spatula cue is required to run
    pub fn is_required(&self) -> bool {
        matches!(self, Cue::Spatula)
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A preprocessed reference image
#[derive(Debug, Clone)]
pub struct Template {
    cue: Cue,
    gray: GrayImage,
    edges: GrayImage,
    edge_density: f32,
}

impl Template {
    /// Build from an already-decoded grayscale image
    pub fn from_gray(cue: Cue, gray: GrayImage, params: EdgeParams) -> Self {
        let edges = edge_map(&gray, params);
        let edge_density = edge_density(&edges);
        Self {
            cue,
            gray,
            edges,
            edge_density,
        }
    }

    /// Load an image file as grayscale
    pub fn load(cue: Cue, path: &Path, params: EdgeParams) -> Result<Self> {
        let missing = || CookbotError::MissingTemplate {
            cue,
            path: path.display().to_string(),
        };
        if !path.is_file() {
            return Err(missing());
        }
        let image = image::open(path).map_err(|e| {
            log::debug!("Failed to decode {}: {}", path.display(), e);
            missing()
        })?;
        let template = Self::from_gray(cue, to_gray(&image.to_rgba8()), params);
        log::debug!(
            "Template loaded: {} ({}x{})",
            path.display(),
            template.width(),
            template.height()
        );
        Ok(template)
    }

    pub fn cue(&self) -> Cue {
        self.cue
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// Fraction of the template covered by its edge map
    pub fn edge_density(&self) -> f32 {
        self.edge_density
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }
}

/// Read-only set of loaded templates, keyed by cue
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: HashMap<Cue, Template>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all five templates. A missing spatula template is fatal; any other
    /// missing template is logged and that cue never matches.
    pub fn load(files: &FileConfig, params: EdgeParams) -> Result<Self> {
        let mut store = Self::new();
        for cue in Cue::PRIORITY {
            let path = files.template_path(cue);
            match Template::load(cue, &path, params) {
                Ok(template) => {
                    log::info!("Template ready: {} ({})", cue, path.display());
                    store.insert(template);
                }
                Err(e) if cue.is_required() => {
                    log::error!("Required template missing: {}", path.display());
                    return Err(e);
                }
                Err(e) => {
                    log::warn!("{}; cue '{}' will never match", e, cue);
                }
            }
        }
        Ok(store)
    }

    /// Add or replace a template
    pub fn insert(&mut self, template: Template) {
        self.templates.insert(template.cue(), template);
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.insert(template);
        self
    }

    pub fn get(&self, cue: Cue) -> Option<&Template> {
        self.templates.get(&cue)
    }

    pub fn contains(&self, cue: Cue) -> bool {
        self.templates.contains_key(&cue)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn checker(size: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Luma([230])
            } else {
                Luma([20])
            }
        })
    }

    fn write_png(dir: &Path, name: &str, image: &GrayImage) {
        image.save(dir.join(name)).unwrap();
    }

    fn files_in(dir: &Path) -> FileConfig {
        FileConfig {
            template_dir: dir.to_path_buf(),
            ..FileConfig::default()
        }
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(
            Cue::PRIORITY,
            [Cue::Spatula, Cue::Done, Cue::CannotCook, Cue::CanCook, Cue::Menu]
        );
    }

    #[test]
    fn test_cue_activity_mapping() {
        assert_eq!(Cue::Spatula.activity(), ActivityState::Quicktime);
        assert_eq!(Cue::Menu.activity(), ActivityState::Menu);
        assert_eq!(Cue::CannotCook.activity(), ActivityState::CannotCook);
    }

    #[test]
    fn test_template_edges_precomputed() {
        let template = Template::from_gray(Cue::Menu, checker(16), EdgeParams::default());
        assert_eq!(template.edges().dimensions(), (16, 16));
        assert!(template.edges().pixels().any(|p| p[0] > 0));
        assert!(template.edge_density() > 0.05);
    }

    #[test]
    fn test_flat_template_has_no_edges() {
        let flat = GrayImage::from_pixel(16, 16, Luma([128]));
        let template = Template::from_gray(Cue::Done, flat, EdgeParams::default());
        assert_eq!(template.edge_density(), 0.0);
    }

    #[test]
    fn test_load_missing_spatula_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "cookingdone.png", &checker(12));

        let err = TemplateStore::load(&files_in(dir.path()), EdgeParams::default()).unwrap_err();
        assert!(matches!(
            err,
            CookbotError::MissingTemplate { cue: Cue::Spatula, .. }
        ));
    }

    #[test]
    fn test_load_missing_optional_is_degraded() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "spatula_template.png", &checker(12));
        write_png(dir.path(), "cookingdone.png", &checker(8));

        let store = TemplateStore::load(&files_in(dir.path()), EdgeParams::default()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains(Cue::Spatula));
        assert!(store.contains(Cue::Done));
        assert!(store.get(Cue::Menu).is_none());
    }

    #[test]
    fn test_unreadable_template_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("spatula_template.png"), b"not a png").unwrap();

        let err = TemplateStore::load(&files_in(dir.path()), EdgeParams::default()).unwrap_err();
        assert!(matches!(err, CookbotError::MissingTemplate { .. }));
    }
}
