//! Viewer properties.
//!
//! Loaded from a TOML file; every key is optional and falls back to
//! [`ViewerProperties::default`].
//!
//! ```toml
//! viewport_width = 1200
//! viewport_height = 800
//! transparency_quarter_depth = 2
//! loader_threads = 4
//! fov_y_degrees = 45.0
//! background = [0.0, 0.0, 0.0, 1.0]
//! blend_method = "mip"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::camera::Projection;
use crate::coords::ViewportSize;
use crate::error::ConfigError;
use crate::oit;
use crate::renderer::RendererConfig;
use crate::scene::{BlendMethod, Rgba};

/// Integer-valued keys readable through [`ViewerProperties::integer`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IntegerProperty {
    ViewportWidth,
    ViewportHeight,
    TransparencyQuarterDepth,
    LoaderThreads,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerProperties {
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Four transparent layers per unit.
    pub transparency_quarter_depth: u32,
    pub loader_threads: usize,
    pub fov_y_degrees: f64,
    pub near_scale: f64,
    pub far_scale: f64,
    pub background: [f32; 4],
    pub blend_method: BlendMethod,
}

impl Default for ViewerProperties {
    fn default() -> Self {
        let projection = Projection::default();
        Self {
            viewport_width: 1200,
            viewport_height: 800,
            transparency_quarter_depth: 2,
            loader_threads: 4,
            fov_y_degrees: projection.fov_y_degrees,
            near_scale: projection.near_scale,
            far_scale: projection.far_scale,
            background: Rgba::BLACK.to_array(),
            blend_method: BlendMethod::Mix,
        }
    }
}

impl ViewerProperties {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let props: Self = toml::from_str(text)?;
        props.validate()?;
        Ok(props)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let props = Self::from_toml_str(&text)?;
        log::info!("loaded viewer properties from {}", path.display());
        Ok(props)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid { key, reason: reason.into() }
        }

        if self.viewport_width == 0 {
            return Err(invalid("viewport_width", "must be non-zero"));
        }
        if self.viewport_height == 0 {
            return Err(invalid("viewport_height", "must be non-zero"));
        }
        if self.transparency_quarter_depth == 0 {
            return Err(invalid("transparency_quarter_depth", "must be at least 1"));
        }
        if self.loader_threads == 0 {
            return Err(invalid("loader_threads", "must be at least 1"));
        }
        if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0) {
            return Err(invalid("fov_y_degrees", format!("{} is outside (0, 180)", self.fov_y_degrees)));
        }
        if !(self.near_scale > 0.0) {
            return Err(invalid("near_scale", "must be positive"));
        }
        if !(self.far_scale > self.near_scale) {
            return Err(invalid("far_scale", "must exceed near_scale"));
        }
        if self.background.iter().any(|c| !c.is_finite()) {
            return Err(invalid("background", "components must be finite"));
        }
        Ok(())
    }

    pub fn integer(&self, key: IntegerProperty) -> i64 {
        match key {
            IntegerProperty::ViewportWidth => i64::from(self.viewport_width),
            IntegerProperty::ViewportHeight => i64::from(self.viewport_height),
            IntegerProperty::TransparencyQuarterDepth => i64::from(self.transparency_quarter_depth),
            IntegerProperty::LoaderThreads => self.loader_threads as i64,
        }
    }

    pub fn viewport(&self) -> ViewportSize {
        ViewportSize::new(self.viewport_width, self.viewport_height)
    }

    pub fn projection(&self) -> Projection {
        Projection {
            fov_y_degrees: self.fov_y_degrees,
            near_scale: self.near_scale,
            far_scale: self.far_scale,
        }
    }

    /// Transparent layers resolved per pixel.
    pub fn depth_budget(&self) -> u32 {
        oit::depth_budget(self.transparency_quarter_depth)
    }

    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            viewport: self.viewport(),
            quarter_depth: self.transparency_quarter_depth,
            projection: self.projection(),
            background: Rgba::from_array(self.background).clamped(),
            blend_method: self.blend_method,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let props = ViewerProperties::from_toml_str("").unwrap();
        assert_eq!(props, ViewerProperties::default());
        assert_eq!(props.integer(IntegerProperty::LoaderThreads), 4);
        assert_eq!(props.integer(IntegerProperty::TransparencyQuarterDepth), 2);
        assert_eq!(props.depth_budget(), 8);
    }

    #[test]
    fn partial_document_overrides_only_given_keys() {
        let props = ViewerProperties::from_toml_str(
            r#"
            viewport_width = 640
            blend_method = "mip"
            background = [0.1, 0.2, 0.3, 1.0]
            "#,
        )
        .unwrap();

        assert_eq!(props.viewport(), ViewportSize::new(640, 800));
        assert_eq!(props.blend_method, BlendMethod::Mip);

        let config = props.renderer_config();
        assert_eq!(config.background, Rgba::new(0.1, 0.2, 0.3, 1.0));
        assert_eq!(config.quarter_depth, 2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ViewerProperties::from_toml_str("viewport_depth = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn near_and_far_are_validated() {
        let err = ViewerProperties::from_toml_str("near_scale = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "near_scale", .. }));

        let err = ViewerProperties::from_toml_str("near_scale = 0.5\nfar_scale = 0.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "far_scale", .. }));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        for doc in ["viewport_height = 0", "transparency_quarter_depth = 0", "loader_threads = 0"] {
            assert!(
                matches!(ViewerProperties::from_toml_str(doc), Err(ConfigError::Invalid { .. })),
                "{doc}"
            );
        }
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let dir = std::env::temp_dir().join(format!("voxel-engine-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("viewer.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "loader_threads = 2").unwrap();
        drop(file);

        let props = ViewerProperties::load(&path).unwrap();
        assert_eq!(props.integer(IntegerProperty::LoaderThreads), 2);

        let missing = ViewerProperties::load(dir.join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));

        fs::remove_dir_all(&dir).unwrap();
    }
}
