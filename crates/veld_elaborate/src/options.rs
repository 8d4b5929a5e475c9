//! Compilation options controlling elaboration.

use serde::Deserialize;

/// Errors that can occur when loading or validating compilation options.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// The TOML content could not be parsed.
    #[error("failed to parse options: {0}")]
    ParseError(String),
    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Options controlling how a design is elaborated.
///
/// A driver deserializes these from its project file; defaults match the
/// standalone command-line surface.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompilationOptions {
    /// Explicit top specs. Each entry is one of `name`, `lib.name`,
    /// `name:config`, or `lib.name:config`. When empty, tops are inferred
    /// from modules that are never instantiated.
    pub top: Vec<String>,
    /// Explicit library search order (the `-L lib1,lib2` surface). Libraries
    /// not listed keep their registration order after the listed ones.
    pub library_order: Vec<String>,
    /// Maximum width of a single instance array dimension.
    pub max_instance_array: u32,
    /// Maximum nesting depth of checker instantiations.
    pub max_checker_instance_depth: u32,
    /// Maximum nesting depth of the instance hierarchy.
    pub max_hierarchy_depth: u32,
    /// Auto-instantiate interface definitions for top-level interface ports.
    pub allow_top_level_iface_ports: bool,
    /// Allow a bare `#value` on a primitive-style instantiation to act as a
    /// single ordered parameter assignment.
    pub allow_bare_val_param_assignment: bool,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            top: Vec::new(),
            library_order: Vec::new(),
            max_instance_array: 65535,
            max_checker_instance_depth: 255,
            max_hierarchy_depth: 128,
            allow_top_level_iface_ports: false,
            allow_bare_val_param_assignment: false,
        }
    }
}

impl CompilationOptions {
    /// Parses and validates options from a TOML string.
    ///
    /// Useful for testing and for drivers that embed options in a larger
    /// project file.
    pub fn from_toml_str(content: &str) -> Result<Self, OptionsError> {
        let options: CompilationOptions =
            toml::from_str(content).map_err(|e| OptionsError::ParseError(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Validates that option values are usable.
    fn validate(&self) -> Result<(), OptionsError> {
        if self.max_instance_array == 0 {
            return Err(OptionsError::ValidationError(
                "max_instance_array must be at least 1".to_string(),
            ));
        }
        if self.max_hierarchy_depth == 0 {
            return Err(OptionsError::ValidationError(
                "max_hierarchy_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
