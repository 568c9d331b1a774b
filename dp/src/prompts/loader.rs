//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to
//! embedded defaults. All templates are read and compiled once, at
//! construction; rendering never touches the filesystem.

use std::path::Path;

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
}

impl PromptLoader {
    /// Create a loader, preferring `{dir}/{name}.pmt` over the embedded template
    pub fn new(override_dir: Option<&Path>) -> Result<Self> {
        debug!(?override_dir, "PromptLoader::new: called");
        let mut hbs = Self::engine();

        for name in embedded::TEMPLATE_NAMES {
            let source = Self::load_template(override_dir, name)?;
            hbs.register_template_string(name, source)
                .map_err(|e| eyre!("Failed to compile prompt {}: {}", name, e))?;
        }

        Ok(Self { hbs })
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Result<Self> {
        debug!("PromptLoader::embedded_only: called");
        Self::new(None)
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.set_strict_mode(true);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. Override: `{dir}/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(override_dir: Option<&Path>, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(dir) = override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                info!("Using prompt override {}", path.display());
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt override {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: no override");
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a registered template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        self.hbs
            .render(template_name, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}
