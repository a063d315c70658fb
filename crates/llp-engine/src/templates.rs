//! # Theme License Templates
//!
//! Directories published with legacy EULA markers carry no license text of
//! their own. Their text is the canned `<theme>.txt` in the templates
//! directory, read fresh on every resolution so an operator can update a
//! template without a restart.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use llp_core::theme::is_valid_theme_name;

use crate::error::ResolveError;

#[derive(Debug, Clone)]
pub struct ThemeTemplates {
    dir: PathBuf,
}

impl ThemeTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Text of the template for `theme`, or `None` when there is none.
    ///
    /// Theme names come from published file names, so anything that is not
    /// a plain identifier is treated as missing.
    pub async fn load(&self, theme: &str) -> Result<Option<String>, ResolveError> {
        if !is_valid_theme_name(theme) {
            tracing::warn!(theme, "rejected license theme name");
            return Ok(None);
        }
        let path = self.dir.join(format!("{theme}.txt"));
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(theme, path = %path.display(), "no license template for theme");
                Ok(None)
            }
            Err(source) => Err(ResolveError::Template {
                theme: theme.to_string(),
                source,
            }),
        }
    }
}
