use tiny_skia::{Path, PathBuilder};

use crate::error::{RenderError, Result};

/// The single path under construction in a render session.
///
/// A path exists from the first `move_to` until `fill` or `clip` consumes it.
#[derive(Default)]
pub struct CurrentPath {
    builder: Option<PathBuilder>,
}

impl CurrentPath {
    pub fn new() -> Self {
        Self { builder: None }
    }

    pub fn is_empty(&self) -> bool {
        self.builder.is_none()
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.builder.get_or_insert_with(PathBuilder::new).move_to(x, y);
    }

    pub fn line_to(&mut self, x: f32, y: f32) -> Result<()> {
        let builder = self.builder.as_mut().ok_or(RenderError::NoCurrentPath)?;
        builder.line_to(x, y);
        Ok(())
    }

    pub fn close_path(&mut self) -> Result<()> {
        let builder = self.builder.as_mut().ok_or(RenderError::NoCurrentPath)?;
        builder.close();
        Ok(())
    }

    /// Consumes the path. `Ok(None)` means a path was started but has no
    /// drawable geometry (a lone `move_to`).
    pub fn take(&mut self) -> Result<Option<Path>> {
        let builder = self.builder.take().ok_or(RenderError::NoCurrentPath)?;
        Ok(builder.finish())
    }
}
