//! Diagram text to SVG markup
//!
//! Rendering itself is delegated to an external tool. This module defines the
//! seam (`DiagramRenderer`), measures the natural size of whatever markup
//! comes back, and provides a renderer that shells out to the Mermaid CLI.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use log::{debug, warn};
use resvg::usvg;

use crate::geometry::Rect;

pub const DEFAULT_RENDERER_COMMAND: &str = "mmdc";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The renderer refused the diagram text, usually a syntax error
    #[error("{0}")]
    Rejected(String),

    #[error("Failed to run diagram renderer: {0}")]
    Io(#[from] std::io::Error),

    #[error("Renderer produced invalid SVG: {0}")]
    InvalidSvg(String),
}

/// Rendered markup together with its natural (unscaled) size
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDiagram {
    pub svg: String,
    pub width: f64,
    pub height: f64,
}

impl RenderedDiagram {
    /// Parse `svg` to learn its natural size
    pub fn from_svg(svg: String) -> Result<Self, RenderError> {
        let tree = parse_svg(&svg)?;
        let size = tree.size();
        Ok(Self {
            width: f64::from(size.width()),
            height: f64::from(size.height()),
            svg,
        })
    }

    pub fn natural_rect(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }
}

pub(crate) fn parse_svg(svg: &str) -> Result<usvg::Tree, RenderError> {
    let mut options = usvg::Options::default();
    if svg.contains("<text") || svg.contains("font-family") {
        options.fontdb_mut().load_system_fonts();
    }
    usvg::Tree::from_str(svg, &options).map_err(|e| RenderError::InvalidSvg(e.to_string()))
}

pub trait DiagramRenderer {
    /// Render diagram source using the named diagram theme
    fn render(&mut self, source: &str, theme: &str) -> Result<RenderedDiagram, RenderError>;
}

/// Renders through an external command line tool (the Mermaid CLI by default)
/// using temporary input and output files
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: PathBuf,
    extra_args: Vec<String>,
}

impl Default for CommandRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_RENDERER_COMMAND)
    }
}

impl CommandRenderer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl DiagramRenderer for CommandRenderer {
    fn render(&mut self, source: &str, theme: &str) -> Result<RenderedDiagram, RenderError> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("diagram.mmd");
        let output = workdir.path().join("diagram.svg");
        fs::write(&input, source)?;

        debug!("Running {:?} with theme {theme}", self.program);
        let result = Command::new(&self.program)
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("-t")
            .arg(theme)
            .arg("-q")
            .args(&self.extra_args)
            .output()?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            warn!("Diagram renderer exited with {}: {stderr}", result.status);
            let message = if stderr.is_empty() {
                format!("Diagram renderer exited with {}", result.status)
            } else {
                stderr
            };
            return Err(RenderError::Rejected(message));
        }

        RenderedDiagram::from_svg(fs::read_to_string(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_size_comes_from_svg_dimensions() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="320" height="180"><rect width="320" height="180" fill="red"/></svg>"#;
        let diagram = RenderedDiagram::from_svg(svg.to_string()).unwrap();
        assert_eq!(diagram.natural_rect(), Rect::from_size(320.0, 180.0));
    }

    #[test]
    fn natural_size_falls_back_to_view_box() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 64 48"><circle cx="10" cy="10" r="5"/></svg>"#;
        let diagram = RenderedDiagram::from_svg(svg.to_string()).unwrap();
        assert_eq!((diagram.width, diagram.height), (64.0, 48.0));
    }

    #[test]
    fn garbage_is_invalid_svg() {
        let err = RenderedDiagram::from_svg("Parse error on line 2".to_string()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidSvg(_)));
    }

    #[test]
    fn missing_renderer_program_is_io_error() {
        let mut renderer = CommandRenderer::new("/nonexistent/mermaid-cli-for-tests");
        let err = renderer.render("graph TD; A-->B", "default").unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }
}
