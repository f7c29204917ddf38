pub mod test_helpers {
    use crate::export::{ExportError, ImageClipboard, RasterImage};
    use crate::renderer::{DiagramRenderer, RenderError, RenderedDiagram};

    /// Renderer that understands one made-up diagram language: `size:WxH`
    /// renders a filled rectangle of that size, anything else is rejected
    /// the way a Mermaid syntax error would be.
    #[derive(Debug, Default)]
    pub struct FakeRenderer {
        pub calls: usize,
        pub themes: Vec<String>,
    }

    impl FakeRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn last_theme(&self) -> Option<&str> {
            self.themes.last().map(String::as_str)
        }
    }

    pub fn fake_svg(width: f64, height: f64, theme: &str) -> String {
        let fill = if theme == "dark" { "#202020" } else { "#f0f0f0" };
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><rect width="{width}" height="{height}" fill="{fill}"/></svg>"#
        )
    }

    impl DiagramRenderer for FakeRenderer {
        fn render(&mut self, source: &str, theme: &str) -> Result<RenderedDiagram, RenderError> {
            self.calls += 1;
            self.themes.push(theme.to_string());
            let dims = source
                .trim()
                .strip_prefix("size:")
                .and_then(|s| s.split_once('x'))
                .and_then(|(w, h)| Some((w.parse::<f64>().ok()?, h.parse::<f64>().ok()?)));
            match dims {
                Some((width, height)) => Ok(RenderedDiagram {
                    svg: fake_svg(width, height, theme),
                    width,
                    height,
                }),
                None => Err(RenderError::Rejected(format!(
                    "Parse error on line 1: {}",
                    source.trim()
                ))),
            }
        }
    }

    /// Clipboard that keeps the last image, or fails on demand
    #[derive(Debug, Default)]
    pub struct RecordingClipboard {
        pub image: Option<RasterImage>,
        pub fail_with: Option<String>,
    }

    impl ImageClipboard for RecordingClipboard {
        fn set_image(&mut self, image: &RasterImage) -> Result<(), ExportError> {
            if let Some(reason) = &self.fail_with {
                return Err(ExportError::Clipboard(reason.clone()));
            }
            self.image = Some(image.clone());
            Ok(())
        }
    }

    /// Markdown document with one fenced mermaid block per source
    pub fn markdown_with_blocks(sources: &[&str]) -> String {
        let mut text = String::from("# Notes\n\n");
        for source in sources {
            text.push_str("```mermaid\n");
            text.push_str(source);
            text.push_str("\n```\n\nSome prose.\n\n");
        }
        text
    }
}
