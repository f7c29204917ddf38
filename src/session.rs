//! One editor session: owns settings and the renderer, and lazily creates
//! the single panel/viewer pair the first time a block is opened.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};

use crate::block::{BlockDescriptor, DocumentUri};
use crate::event_source::ViewerEvent;
use crate::export::{ExportFormat, ImageClipboard};
use crate::panel::ViewerPanel;
use crate::renderer::DiagramRenderer;
use crate::scanner::scan_blocks;
use crate::settings::{Settings, SettingsError, load_settings_from_path};
use crate::theme::EditorTheme;
use crate::transport;
use crate::viewer::Viewer;
use crate::viewport::RenderOutcome;

#[derive(Debug)]
struct OpenViewer {
    panel: ViewerPanel,
    viewer: Viewer,
}

#[derive(Debug)]
pub struct Session<R> {
    settings: Settings,
    renderer: R,
    editor_theme: EditorTheme,
    open: Option<OpenViewer>,
}

impl<R: DiagramRenderer> Session<R> {
    pub fn new(settings: Settings, renderer: R, editor_theme: EditorTheme) -> Self {
        Self {
            settings,
            renderer,
            editor_theme,
            open: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn panel(&self) -> Option<&ViewerPanel> {
        self.open.as_ref().map(|open| &open.panel)
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.open.as_ref().map(|open| &open.viewer)
    }

    fn create_viewer(&self) -> OpenViewer {
        let (host, endpoint) = transport::channel();
        OpenViewer {
            panel: ViewerPanel::new(host),
            viewer: Viewer::new(endpoint, &self.settings, self.editor_theme),
        }
    }

    /// Show `block`, creating the panel and viewer on first use
    pub fn open_viewer(&mut self, block: BlockDescriptor) {
        if self.open.is_none() {
            info!("Creating diagram viewer");
            self.open = Some(self.create_viewer());
        }
        if let Some(open) = self.open.as_mut() {
            open.panel.show(block);
        }
    }

    /// Find the document's blocks and pass edits of the displayed one to
    /// the viewer
    pub fn scan_document(&mut self, uri: &DocumentUri, text: &str) -> Vec<BlockDescriptor> {
        let blocks = scan_blocks(uri, text);
        if let Some(open) = self.open.as_mut() {
            for block in &blocks {
                open.panel.process_block(block);
            }
        }
        blocks
    }

    pub fn tick(&mut self) -> Option<RenderOutcome> {
        self.tick_at(Instant::now())
    }

    /// Deliver pending messages both ways and render if the quiet period is over
    pub fn tick_at(&mut self, now: Instant) -> Option<RenderOutcome> {
        let open = self.open.as_mut()?;
        open.viewer.pump_at(now);
        let outcome = open.viewer.tick_at(now, &mut self.renderer);
        open.panel.pump_notifications_at(now);
        outcome
    }

    /// Render whatever the viewer has been sent without waiting
    pub fn flush(&mut self) -> Option<RenderOutcome> {
        let now = Instant::now();
        let open = self.open.as_mut()?;
        open.viewer.pump_at(now);
        let outcome = open.viewer.render_now(&mut self.renderer);
        open.panel.pump_notifications_at(now);
        outcome
    }

    pub fn handle_event(&mut self, event: ViewerEvent) {
        if let Some(open) = self.open.as_mut() {
            open.viewer.handle_event(event);
        }
    }

    pub fn export(&mut self, format: ExportFormat, dir: &Path) -> Option<PathBuf> {
        let open = self.open.as_mut()?;
        let path = open.viewer.export(&mut self.renderer, format, dir);
        open.panel.pump_notifications_at(Instant::now());
        path
    }

    pub fn copy(&mut self, clipboard: &mut dyn ImageClipboard) {
        if let Some(open) = self.open.as_mut() {
            open.viewer.copy(&mut self.renderer, clipboard);
            open.panel.pump_notifications_at(Instant::now());
        }
    }

    /// Close the panel. The next `open_viewer` starts from scratch.
    pub fn close(&mut self) {
        if let Some(mut open) = self.open.take() {
            open.panel.dispose();
        }
    }

    /// Swap settings and rebuild the viewer around the displayed block
    pub fn apply_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.rebuild_viewer();
    }

    pub fn reload_settings(&mut self, path: &Path) -> Result<(), SettingsError> {
        let settings = load_settings_from_path(path)?;
        self.apply_settings(settings);
        Ok(())
    }

    pub fn set_editor_theme(&mut self, editor_theme: EditorTheme) {
        if self.editor_theme != editor_theme {
            self.editor_theme = editor_theme;
            self.rebuild_viewer();
        }
    }

    fn rebuild_viewer(&mut self) {
        let Some(active) = self
            .open
            .as_ref()
            .and_then(|open| open.panel.active_block().cloned())
        else {
            return;
        };
        let panel_size = self
            .open
            .as_ref()
            .and_then(|open| open.viewer.controller().coords().boundary_rect);
        debug!("Rebuilding viewer for block #{}", active.sequence);
        let mut open = self.create_viewer();
        // The new viewer must know the panel size before its first render
        if let Some(size) = panel_size {
            open.viewer.handle_event(ViewerEvent::Resize {
                width: size.width,
                height: size.height,
            });
        }
        open.panel.show(active);
        self.open = Some(open);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockChange;
    use crate::geometry::Rect;
    use crate::test_utils::test_helpers::{FakeRenderer, markdown_with_blocks};
    use crate::viewport::ViewerStatus;
    use std::time::Duration;

    fn session() -> Session<FakeRenderer> {
        Session::new(Settings::default(), FakeRenderer::new(), EditorTheme::Light)
    }

    fn uri() -> DocumentUri {
        DocumentUri::new("file:///work/design.md")
    }

    #[test]
    fn nothing_happens_until_a_block_is_opened() {
        let mut session = session();
        let blocks = session.scan_document(&uri(), &markdown_with_blocks(&["size:10x10"]));
        assert_eq!(blocks.len(), 1);
        assert!(!session.is_open());
        assert!(session.tick().is_none());
    }

    #[test]
    fn opening_a_block_renders_after_quiet_period() {
        let mut session = session();
        let blocks = session.scan_document(&uri(), &markdown_with_blocks(&["size:10x10"]));
        let start = Instant::now();

        session.open_viewer(blocks[0].clone());

        assert!(session.tick_at(start).is_none());
        let outcome = session.tick_at(start + Duration::from_millis(250));
        assert_eq!(outcome, Some(RenderOutcome::Rendered(BlockChange::NewBlock)));
        assert_eq!(
            session.viewer().unwrap().controller().status(),
            ViewerStatus::Ready
        );
    }

    #[test]
    fn edits_to_the_open_block_reach_the_viewer() {
        let mut session = session();
        let blocks = session.scan_document(&uri(), &markdown_with_blocks(&["size:10x10", "size:5x5"]));
        session.open_viewer(blocks[1].clone());
        session.flush();

        session.scan_document(&uri(), &markdown_with_blocks(&["size:11x11", "size:6x6"]));
        let outcome = session.flush();

        assert_eq!(
            outcome,
            Some(RenderOutcome::Rendered(BlockChange::ContentUpdated))
        );
        let rendered = session.viewer().unwrap().controller().last_rendered().unwrap();
        assert_eq!(rendered.sequence, 1);
        assert_eq!(rendered.content.trim(), "size:6x6");
        assert_eq!(session.renderer().calls, 2);
    }

    #[test]
    fn only_one_viewer_is_ever_created() {
        let mut session = session();
        let blocks = session.scan_document(&uri(), &markdown_with_blocks(&["size:10x10", "size:20x20"]));

        session.open_viewer(blocks[0].clone());
        session.flush();
        session.handle_event(ViewerEvent::ZoomIn);
        session.open_viewer(blocks[1].clone());
        let outcome = session.flush();

        assert_eq!(outcome, Some(RenderOutcome::Rendered(BlockChange::NewBlock)));
        assert_eq!(session.viewer().unwrap().controller().coords().scale, 1.0);
    }

    #[test]
    fn close_then_reopen_starts_fresh() {
        let mut session = session();
        let blocks = session.scan_document(&uri(), &markdown_with_blocks(&["size:10x10"]));
        session.open_viewer(blocks[0].clone());
        session.flush();

        session.close();
        assert!(!session.is_open());
        session.scan_document(&uri(), &markdown_with_blocks(&["size:12x12"]));
        assert!(session.flush().is_none());

        session.open_viewer(blocks[0].clone());
        assert_eq!(
            session.flush(),
            Some(RenderOutcome::Rendered(BlockChange::NewBlock))
        );
    }

    #[test]
    fn theme_change_rebuilds_viewer_with_new_theme() {
        let mut session = session();
        let blocks = session.scan_document(&uri(), &markdown_with_blocks(&["size:10x10"]));
        session.open_viewer(blocks[0].clone());
        session.flush();

        session.set_editor_theme(EditorTheme::Dark);
        session.flush();

        assert_eq!(session.renderer().last_theme(), Some("dark"));
        assert_eq!(session.renderer().calls, 2);
    }

    #[test]
    fn rebuilt_viewer_keeps_the_panel_size() {
        let mut session = session();
        let blocks = session.scan_document(&uri(), &markdown_with_blocks(&["size:2000x1000"]));
        session.open_viewer(blocks[0].clone());
        session.handle_event(ViewerEvent::Resize {
            width: 800.0,
            height: 656.0,
        });
        session.flush();
        let before = *session.viewer().unwrap().controller().coords();
        assert_eq!(before.scale, 0.4);
        assert_eq!((before.offset_x, before.offset_y), (400.0, 328.0));

        session.set_editor_theme(EditorTheme::Dark);
        session.flush();
        let coords = *session.viewer().unwrap().controller().coords();
        assert_eq!(coords.boundary_rect, Some(Rect::from_size(800.0, 656.0)));
        assert_eq!(coords.inner_frame_rect, Some(Rect::from_size(800.0, 600.0)));
        assert_eq!(coords.scale, 0.4);
        assert_eq!((coords.offset_x, coords.offset_y), (400.0, 328.0));

        session.apply_settings(Settings {
            control_strip_height: 156.0,
            ..Settings::default()
        });
        session.flush();
        let coords = *session.viewer().unwrap().controller().coords();
        assert_eq!(coords.boundary_rect, Some(Rect::from_size(800.0, 656.0)));
        assert_eq!(coords.inner_frame_rect, Some(Rect::from_size(800.0, 500.0)));
    }

    #[test]
    fn reload_settings_applies_new_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "refresh_delay_ms: 5\n").unwrap();
        let mut session = session();
        let blocks = session.scan_document(&uri(), &markdown_with_blocks(&["size:10x10"]));
        session.open_viewer(blocks[0].clone());

        session.reload_settings(&path).unwrap();

        assert_eq!(session.settings().refresh_delay_ms, 5);
        assert_eq!(
            session.flush(),
            Some(RenderOutcome::Rendered(BlockChange::NewBlock))
        );
    }
}
