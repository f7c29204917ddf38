//! Viewer side of a panel: receives blocks from the host, debounces them
//! into renders, and carries out export requests.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

use crate::debouncer::Debouncer;
use crate::event_source::ViewerEvent;
use crate::export::{ExportError, ExportFormat, ImageClipboard, copy_to_clipboard, export_to_dir};
use crate::message::WebviewMessage;
use crate::notification::NotificationLevel;
use crate::renderer::DiagramRenderer;
use crate::settings::Settings;
use crate::theme::{EditorTheme, ExportTheme};
use crate::transport::ViewerEndpoint;
use crate::viewport::{RenderOutcome, ViewportController};

pub const COPIED_TO_CLIPBOARD: &str = "Diagram copied to clipboard";

#[derive(Debug)]
pub struct Viewer {
    controller: ViewportController,
    refresh: Debouncer<()>,
    endpoint: ViewerEndpoint,
    editor_theme: EditorTheme,
    export_theme: ExportTheme,
    png_resolution: u32,
}

impl Viewer {
    pub fn new(endpoint: ViewerEndpoint, settings: &Settings, editor_theme: EditorTheme) -> Self {
        Self {
            controller: ViewportController::with_control_strip_height(
                settings.control_strip_height,
            ),
            refresh: Debouncer::new(settings.refresh_delay()),
            endpoint,
            editor_theme,
            export_theme: settings.export_mermaid_theme.clone(),
            png_resolution: settings.export_png_resolution,
        }
    }

    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    pub fn editor_theme(&self) -> EditorTheme {
        self.editor_theme
    }

    pub fn is_refresh_pending(&self) -> bool {
        self.refresh.is_pending()
    }

    pub fn pump(&mut self) -> usize {
        self.pump_at(Instant::now())
    }

    /// Apply every message the host has posted. Each block update becomes
    /// the active block and restarts the quiet period.
    pub fn pump_at(&mut self, now: Instant) -> usize {
        let messages = self.endpoint.drain();
        let count = messages.len();
        for message in messages {
            match message {
                WebviewMessage::UpdateMermaidGraph { block_info } => {
                    self.controller.set_active_block(block_info);
                    self.refresh.debounce_at((), now);
                }
                WebviewMessage::ShowNotification { message, .. } => {
                    warn!("Viewer ignored notification meant for the host: {message}");
                }
            }
        }
        count
    }

    pub fn tick(&mut self, renderer: &mut dyn DiagramRenderer) -> Option<RenderOutcome> {
        self.tick_at(Instant::now(), renderer)
    }

    /// Render the active block once its quiet period has elapsed
    pub fn tick_at(
        &mut self,
        now: Instant,
        renderer: &mut dyn DiagramRenderer,
    ) -> Option<RenderOutcome> {
        self.refresh.poll_at(now)?;
        self.render_now(renderer)
    }

    /// Render immediately, dropping any pending refresh
    pub fn render_now(&mut self, renderer: &mut dyn DiagramRenderer) -> Option<RenderOutcome> {
        self.refresh.cancel();
        let outcome = self
            .controller
            .render_active(renderer, self.editor_theme.diagram_theme());
        debug!("Refresh finished: {outcome:?}");
        outcome
    }

    pub fn handle_event(&mut self, event: ViewerEvent) {
        self.controller.handle_event(event);
    }

    fn export_markup(&self, renderer: &mut dyn DiagramRenderer) -> Result<String, ExportError> {
        let source = self
            .controller
            .active_block()
            .map(|block| block.content.as_str())
            .filter(|content| !content.is_empty())
            .ok_or(ExportError::NothingToExport)?;
        let theme = self.export_theme.resolve(self.editor_theme);
        Ok(renderer.render(source, &theme)?.svg)
    }

    /// Re-render the active block with the export theme and write it to `dir`
    pub fn try_export(
        &self,
        renderer: &mut dyn DiagramRenderer,
        format: ExportFormat,
        dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        let svg = self.export_markup(renderer)?;
        let document_uri = self
            .controller
            .active_block()
            .map(|block| block.document_uri.clone())
            .ok_or(ExportError::NothingToExport)?;
        export_to_dir(dir, &document_uri, &svg, format, self.png_resolution)
    }

    pub fn try_copy(
        &self,
        renderer: &mut dyn DiagramRenderer,
        clipboard: &mut dyn ImageClipboard,
    ) -> Result<(), ExportError> {
        let svg = self.export_markup(renderer)?;
        copy_to_clipboard(clipboard, &svg, self.png_resolution)
    }

    /// Export, reporting failures to the host as error toasts
    pub fn export(
        &self,
        renderer: &mut dyn DiagramRenderer,
        format: ExportFormat,
        dir: &Path,
    ) -> Option<PathBuf> {
        match self.try_export(renderer, format, dir) {
            Ok(path) => Some(path),
            Err(e) => {
                self.report_failure(&format!("Failed to export {}", format.label()), e);
                None
            }
        }
    }

    pub fn copy(&self, renderer: &mut dyn DiagramRenderer, clipboard: &mut dyn ImageClipboard) {
        match self.try_copy(renderer, clipboard) {
            Ok(()) => {
                info!("{COPIED_TO_CLIPBOARD}");
                self.notify(COPIED_TO_CLIPBOARD, NotificationLevel::Info);
            }
            Err(e) => self.report_failure("Failed to copy PNG", e),
        }
    }

    fn report_failure(&self, action: &str, error: ExportError) {
        if matches!(error, ExportError::NothingToExport) {
            debug!("{action}: nothing to export");
            return;
        }
        warn!("{action}: {error}");
        self.notify(&format!("{action}: {error}"), NotificationLevel::Error);
    }

    fn notify(&self, message: &str, level: NotificationLevel) {
        self.endpoint.post(WebviewMessage::notification(message, level));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockChange, BlockDescriptor, DocumentUri};
    use crate::test_utils::test_helpers::{FakeRenderer, RecordingClipboard};
    use crate::transport::{HostEndpoint, channel};
    use std::time::Duration;

    fn block(sequence: usize, content: &str) -> BlockDescriptor {
        BlockDescriptor {
            sequence,
            content: content.to_string(),
            start_line: 2,
            end_line: 4,
            start_character: 0,
            end_character: 3,
            document_uri: DocumentUri::new("file:///work/flows.md"),
        }
    }

    fn viewer_with(settings: Settings, theme: EditorTheme) -> (HostEndpoint, Viewer) {
        let (host, endpoint) = channel();
        (host, Viewer::new(endpoint, &settings, theme))
    }

    fn notifications(host: &HostEndpoint) -> Vec<(String, NotificationLevel)> {
        host.drain()
            .into_iter()
            .filter_map(|message| match message {
                WebviewMessage::ShowNotification {
                    message,
                    notification_type,
                } => Some((message, notification_type)),
                WebviewMessage::UpdateMermaidGraph { .. } => None,
            })
            .collect()
    }

    #[test]
    fn burst_of_updates_renders_once_after_quiet_period() {
        let (host, mut viewer) = viewer_with(Settings::default(), EditorTheme::Light);
        let mut renderer = FakeRenderer::new();
        let start = Instant::now();

        for (i, content) in ["size:10x10", "size:20x20", "size:30x30"].iter().enumerate() {
            host.post(WebviewMessage::update(block(0, content)));
            viewer.pump_at(start + Duration::from_millis(50 * i as u64));
        }

        assert!(viewer.tick_at(start + Duration::from_millis(249), &mut renderer).is_none());
        let outcome = viewer.tick_at(start + Duration::from_millis(300), &mut renderer);

        assert_eq!(outcome, Some(RenderOutcome::Rendered(BlockChange::NewBlock)));
        assert_eq!(renderer.calls, 1);
        assert_eq!(viewer.controller().last_rendered(), Some(&block(0, "size:30x30")));
        assert!(!viewer.is_refresh_pending());
    }

    #[test]
    fn on_screen_render_uses_editor_theme() {
        let settings = Settings {
            export_mermaid_theme: ExportTheme::Named("forest".to_string()),
            ..Settings::default()
        };
        let (host, mut viewer) = viewer_with(settings, EditorTheme::Dark);
        let mut renderer = FakeRenderer::new();

        host.post(WebviewMessage::update(block(0, "size:10x10")));
        viewer.pump();
        viewer.render_now(&mut renderer);

        assert_eq!(renderer.last_theme(), Some("dark"));
    }

    #[test]
    fn export_uses_export_theme_and_document_name() {
        let settings = Settings {
            export_mermaid_theme: ExportTheme::Named("forest".to_string()),
            export_png_resolution: 100,
            ..Settings::default()
        };
        let (host, mut viewer) = viewer_with(settings, EditorTheme::Dark);
        let mut renderer = FakeRenderer::new();
        let dir = tempfile::tempdir().unwrap();

        host.post(WebviewMessage::update(block(0, "size:40x20")));
        viewer.pump();
        let path = viewer
            .export(&mut renderer, ExportFormat::Png, dir.path())
            .unwrap();

        assert_eq!(path, dir.path().join("flows.png"));
        assert_eq!(renderer.last_theme(), Some("forest"));
        assert!(notifications(&host).is_empty());
    }

    #[test]
    fn auto_export_theme_follows_editor() {
        let (host, mut viewer) = viewer_with(Settings::default(), EditorTheme::Dark);
        let mut renderer = FakeRenderer::new();
        let dir = tempfile::tempdir().unwrap();

        host.post(WebviewMessage::update(block(0, "size:40x20")));
        viewer.pump();
        viewer.export(&mut renderer, ExportFormat::Svg, dir.path());

        assert_eq!(renderer.last_theme(), Some("dark"));
    }

    #[test]
    fn export_failure_becomes_error_notification() {
        let (host, mut viewer) = viewer_with(Settings::default(), EditorTheme::Light);
        let mut renderer = FakeRenderer::new();
        let dir = tempfile::tempdir().unwrap();

        host.post(WebviewMessage::update(block(0, "graph TD; A--")));
        viewer.pump();
        assert!(viewer.export(&mut renderer, ExportFormat::Svg, dir.path()).is_none());

        assert_eq!(
            notifications(&host),
            vec![(
                "Failed to export SVG: Parse error on line 1: graph TD; A--".to_string(),
                NotificationLevel::Error
            )]
        );
    }

    #[test]
    fn export_without_block_is_silent() {
        let (host, viewer) = viewer_with(Settings::default(), EditorTheme::Light);
        let mut renderer = FakeRenderer::new();
        let dir = tempfile::tempdir().unwrap();

        assert!(viewer.export(&mut renderer, ExportFormat::Png, dir.path()).is_none());
        assert!(notifications(&host).is_empty());
        assert_eq!(renderer.calls, 0);
    }

    #[test]
    fn copy_reports_success_and_failure() {
        let settings = Settings {
            export_png_resolution: 50,
            ..Settings::default()
        };
        let (host, mut viewer) = viewer_with(settings, EditorTheme::Light);
        let mut renderer = FakeRenderer::new();
        host.post(WebviewMessage::update(block(0, "size:20x40")));
        viewer.pump();

        let mut clipboard = RecordingClipboard::default();
        viewer.copy(&mut renderer, &mut clipboard);
        let image = clipboard.image.as_ref().unwrap();
        assert_eq!((image.width, image.height), (25, 50));

        clipboard.fail_with = Some("no display".to_string());
        viewer.copy(&mut renderer, &mut clipboard);

        assert_eq!(
            notifications(&host),
            vec![
                (COPIED_TO_CLIPBOARD.to_string(), NotificationLevel::Info),
                (
                    "Failed to copy PNG: Clipboard unavailable: no display".to_string(),
                    NotificationLevel::Error
                ),
            ]
        );
    }
}
