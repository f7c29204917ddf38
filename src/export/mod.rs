pub mod exporter;
pub mod filename;

pub use exporter::{
    ExportError, ExportFormat, ImageClipboard, RasterImage, SystemClipboard, copy_to_clipboard,
    export_to_dir,
};
pub use filename::{diagram_file_stem, sanitize_filename};
