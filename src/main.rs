use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::{error, info, warn};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};

use mermaidlens::block::{BlockDescriptor, DocumentUri};
use mermaidlens::event_source::{EventSource, ScriptedEventSource, ViewerEvent, parse_event_script};
use mermaidlens::export::{ExportFormat, SystemClipboard};
use mermaidlens::notification::NotificationLevel;
use mermaidlens::panic_handler;
use mermaidlens::renderer::CommandRenderer;
use mermaidlens::scanner::scan_blocks;
use mermaidlens::session::Session;
use mermaidlens::settings::{self, Settings};
use mermaidlens::theme::EditorTheme;

#[derive(Debug, Parser)]
#[command(name = "mermaidlens", version, about = "Pan, zoom and export fenced Mermaid diagrams")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// More output per occurrence (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Editor background colour, used to pick a light or dark diagram theme
    #[arg(long, global = true, default_value = "#ffffff")]
    background: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the mermaid blocks of a document
    Blocks { file: PathBuf },

    /// Render a block headlessly, replay viewer events and print the frame coordinates
    View {
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        block: usize,
        #[arg(long, default_value = "800x656")]
        size: PanelSize,
        /// Events such as "zoom-in wheel:400,300,-1 drag:0,0 move:20,10 release"
        #[arg(long)]
        events: Option<String>,
    },

    /// Export a block as SVG or PNG next to the given output directory
    Export {
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        block: usize,
        #[arg(long, value_enum)]
        format: FormatArg,
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },

    /// Copy a block to the clipboard as an image
    Copy {
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        block: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Svg,
    Png,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Svg => ExportFormat::Svg,
            FormatArg::Png => ExportFormat::Png,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PanelSize {
    width: f64,
    height: f64,
}

impl FromStr for PanelSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .split_once('x')
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| *v > 0.0)
                .ok_or_else(|| format!("invalid dimension '{v}'"))
        };
        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
        })
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    match &cli.log_file {
        Some(path) => WriteLogger::init(
            level,
            Config::default(),
            File::create(path).with_context(|| format!("Cannot create log file {path:?}"))?,
        )?,
        None => TermLogger::init(
            level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )?,
    }
    Ok(())
}

fn load_settings(cli: &Cli) -> Settings {
    match cli.config.clone().or_else(settings::default_config_path) {
        Some(path) => settings::load_or_create(&path),
        None => {
            warn!("Could not determine config directory, using default settings");
            Settings::default()
        }
    }
}

fn read_document(file: &Path) -> Result<(DocumentUri, String)> {
    let text =
        fs::read_to_string(file).with_context(|| format!("Cannot read {}", file.display()))?;
    let path = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
    Ok((DocumentUri::new(format!("file://{}", path.display())), text))
}

fn select_block(file: &Path, index: usize) -> Result<BlockDescriptor> {
    let (uri, text) = read_document(file)?;
    let blocks = scan_blocks(&uri, &text);
    let count = blocks.len();
    blocks.into_iter().nth(index).ok_or_else(|| {
        anyhow!(
            "{} has {count} mermaid block(s), no block #{index}",
            file.display()
        )
    })
}

fn summary(block: &BlockDescriptor) -> String {
    block
        .content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("(empty)")
        .to_string()
}

/// Fail with the newest error toast, if the last action produced one
fn check_notifications(session: &Session<CommandRenderer>) -> Result<()> {
    let Some(current) = session.panel().and_then(|p| p.notifications().current()) else {
        return Ok(());
    };
    match current.level {
        NotificationLevel::Error => bail!("{}", current.message),
        _ => {
            println!("{}", current.message);
            Ok(())
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli);
    let renderer = CommandRenderer::new(&settings.renderer_command);
    let mut session = Session::new(
        settings,
        renderer,
        EditorTheme::from_background(&cli.background),
    );

    match cli.command {
        Command::Blocks { file } => {
            let (uri, text) = read_document(&file)?;
            for block in scan_blocks(&uri, &text) {
                println!(
                    "#{} lines {}-{}: {}",
                    block.sequence,
                    block.start_line + 1,
                    block.end_line + 1,
                    summary(&block)
                );
            }
        }
        Command::View {
            file,
            block,
            size,
            events,
        } => {
            let descriptor = select_block(&file, block)?;
            session.open_viewer(descriptor);
            session.handle_event(ViewerEvent::Resize {
                width: size.width,
                height: size.height,
            });
            session.flush();

            let controller = session
                .viewer()
                .map(|viewer| viewer.controller())
                .ok_or_else(|| anyhow!("Viewer was not created"))?;
            if let Some(error) = controller.error() {
                bail!("Failed to render block #{block}: {error}");
            }

            let mut source = ScriptedEventSource::new(match events {
                Some(script) => parse_event_script(&script)?,
                None => Vec::new(),
            });
            while let Some(event) = source.next_event() {
                session.handle_event(event);
            }

            if let Some(viewer) = session.viewer() {
                println!(
                    "{}",
                    serde_json::to_string_pretty(viewer.controller().coords())?
                );
            }
        }
        Command::Export {
            file,
            block,
            format,
            output,
        } => {
            let descriptor = select_block(&file, block)?;
            session.open_viewer(descriptor);
            session.flush();
            match session.export(format.into(), &output) {
                Some(path) => println!("{}", path.display()),
                None => {
                    check_notifications(&session)?;
                    bail!("Nothing to export");
                }
            }
        }
        Command::Copy { file, block } => {
            let descriptor = select_block(&file, block)?;
            session.open_viewer(descriptor);
            session.flush();
            session.copy(&mut SystemClipboard);
            check_notifications(&session)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    panic_handler::initialize_panic_handler();

    let cli = Cli::parse();
    init_logging(&cli)?;
    info!("Starting mermaidlens");

    let result = run(cli);
    if let Err(e) = &result {
        error!("{e:#}");
    }
    info!("Shutting down mermaidlens");
    result
}
