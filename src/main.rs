use std::fs::File;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info, warn};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

use citeview::compositor::DualPaneCompositor;
use citeview::event_source::TerminalEventSource;
use citeview::export::export_surfaces;
use citeview::pdf::{DocumentBackend, DocumentSource, LoadStatus, ViewerSession};
use citeview::records::{
    Citation, DocumentRecord, load_citations, load_document_record, local_document_path,
    normalize_doc_url,
};
use citeview::{App, panic_handler, run_app, settings};

#[derive(Parser)]
#[command(name = "citeview", version, about = "Terminal PDF viewer with citation overlays")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log verbosity written to the log file
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[arg(long, global = true, default_value = "citeview.log")]
    log_file: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Open the interactive viewer
    View(DocumentArgs),
    /// Render every page with its highlights to PNG files
    Export {
        #[command(flatten)]
        document: DocumentArgs,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// Citation id to draw as the hovered highlight
        #[arg(long)]
        hover: Option<i64>,

        /// Seconds to wait for rendering before giving up
        #[arg(long, default_value_t = 120)]
        timeout: u64,
    },
}

#[derive(Args)]
struct DocumentArgs {
    /// PDF to open; defaults to the record's `file`
    document: Option<PathBuf>,

    /// Document record JSON (sections and property)
    #[arg(long)]
    record: Option<PathBuf>,

    /// Citation list JSON
    #[arg(long)]
    citations: Option<PathBuf>,

    /// API root used to resolve relative `file` fields
    #[arg(long, default_value = "http://localhost:8000/api")]
    api_base: String,
}

/// Inputs of one viewing session, loaded from disk
struct LoadedDocument {
    source: DocumentSource,
    record: Option<DocumentRecord>,
    citations: Vec<Citation>,
}

impl DocumentArgs {
    fn load(&self) -> Result<LoadedDocument> {
        let record = self
            .record
            .as_deref()
            .map(load_document_record)
            .transpose()?;
        let citations = match &self.citations {
            Some(path) => load_citations(path)?,
            None => Vec::new(),
        };
        let path = match (&self.document, &record) {
            (Some(path), _) => path.clone(),
            (None, Some(record)) => record_document_path(record, &self.api_base)?,
            (None, None) => bail!("pass a PDF path or --record"),
        };
        if !path.exists() {
            bail!("document not found: {}", path.display());
        }
        Ok(LoadedDocument {
            source: DocumentSource::from_path(path),
            record,
            citations,
        })
    }
}

fn record_document_path(record: &DocumentRecord, api_base: &str) -> Result<PathBuf> {
    if Path::new(&record.file).exists() {
        return Ok(PathBuf::from(&record.file));
    }
    local_document_path(&normalize_doc_url(&record.file, api_base))
        .with_context(|| format!("record {} has no local document", record.id))
}

fn init_logging(cli: &Cli, echo_to_terminal: bool) -> Result<()> {
    let file = File::create(&cli.log_file)
        .with_context(|| format!("creating log file {}", cli.log_file.display()))?;
    let mut loggers: Vec<Box<dyn SharedLogger>> =
        vec![WriteLogger::new(cli.log_level, Config::default(), file)];
    if echo_to_terminal {
        loggers.push(TermLogger::new(
            LevelFilter::Warn,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}

#[cfg(feature = "pdf")]
fn document_backend() -> Result<Arc<dyn DocumentBackend>> {
    Ok(Arc::new(citeview::pdf::MupdfBackend))
}

#[cfg(not(feature = "pdf"))]
fn document_backend() -> Result<Arc<dyn DocumentBackend>> {
    bail!("citeview was built without the `pdf` feature")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, Command::View(_));
    init_logging(&cli, !interactive)?;

    info!("Starting citeview {}", env!("CARGO_PKG_VERSION"));
    settings::load_settings();
    let config = settings::get_session_config();
    let backend = document_backend()?;

    match &cli.command {
        Command::View(args) => {
            let document = args.load()?;
            let session = ViewerSession::new(backend, config);
            let compositor = DualPaneCompositor::new(settings::get_side_panel_width());
            let mut app = App::new(session, compositor, "citeview-export");
            app.open_document(document.source, document.record.as_ref(), document.citations);
            run_interactive(&mut app)
        }
        Command::Export {
            document,
            out,
            hover,
            timeout,
        } => {
            let document = document.load()?;
            let session = ViewerSession::new(backend, config);
            let compositor = DualPaneCompositor::new(settings::get_side_panel_width());
            let mut app = App::new(session, compositor, out.clone());
            app.open_document(document.source, document.record.as_ref(), document.citations);
            run_export(app, *hover, out, Duration::from_secs(*timeout))
        }
    }
}

fn run_interactive(app: &mut App) -> Result<()> {
    panic_handler::initialize_panic_handler();

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app, &mut TerminalEventSource);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!("Application error: {err:?}");
    }
    info!("Shutting down citeview");
    res
}

fn run_export(mut app: App, hover: Option<i64>, out: &Path, timeout: Duration) -> Result<()> {
    if let Some(id) = hover {
        match app.compositor().citations().iter().position(|c| c.id == id) {
            Some(index) => {
                app.hover_citation(index);
            }
            None => warn!("Citation {id} not in the citation list"),
        }
    }
    if !app.wait_until_settled(timeout) {
        bail!("rendering did not finish within {}s", timeout.as_secs());
    }
    if let LoadStatus::Failed(detail) = app.session().status() {
        bail!("could not open document: {detail}");
    }

    let written = export_surfaces(app.session().surfaces(), out)?;
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}
