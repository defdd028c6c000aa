use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lminspect::cache::InspectionCache;
use lminspect::config::Config;
use lminspect::copilot::Copilot;
use lminspect::copilot::http::HttpChatChannel;
use lminspect::debounce::Debouncer;
use lminspect::inspector::Inspector;
use lminspect::render::{Decoration, DocumentRenderer, MemorySurface, Surface};
use lminspect::symbols::{Document, JavaOutline, OutlineProvider, content_hash};

#[derive(Parser)]
#[command(name = "lminspect", version, about = "Language-model code inspection for Java sources")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, global = true, default_value = "")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the code units of a file with their content hashes
    Outline { file: PathBuf },
    /// Inspect a file (or one unit of it) and print the rendered results
    Inspect {
        file: PathBuf,
        /// Qualified unit name, e.g. `Outer.Inner.run`
        #[arg(long)]
        unit: Option<String>,
    },
    /// Re-inspect changed units whenever the file is saved
    Watch { file: PathBuf },
}

struct App {
    config: Config,
    inspector: Inspector,
    renderer: DocumentRenderer,
    surface: Arc<MemorySurface>,
    outline: Arc<dyn OutlineProvider>,
}

impl App {
    fn new(config: Config) -> Self {
        let channel = HttpChatChannel::new(
            config.model.endpoint.clone(),
            config.model.name.clone(),
            config.model.api_key(),
        );
        let copilot = Copilot::new(Arc::new(channel))
            .with_max_rounds(config.model.max_rounds)
            .with_end_mark(config.model.end_mark.clone())
            .with_java_version(config.inspection.java_version);

        let cache = Arc::new(InspectionCache::new());
        let outline: Arc<dyn OutlineProvider> = Arc::new(JavaOutline::new());
        let surface = Arc::new(MemorySurface::new());

        let inspector = Inspector::new(Arc::new(copilot), Arc::clone(&cache), Arc::clone(&outline))
            .with_max_concurrencies(config.inspection.max_concurrencies);
        let renderer = DocumentRenderer::new(
            Arc::clone(&surface) as Arc<dyn Surface>,
            cache,
            Arc::clone(&outline),
        )
        .with_rerender_delay(config.inspection.rerender_debounce());
        renderer.reload(&config.renderer);

        Self {
            config,
            inspector,
            renderer,
            surface,
            outline,
        }
    }

    /// Inspect every method and constructor whose cached result is stale.
    async fn inspect_stale(&self, document: &Document) -> Result<usize> {
        let units = self.outline.code_units(document)?;
        let mut inspected = 0;
        for unit in units.iter().filter(|u| u.kind.is_callable()) {
            if self.inspector.cache().has_valid_entry(document, Some(unit)) {
                continue;
            }
            match self.inspector.inspect_unit(document, unit).await {
                Ok(_) => inspected += 1,
                Err(e) => warn!("failed to inspect {unit}: {e}"),
            }
        }
        Ok(inspected)
    }

    fn print(&self, document: &Document) {
        let snapshot = self.surface.snapshot(document.key());
        if snapshot.is_empty() {
            println!("{}: no inspections", document.key());
            return;
        }
        for (kind, items) in snapshot {
            println!("[{kind}]");
            for item in items {
                let text = match &item.decoration {
                    Decoration::Diagnostic { message, severity, .. } => {
                        format!("{severity:?}: {message}")
                    }
                    Decoration::GutterIcon { hover } => hover.replace("\n\n", " | "),
                    Decoration::CodeLens { title, tooltip } if tooltip.is_empty() => title.clone(),
                    Decoration::CodeLens { title, tooltip } => format!("{title} ({tooltip})"),
                    Decoration::RulerHighlight => "marker".to_string(),
                };
                println!(
                    "  {}:{}:{}  {text}",
                    document.key(),
                    item.range.start.line + 1,
                    item.range.start.column + 1
                );
            }
        }
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Document::new(path.display().to_string(), text))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    config.validate()?;

    match cli.command {
        Command::Outline { file } => outline(&file),
        Command::Inspect { file, unit } => inspect(App::new(config), &file, unit.as_deref()).await,
        Command::Watch { file } => watch(App::new(config), &file).await,
    }
}

fn outline(file: &Path) -> Result<()> {
    let document = read_document(file)?;
    let units = JavaOutline::new().code_units(&document)?;
    for unit in &units {
        let hash = content_hash(&document, unit);
        println!(
            "{:<12}{:<40}{:>5}-{:<5}{}",
            unit.kind.to_string(),
            unit.name,
            unit.start_line() + 1,
            unit.end_line() + 1,
            &hash.as_str()[..12]
        );
    }
    Ok(())
}

async fn inspect(app: App, file: &Path, unit: Option<&str>) -> Result<()> {
    let document = read_document(file)?;
    match unit {
        Some(name) => {
            let units = app.outline.code_units(&document)?;
            let Some(unit) = units.iter().find(|u| u.name == name) else {
                bail!("no unit named {name} in {}", document.key());
            };
            app.inspector.inspect_unit(&document, unit).await?;
        }
        None => {
            app.inspector.inspect_document(&document).await?;
        }
    }
    app.renderer.rerender(&document).await?;
    app.print(&document);
    Ok(())
}

async fn watch(app: App, file: &Path) -> Result<()> {
    let app = Arc::new(app);
    let path = file
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", file.display()))?;

    let document = read_document(&path)?;
    let count = app.inspect_stale(&document).await?;
    info!("inspected {count} unit(s)");
    app.renderer.rerender(&document).await?;
    app.print(&document);

    let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        NotifyConfig::default(),
    )
    .context("Failed to create filesystem watcher")?;
    // Replace-on-save swaps the file's inode; watch the directory instead.
    let dir = path
        .parent()
        .with_context(|| format!("{} has no parent directory", path.display()))?;
    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;
    info!("watching {}", path.display());

    let debouncer = Arc::new(Debouncer::new());
    let key = path.display().to_string();

    loop {
        let event = tokio::select! {
            e = rx.recv() => e,
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        };
        match event {
            Some(Ok(event)) if touches(&event, &path) => {}
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!("watch error: {e}");
                continue;
            }
            None => bail!("Watcher channel closed"),
        }

        // show nothing stale while the edit settles
        let document = match read_document(&path) {
            Ok(document) => document,
            Err(e) => {
                warn!("skipping change: {e:#}");
                continue;
            }
        };
        app.renderer.clear(Some(document.key()));

        let app = Arc::clone(&app);
        let debouncer = Arc::clone(&debouncer);
        let path = path.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let delay = app.config.inspection.debounce();
            debouncer
                .schedule(&key, delay, || async {
                    if let Err(e) = refresh(&app, &path).await {
                        warn!("refresh failed: {e:#}");
                    }
                })
                .await;
        });
    }
}

/// A content change of `path`.
fn touches(event: &Event, path: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create()) && event.paths.iter().any(|p| p == path)
}

async fn refresh(app: &App, path: &Path) -> Result<()> {
    let document = read_document(path)?;
    let count = app.inspect_stale(&document).await?;
    info!("re-inspected {count} unit(s)");
    app.renderer.rerender(&document).await?;
    app.print(&document);
    Ok(())
}
