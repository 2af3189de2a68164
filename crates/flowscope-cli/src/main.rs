//! CLI binary for inspecting, linting, and exporting pipeline documents.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use flowscope_model::PipelineDoc;
use flowscope_view::{Explorer, PhaseFilter, Severity};

const DEMO_DOC: &str = include_str!("../../../demos/brief.json");

#[derive(Parser)]
#[command(name = "fsc", version, about = "Interactive pipeline explorer: graph derivation, diagram snapshots, markdown export")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a summary of a pipeline document
    Info {
        /// Path to the pipeline document (JSON); omit with --demo
        document: Option<PathBuf>,

        /// Use the embedded demo pipeline
        #[arg(long)]
        demo: bool,
    },

    /// Run the advisory lint rules over a document
    Validate {
        document: Option<PathBuf>,

        #[arg(long)]
        demo: bool,
    },

    /// Export the pipeline (or one step) as markdown
    Export {
        document: Option<PathBuf>,

        #[arg(long)]
        demo: bool,

        /// Export a single step by id instead of the whole document
        #[arg(short, long)]
        step: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Dump the rendered scene description as JSON
    Scene {
        document: Option<PathBuf>,

        #[arg(long)]
        demo: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render the diagram scene to a standalone SVG file
    Svg {
        document: Option<PathBuf>,

        #[arg(long)]
        demo: bool,

        /// Output file (default: <document stem>.svg)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Render with this step selected
        #[arg(long)]
        select: Option<String>,

        /// Dim every phase except this one
        #[arg(long)]
        focus: Option<String>,

        /// Zoom factor (clamped to [0.2, 2.0], 5% steps)
        #[arg(long)]
        zoom: Option<f64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Info { document, demo } => {
            cmd_info(&load_doc(document.as_deref(), demo)?)?;
        }
        Commands::Validate { document, demo } => {
            cmd_validate(&load_doc(document.as_deref(), demo)?);
        }
        Commands::Export {
            document,
            demo,
            step,
            output,
        } => {
            cmd_export(
                &load_doc(document.as_deref(), demo)?,
                step.as_deref(),
                output.as_deref(),
            )?;
        }
        Commands::Scene {
            document,
            demo,
            output,
        } => {
            cmd_scene(&load_doc(document.as_deref(), demo)?, output.as_deref())?;
        }
        Commands::Svg {
            document,
            demo,
            output,
            select,
            focus,
            zoom,
        } => {
            let out = resolve_svg_output(document.as_deref(), output);
            cmd_svg(
                &load_doc(document.as_deref(), demo)?,
                &out,
                select.as_deref(),
                focus.as_deref(),
                zoom,
            )?;
        }
    }

    Ok(())
}

fn load_doc(path: Option<&Path>, demo: bool) -> anyhow::Result<PipelineDoc> {
    let doc = match (path, demo) {
        (Some(p), false) => PipelineDoc::load(p)?,
        (None, true) => PipelineDoc::from_json(DEMO_DOC)?,
        (Some(_), true) => anyhow::bail!("pass a document path or --demo, not both"),
        (None, false) => anyhow::bail!("missing document path (or use --demo)"),
    };
    tracing::debug!(steps = doc.steps.len(), "document ready");
    Ok(doc)
}

fn resolve_svg_output(document: Option<&Path>, output: Option<PathBuf>) -> PathBuf {
    if let Some(out) = output {
        return out;
    }
    match document {
        Some(doc) => doc.with_extension("svg"),
        None => PathBuf::from("pipeline.svg"),
    }
}

fn cmd_info(doc: &PipelineDoc) -> anyhow::Result<()> {
    let explorer = Explorer::new(doc.clone());

    println!("Pipeline: {}", doc.title);
    println!("Summary: {}", doc.summary);
    println!("Steps: {}", doc.steps.len());
    println!("Data edges: {}", explorer.graph().edges.len());
    println!("Validation loops: {}", doc.validation_loops.len());

    println!("\nPhases:");
    for (phase, roman) in explorer.romans() {
        let count = doc.steps.iter().filter(|s| &s.phase == phase).count();
        println!("  {} {} ({} steps)", roman, doc.phase_label(phase), count);
    }

    let entries = explorer.graph().entry_steps(doc);
    if !entries.is_empty() {
        println!("\nEntry points:");
        for step in entries {
            println!("  Step {}: {} ({})", step.num, step.name, step.id);
        }
    }

    let mut grouped: Vec<&flowscope_model::Step> = doc
        .steps
        .iter()
        .filter(|s| explorer.parallel_group(&s.id).is_some())
        .collect();
    if !grouped.is_empty() {
        grouped.sort_by_key(|s| explorer.parallel_group(&s.id));
        println!("\nParallel groups:");
        for step in grouped {
            let letter = explorer.parallel_group(&step.id).unwrap_or('?');
            println!("  [{}] Step {}: {}", letter, step.num, step.name);
        }
    }

    Ok(())
}

fn cmd_validate(doc: &PipelineDoc) {
    let diagnostics = flowscope_view::lint(doc);

    if diagnostics.is_empty() {
        println!("Document is clean");
        return;
    }

    let mut has_error = false;
    for diag in &diagnostics {
        let severity = match diag.severity {
            Severity::Error => {
                has_error = true;
                "ERROR"
            }
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        println!("[{}] {}: {}", severity, diag.rule, diag.message);
    }

    if has_error {
        std::process::exit(1);
    }
}

fn cmd_export(
    doc: &PipelineDoc,
    step: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let explorer = Explorer::new(doc.clone());

    let md = match step {
        Some(id) => explorer
            .export_step_markdown(id)
            .ok_or_else(|| anyhow::anyhow!("no step with id '{}'", id))?,
        None => explorer.export_markdown(chrono::Local::now().date_naive()),
    };

    match output {
        Some(path) => {
            std::fs::write(path, &md)?;
            println!("Wrote {}", path.display());
        }
        None => print!("{md}"),
    }
    Ok(())
}

fn cmd_scene(doc: &PipelineDoc, output: Option<&Path>) -> anyhow::Result<()> {
    let explorer = Explorer::new(doc.clone());
    let json = serde_json::to_string_pretty(&explorer.scene())?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_svg(
    doc: &PipelineDoc,
    output: &Path,
    select: Option<&str>,
    focus: Option<&str>,
    zoom: Option<f64>,
) -> anyhow::Result<()> {
    let mut explorer = Explorer::new(doc.clone());

    if let Some(id) = select {
        if doc.step(id).is_none() {
            anyhow::bail!("no step with id '{}'", id);
        }
        explorer.select_node(id);
    }
    if let Some(phase) = focus {
        explorer.set_focus_phase(PhaseFilter::Only(phase.to_string()));
    }
    if let Some(z) = zoom {
        explorer.ui.zoom = flowscope_view::step_zoom(z, 0.0);
    }

    let scene = explorer.scene();
    let svg = flowscope_view::write_scene(&scene);
    std::fs::write(output, svg)?;

    println!("Wrote {}", output.display());
    println!(
        "  {} nodes, {} edges, {} loops at {:.0}%",
        scene.nodes.len(),
        scene.edges.len(),
        scene.loops.len(),
        scene.zoom * 100.0
    );
    Ok(())
}
