//! Command line front end: render switch/case templates into validated JSON documents.
//!
//! # Usage
//!
//! ```text
//! switchplate render --template <file> --context <file> [--output <file>] [--pretty]
//! switchplate requirements --template <file> [--context <file>]
//! switchplate schema --template <file>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use switchplate::{Json, RenderContext, Requirement, Template, render_document};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "switchplate",
    version,
    about = "Render switch/case templates into validated JSON documents",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template with a context file and validate the result.
    Render(RenderArgs),

    /// List the flags and values a template still needs.
    Requirements(RequirementsArgs),

    /// Print every switch and placeholder a template declares, as JSON.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Template source file.
    #[arg(short, long)]
    template: PathBuf,

    /// JSON file with `flags` and `values` for the render.
    #[arg(short, long)]
    context: PathBuf,

    /// Write the document here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Re-serialize the validated document with indentation.
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct RequirementsArgs {
    /// Template source file.
    #[arg(short, long)]
    template: PathBuf,

    /// JSON file with the bindings already known.
    #[arg(short, long)]
    context: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Template source file.
    #[arg(short, long)]
    template: PathBuf,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

impl RenderArgs {
    fn run(self) -> Result<()> {
        let source = read_file(&self.template)?;
        let template = load_template(&source, &self.template)?;
        let context = read_context(&self.context)?;

        let rendered = render_document(&template, &context, &Json).map_err(|err| {
            let stage = err.stage().map_or_else(|| "render".to_string(), |s| s.to_string());
            anyhow::Error::new(err).context(format!(
                "{stage} stage failed for {}",
                self.template.display()
            ))
        })?;

        let mut text = if self.pretty {
            serde_json::to_string_pretty(&rendered.document)?
        } else {
            rendered.text
        };
        if !text.ends_with('\n') {
            text.push('\n');
        }

        match &self.output {
            Some(path) => fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => print!("{text}"),
        }
        Ok(())
    }
}

impl RequirementsArgs {
    fn run(self) -> Result<()> {
        let source = read_file(&self.template)?;
        let template = load_template(&source, &self.template)?;
        let context = match &self.context {
            Some(path) => read_context(path)?,
            None => RenderContext::new(),
        };

        for (name, kind) in template.requirements(&context) {
            let kind = match kind {
                Requirement::Flag => "flag",
                Requirement::Value => "value",
            };
            println!("{kind}\t{name}");
        }
        Ok(())
    }
}

impl SchemaArgs {
    fn run(self) -> Result<()> {
        let source = read_file(&self.template)?;
        let template = load_template(&source, &self.template)?;
        println!("{}", serde_json::to_string_pretty(&template.schema())?);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_template<'a>(source: &'a str, path: &Path) -> Result<Template<'a>> {
    let template = Template::load(source)
        .with_context(|| format!("failed to load template {}", path.display()))?;
    Ok(template.with_name(path.display().to_string()))
}

fn read_context(path: &Path) -> Result<RenderContext<'static>> {
    parse_context(&read_file(path)?)
        .with_context(|| format!("invalid context file {}", path.display()))
}

fn parse_context(text: &str) -> Result<RenderContext<'static>> {
    Ok(serde_json::from_str(text)?)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => args.run(),
        Commands::Requirements(args) => args.run(),
        Commands::Schema(args) => args.run(),
    }
}
