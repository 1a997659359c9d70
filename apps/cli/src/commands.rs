//! CLI command definitions, routing, and tracing setup.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use specmill_pipeline::{
    AssertionOptions, BiblioOptions, BoilerplateMount, BoilerplateOptions, DocumentConfig,
    Processor, ProcessorOptions, RemoteResolver, RunOptions, Session, StaticResolver, TocOptions,
    XrefSource,
};
use specmill_shared::OutputArea;

use crate::manifest::{Manifest, load_biblio, load_manifest, load_xrefs};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// specmill — turn annotated spec sources into cross-referenced documents.
#[derive(Parser)]
#[command(
    name = "specmill",
    version,
    about = "Post-process annotated spec documents: cross-references, bibliography, assertions.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Render a spec source through the full annotation pipeline.
    Render {
        /// Input document (markdown or HTML).
        input: String,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        out: Option<String>,

        /// Canonical base URL of the published document.
        #[arg(long)]
        base: Option<String>,

        /// Spec shortname for assertion ids.
        #[arg(long)]
        spec: Option<String>,

        /// Spec version for assertion ids.
        #[arg(long)]
        version: Option<String>,

        /// JSON bibliography database (id → entry).
        #[arg(long)]
        biblio: Option<String>,

        /// JSON cross-reference lookup table for offline resolution.
        #[arg(long)]
        xrefs: Option<String>,

        /// Remote cross-reference database endpoint (JSON batch API),
        /// queried after the lookup table.
        #[arg(long)]
        xref_endpoint: Option<String>,

        /// Document manifest (specmill.toml).
        #[arg(long)]
        manifest: Option<String>,

        /// Skip outline rendering.
        #[arg(long)]
        no_toc: bool,
    },

    /// Extract normative assertions to a JSON file.
    #[command(name = "export-assertions")]
    ExportAssertions {
        /// Input document; alternatively give --spec and --version.
        #[arg(long)]
        input: Option<String>,

        /// Spec shortname (with --version, locates the input under the
        /// spec directory and names the assertion ids).
        #[arg(long)]
        spec: Option<String>,

        /// Spec version.
        #[arg(long)]
        version: Option<String>,

        /// Root directory of spec sources.
        #[arg(long, env = "SPEC_DIR", default_value = "spec")]
        spec_dir: String,

        /// Base URL prefixed to assertion anchors.
        #[arg(long)]
        base: Option<String>,

        /// Output JSON file.
        #[arg(long, default_value = "assertions.json")]
        out: String,

        /// Exit non-zero when a block carries multiple normative keywords.
        #[arg(long)]
        strict: bool,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Render {
            input,
            out,
            base,
            spec,
            version,
            biblio,
            xrefs,
            xref_endpoint,
            manifest,
            no_toc,
        } => {
            cmd_render(
                &input,
                out.as_deref(),
                base.as_deref(),
                spec,
                version,
                biblio.as_deref(),
                xrefs.as_deref(),
                xref_endpoint.as_deref(),
                manifest.as_deref(),
                no_toc,
            )
            .await
        }
        Command::ExportAssertions {
            input,
            spec,
            version,
            spec_dir,
            base,
            out,
            strict,
        } => {
            let outcome = export_assertions(ExportArgs {
                input,
                spec,
                version,
                spec_dir,
                base,
                out,
            })
            .await?;
            for warning in &outcome.multi_keyword_warnings {
                warn!("{warning}");
            }
            println!(
                "Wrote {} assertions to {}",
                outcome.items.len(),
                outcome.out_path.display()
            );
            if strict && !outcome.multi_keyword_warnings.is_empty() {
                eprintln!(
                    "{} blocks with multiple normative keywords (strict mode)",
                    outcome.multi_keyword_warnings.len()
                );
                std::process::exit(2);
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// render
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
async fn cmd_render(
    input: &str,
    out: Option<&str>,
    base: Option<&str>,
    spec: Option<String>,
    version: Option<String>,
    biblio: Option<&str>,
    xrefs: Option<&str>,
    xref_endpoint: Option<&str>,
    manifest_path: Option<&str>,
    no_toc: bool,
) -> Result<()> {
    let input_path = PathBuf::from(input);
    let manifest = match manifest_path {
        Some(path) => load_manifest(Path::new(path))?,
        None => Manifest::default(),
    };

    let spec = spec.or(manifest.document.spec.clone());
    let version = version.or(manifest.document.version.clone());
    let base = base
        .map(String::from)
        .or(manifest.document.base_url.clone());
    let base_url = base
        .map(|b| Url::parse(&b).map_err(|e| eyre!("invalid base URL '{b}': {e}")))
        .transpose()?;

    let biblio_entries = match biblio.or(manifest.biblio.path.as_deref()) {
        Some(path) => load_biblio(Path::new(path))?,
        None => Default::default(),
    };

    let mut xref_sources = Vec::new();
    if let Some(path) = xrefs {
        let table = load_xrefs(Path::new(path))?;
        let resolver = table
            .entries
            .iter()
            .fold(StaticResolver::new(), |resolver, (term, results)| {
                resolver.with_entry(term, results.clone())
            });
        xref_sources.push(XrefSource {
            specs: table.specs,
            resolver: Arc::new(resolver),
        });
    }
    if let Some(endpoint) = xref_endpoint {
        let endpoint =
            Url::parse(endpoint).map_err(|e| eyre!("invalid xref endpoint '{endpoint}': {e}"))?;
        xref_sources.push(XrefSource {
            specs: None,
            resolver: Arc::new(RemoteResolver::new(endpoint)),
        });
    }

    let run = RunOptions {
        base_url: base_url.clone(),
        xref: xref_sources,
        biblio: BiblioOptions {
            entries: biblio_entries,
        },
        toc: TocOptions {
            enabled: manifest.document.toc && !no_toc,
        },
        boilerplate: boilerplate_options(&manifest)?,
        assertions: AssertionOptions { spec, version },
        ..Default::default()
    };

    let processor = Processor::new(ProcessorOptions {
        base_url,
        base_dir: input_path.parent().map(Path::to_path_buf),
        run,
        ..Default::default()
    });

    let config = DocumentConfig {
        sections: vec![read_source(&input_path)?],
        ..Default::default()
    };

    let mut session = Session::new();
    let result = processor.render(&config, &mut session).await?;

    for warning in &result.warnings {
        warn!("{warning}");
    }

    let mut html = String::new();
    if let Some(toc) = &result.toc {
        if !toc.is_empty() {
            html.push_str("<nav id=\"toc\">");
            html.push_str(toc);
            html.push_str("</nav>\n");
        }
    }
    for section in &result.sections {
        html.push_str(section);
        html.push('\n');
    }

    match out {
        Some(path) => {
            std::fs::write(path, &html)?;
            info!(
                out = %path,
                warnings = result.warnings.len(),
                elapsed_ms = result.stats.processing_time_ms,
                "render complete"
            );
        }
        None => print!("{html}"),
    }
    Ok(())
}

fn boilerplate_options(manifest: &Manifest) -> Result<BoilerplateOptions> {
    let mount = match manifest.boilerplate.mount.as_deref() {
        None | Some("end") => BoilerplateMount::End,
        Some("before-references") => BoilerplateMount::BeforeReferences,
        Some("after-toc") => BoilerplateMount::AfterToc,
        Some(other) => return Err(eyre!("unknown boilerplate mount '{other}'")),
    };
    let enabled = |flag: bool| flag.then(Default::default);
    Ok(BoilerplateOptions {
        conformance: enabled(manifest.boilerplate.conformance),
        security: enabled(manifest.boilerplate.security),
        privacy: enabled(manifest.boilerplate.privacy),
        mount,
    })
}

// ---------------------------------------------------------------------------
// export-assertions
// ---------------------------------------------------------------------------

/// One exported assertion record.
#[derive(Debug, Clone, Serialize)]
struct ExportedAssertion {
    id: String,
    url: String,
    #[serde(rename = "type")]
    keyword: String,
    snippet: String,
}

struct ExportArgs {
    input: Option<String>,
    spec: Option<String>,
    version: Option<String>,
    spec_dir: String,
    base: Option<String>,
    out: String,
}

#[derive(Debug)]
struct ExportOutcome {
    items: Vec<ExportedAssertion>,
    multi_keyword_warnings: Vec<String>,
    out_path: PathBuf,
}

async fn export_assertions(args: ExportArgs) -> Result<ExportOutcome> {
    let input_path = match &args.input {
        Some(path) => PathBuf::from(path),
        None => {
            let (spec, version) = match (&args.spec, &args.version) {
                (Some(spec), Some(version)) => (spec, version),
                _ => {
                    return Err(eyre!(
                        "either --input or both --spec and --version are required"
                    ));
                }
            };
            locate_spec_source(Path::new(&args.spec_dir), spec, version)?
        }
    };
    if !input_path.is_file() {
        return Err(eyre!("input not found: {}", input_path.display()));
    }

    // Fall back to the conventional …/<spec>/<version>/<file> layout.
    let inferred = infer_spec_version(&input_path);
    let spec = args.spec.or_else(|| inferred.clone().map(|(s, _)| s));
    let version = args.version.or_else(|| inferred.map(|(_, v)| v));

    let run = RunOptions {
        assertions: AssertionOptions { spec, version },
        ..Default::default()
    };
    let processor = Processor::new(ProcessorOptions {
        base_dir: input_path.parent().map(Path::to_path_buf),
        run,
        ..Default::default()
    });
    let config = DocumentConfig {
        sections: vec![read_source(&input_path)?],
        ..Default::default()
    };

    let areas: BTreeSet<OutputArea> = [OutputArea::Assertions].into();
    let mut session = Session::new();
    let result = processor
        .render_areas(&config, &mut session, Some(&areas))
        .await?;

    let base = args.base.map(|b| {
        if b.ends_with('/') || b.contains('#') {
            b
        } else {
            format!("{b}/")
        }
    });
    let items: Vec<ExportedAssertion> = result
        .assertions
        .iter()
        .map(|item| ExportedAssertion {
            id: item.id.clone(),
            url: match &base {
                Some(base) => format!("{base}#{}", item.anchor_id),
                None => format!("#{}", item.anchor_id),
            },
            keyword: item.keyword.as_str().to_string(),
            snippet: item.snippet.clone(),
        })
        .collect();

    let out_path = PathBuf::from(&args.out);
    let json = serde_json::to_string_pretty(&items)?;
    std::fs::write(&out_path, format!("{json}\n"))?;

    let multi_keyword_warnings = result
        .warnings
        .iter()
        .filter(|w| w.contains("Multiple normative keywords"))
        .cloned()
        .collect();

    Ok(ExportOutcome {
        items,
        multi_keyword_warnings,
        out_path,
    })
}

/// `<spec_dir>/<spec>/<version>/index.spec.{md,html}`, whichever exists.
fn locate_spec_source(spec_dir: &Path, spec: &str, version: &str) -> Result<PathBuf> {
    let dir = spec_dir.join(spec).join(version);
    for name in ["index.spec.md", "index.spec.html"] {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(eyre!(
        "no spec source under {} (expected index.spec.md or index.spec.html)",
        dir.display()
    ))
}

/// Infer `(spec, version)` from a `…/<spec>/<version>/<file>` path.
fn infer_spec_version(path: &Path) -> Option<(String, String)> {
    let components: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(os) => Some(os.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let n = components.len();
    if n >= 3 {
        Some((components[n - 3].clone(), components[n - 2].clone()))
    } else {
        None
    }
}

/// Read a source document, converting markdown inputs to HTML.
fn read_source(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read {}: {e}", path.display()))?;
    let is_markdown = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
    if is_markdown {
        let rendered = specmill_markdown::render(&raw, &Default::default());
        Ok(rendered.html)
    } else {
        Ok(raw)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
