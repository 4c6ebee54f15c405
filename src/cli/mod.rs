//! CLI module for refgraph

mod args;

pub use args::{Args, Command, GraphArgs};

use crate::census;
use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::error::{Error, Result};
use crate::graph::{find_backref_chain, find_ref_chain, GraphOptions};
use crate::graph::label::safe_summary;
use crate::object::{Heap, Inspect, ObjectId, ObjectSpace};
use crate::output::{GraphOutput, Presenter, SystemTools};
use crate::show::{show_backrefs, show_chain, show_refs};
use glob::Pattern;
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();
    init_logging(args.verbose);

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "refgraph=warn",
        1 => "refgraph=info",
        2 => "refgraph=debug",
        _ => "refgraph=trace",
    };
    // A second init (tests, embedding) is harmless.
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn execute(args: Args) -> Result<()> {
    let cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(Path::new(DEFAULT_CONFIG_FILE)),
    };

    match args.command {
        Command::Backrefs(graph) => draw(cfg, graph, true),
        Command::Refs(graph) => draw(cfg, graph, false),

        Command::Chain {
            snapshot,
            from,
            to_type,
            forward,
            depth,
            output,
        } => {
            let mut cfg = cfg;
            cfg.merge_cli(None, None, depth, None);
            cfg.validate()?;

            let heap = load_heap(&snapshot)?;
            let start = ObjectId(from);
            if !heap.contains(start) {
                return Err(Error::UnknownObject(start));
            }
            let pattern = Pattern::new(&to_type)?;
            let predicate = |_: ObjectId, obj: &dyn Inspect| type_glob_matches(&pattern, obj);

            let ignore = HashSet::new();
            let chain = if forward {
                find_ref_chain(&heap, start, predicate, cfg.chain.max_depth, &ignore)
            } else {
                find_backref_chain(&heap, start, predicate, cfg.chain.max_depth, &ignore)
            };

            let to_stdout = is_stdout(output.as_deref());
            if chain.len() == 1 && !heap.get(start).map_or(false, |o| type_glob_matches(&pattern, o)) {
                if to_stdout {
                    eprintln!("No chain found to {} within {} steps", to_type, cfg.chain.max_depth);
                } else {
                    println!("No chain found to {} within {} steps", to_type, cfg.chain.max_depth);
                }
            } else if !to_stdout {
                print_objects(&heap, &chain, cfg.graph.shortnames);
            }

            if let Some(output) = output {
                let tools = SystemTools;
                let presenter = presenter(&cfg, &tools);
                let options = cfg.graph_options();
                let mut stdout = io::stdout();
                let target = graph_output(&output, &mut stdout);
                let presentation =
                    show_chain(&heap, &[chain], !forward, options, target, &presenter)?;
                report(&presentation.messages);
            }
            Ok(())
        }

        Command::Count { snapshot, typename } => {
            let heap = load_heap(&snapshot)?;
            println!("{}", census::count(&heap, &typename));
            Ok(())
        }

        Command::Stats {
            snapshot,
            limit,
            long_names,
        } => {
            let mut cfg = cfg;
            cfg.merge_cli(None, None, None, limit);
            let heap = load_heap(&snapshot)?;
            let shortnames = cfg.graph.shortnames && !long_names;
            let mut stdout = io::stdout().lock();
            census::show_most_common_types(&heap, Some(cfg.census.limit), shortnames, &mut stdout)?;
            Ok(())
        }

        Command::Leaks { snapshot } => {
            let heap = load_heap(&snapshot)?;
            let leaks = census::get_leaking_objects(&heap);
            print_objects(&heap, &leaks, cfg.graph.shortnames);
            println!("{} objects without referrers", leaks.len());
            Ok(())
        }

        Command::Version => {
            println!("refgraph {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Shared body of `backrefs` and `refs`
fn draw(mut cfg: Config, graph: GraphArgs, backrefs: bool) -> Result<()> {
    cfg.merge_cli(graph.depth, graph.too_many, None, None);
    if graph.long_names {
        cfg.graph.shortnames = false;
    }
    if graph.refcounts {
        cfg.graph.refcounts = true;
    }
    cfg.validate()?;

    let heap = load_heap(&graph.snapshot)?;
    let roots: Vec<ObjectId> = graph.roots.iter().copied().map(ObjectId).collect();

    let excluded = graph
        .exclude_type
        .iter()
        .map(|p| Pattern::new(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let highlight = graph.highlight.as_deref().map(Pattern::new).transpose()?;

    let mut options: GraphOptions<'_> = cfg.graph_options();
    if !excluded.is_empty() {
        options = options.filter(move |_, obj| !excluded.iter().any(|p| type_glob_matches(p, obj)));
    }
    if let Some(pattern) = highlight {
        options = options.highlight(move |_, obj| type_glob_matches(&pattern, obj));
    }

    let tools = SystemTools;
    let presenter = presenter(&cfg, &tools);
    let mut stdout = io::stdout();
    let target = match &graph.output {
        Some(path) => graph_output(path, &mut stdout),
        None => GraphOutput::display(),
    };

    let presentation = if backrefs {
        show_backrefs(&heap, &roots, options, target, &presenter)?
    } else {
        show_refs(&heap, &roots, options, target, &presenter)?
    };
    report(&presentation.messages);
    Ok(())
}

fn load_heap(path: &Path) -> Result<Heap> {
    if !path.exists() {
        return Err(Error::PathNotFound(path.to_path_buf()));
    }
    let heap = Heap::load(path)?;
    tracing::debug!("Loaded {} objects from {}", heap.len(), path.display());
    Ok(heap)
}

fn presenter<'r>(cfg: &Config, tools: &'r SystemTools) -> Presenter<'r> {
    Presenter::new(tools)
        .with_viewer(cfg.render.viewer.clone())
        .with_renderer(cfg.render.renderer.clone())
}

fn is_stdout(output: Option<&Path>) -> bool {
    output == Some(Path::new("-"))
}

fn graph_output<'w>(path: &Path, stdout: &'w mut io::Stdout) -> GraphOutput<'w> {
    if is_stdout(Some(path)) {
        GraphOutput::sink(stdout)
    } else {
        GraphOutput::file(PathBuf::from(path))
    }
}

/// Presenter messages go to stderr so stdout stays clean for DOT
fn report(messages: &[String]) {
    for message in messages {
        eprintln!("{}", message);
    }
}

/// Glob match against either the short or the qualified type name
fn type_glob_matches(pattern: &Pattern, obj: &dyn Inspect) -> bool {
    pattern.matches(obj.type_name()) || pattern.matches(&obj.qualified_type_name())
}

fn print_objects(space: &dyn ObjectSpace, ids: &[ObjectId], shortnames: bool) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for id in ids {
        if let Some(obj) = space.get(*id) {
            let _ = writeln!(
                out,
                "{}\t{}\t{}",
                id,
                obj.display_type_name(shortnames),
                safe_summary(obj)
            );
        }
    }
}
