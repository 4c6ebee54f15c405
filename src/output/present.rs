// Diagram presentation
//
// Writes DOT text to its destination and hands the file to an external
// viewer or renderer when one is available. Missing or failing tools are
// reported as messages, never as errors.

use crate::error::{Error, Result};
use crate::output::Diagram;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Access to external programs
pub trait ToolRunner {
    /// Whether `program` can be found on the search path
    fn in_path(&self, program: &str) -> bool;

    /// Start `program` without waiting for it
    fn spawn(&self, program: &str, args: &[String]) -> io::Result<()>;

    /// Run `program` to completion and return its exit code
    fn run(&self, program: &str, args: &[String]) -> io::Result<i32>;
}

/// Runs real processes found on `PATH`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTools;

impl ToolRunner for SystemTools {
    fn in_path(&self, program: &str) -> bool {
        let Some(paths) = std::env::var_os("PATH") else {
            return false;
        };
        std::env::split_paths(&paths).any(|dir| {
            let candidate = dir.join(program);
            candidate.is_file() || candidate.with_extension("exe").is_file()
        })
    }

    fn spawn(&self, program: &str, args: &[String]) -> io::Result<()> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map(|_| ())
    }

    fn run(&self, program: &str, args: &[String]) -> io::Result<i32> {
        let status = Command::new(program).args(args).status()?;
        // Killed by a signal: report like a generic failure.
        Ok(status.code().unwrap_or(-1))
    }
}

/// Where a diagram goes
///
/// At most one of `filename` and `sink` may be set.
#[derive(Default)]
pub struct GraphOutput<'w> {
    pub filename: Option<PathBuf>,
    pub sink: Option<&'w mut dyn Write>,
}

impl<'w> GraphOutput<'w> {
    /// Temporary file plus viewer or renderer
    pub fn display() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            filename: Some(path.into()),
            sink: None,
        }
    }

    pub fn sink(sink: &'w mut dyn Write) -> Self {
        Self {
            filename: None,
            sink: Some(sink),
        }
    }

    /// Reject conflicting destinations
    pub fn validate(&self) -> Result<()> {
        if self.filename.is_some() && self.sink.is_some() {
            return Err(Error::argument(
                "filename and output sink are mutually exclusive",
            ));
        }
        Ok(())
    }
}

/// Outcome of presenting a diagram
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presentation {
    /// User-facing messages, in order
    pub messages: Vec<String>,
    /// DOT file written, if any
    pub dot_file: Option<PathBuf>,
    /// Rendered image, if the renderer succeeded
    pub image: Option<PathBuf>,
    pub viewer_spawned: bool,
}

impl Presentation {
    fn say(&mut self, message: String) {
        tracing::info!("{}", message);
        self.messages.push(message);
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.messages.push(message);
    }
}

/// Writes diagrams and drives external tools
pub struct Presenter<'r> {
    viewer: String,
    renderer: String,
    runner: &'r dyn ToolRunner,
}

impl<'r> Presenter<'r> {
    pub fn new(runner: &'r dyn ToolRunner) -> Self {
        Self {
            viewer: "xdot".to_string(),
            renderer: "dot".to_string(),
            runner,
        }
    }

    /// Override the viewer program
    pub fn with_viewer(mut self, viewer: impl Into<String>) -> Self {
        self.viewer = viewer.into();
        self
    }

    /// Override the renderer program
    pub fn with_renderer(mut self, renderer: impl Into<String>) -> Self {
        self.renderer = renderer.into();
        self
    }

    /// Write `diagram` to `output` and present it
    pub fn show(&self, diagram: &Diagram, output: GraphOutput<'_>) -> Result<Presentation> {
        output.validate()?;
        let GraphOutput { filename, sink } = output;

        if let Some(sink) = sink {
            diagram.write_dot(sink)?;
            return Ok(Presentation::default());
        }

        let dot_path = match &filename {
            Some(path) if has_extension(path, "dot") => {
                let mut writer = BufWriter::new(File::create(path)?);
                diagram.write_dot(&mut writer)?;
                writer.flush()?;
                path.clone()
            }
            _ => {
                let temp = tempfile::Builder::new()
                    .prefix("refgraph-")
                    .suffix(".dot")
                    .tempfile()?;
                let (file, path) = temp.keep().map_err(|e| Error::Io(e.error))?;
                let mut writer = BufWriter::new(file);
                diagram.write_dot(&mut writer)?;
                writer.flush()?;
                path
            }
        };

        let mut presentation = Presentation {
            dot_file: Some(dot_path.clone()),
            ..Presentation::default()
        };
        presentation.say(format!(
            "Graph written to {} ({} nodes)",
            dot_path.display(),
            diagram.node_count()
        ));
        self.present(&dot_path, filename.as_deref(), &mut presentation);
        Ok(presentation)
    }

    /// Hand an existing DOT file to the viewer or renderer
    pub fn present(&self, dot_path: &Path, filename: Option<&Path>, out: &mut Presentation) {
        if filename == Some(dot_path) {
            return;
        }

        if filename.is_none() && self.runner.in_path(&self.viewer) {
            out.say(format!("Spawning graph viewer ({})", self.viewer));
            let args = vec![dot_path.display().to_string()];
            match self.runner.spawn(&self.viewer, &args) {
                Ok(()) => out.viewer_spawned = true,
                Err(e) => out.warn(format!("Failed to start {}: {}", self.viewer, e)),
            }
        } else if self.runner.in_path(&self.renderer) {
            let image = match filename {
                Some(f) => f.to_path_buf(),
                None => {
                    out.say(format!(
                        "Graph viewer ({}) not found, generating a png instead",
                        self.viewer
                    ));
                    dot_path.with_extension("png")
                }
            };
            self.render(dot_path, &image, out);
        } else if filename.is_none() {
            out.say(format!(
                "Graph viewer ({}) and image renderer ({}) not found, not doing anything else",
                self.viewer, self.renderer
            ));
        } else {
            out.say(format!(
                "Image renderer ({}) not found, not doing anything else",
                self.renderer
            ));
        }
    }

    fn render(&self, dot_path: &Path, image: &Path, out: &mut Presentation) {
        let format = image
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png")
            .to_string();
        let args = vec![
            format!("-T{}", format),
            format!("-o{}", image.display()),
            dot_path.display().to_string(),
        ];
        let command = format!("{} {}", self.renderer, args.join(" "));

        match self.runner.run(&self.renderer, &args) {
            Ok(0) => {
                out.image = Some(image.to_path_buf());
                out.say(format!("Image generated as {}", image.display()));
            }
            Ok(code) => out.warn(format!(
                "{} failed (exit code {}) while executing \"{}\"",
                self.renderer, code, command
            )),
            Err(e) => out.warn(format!("{} failed ({}) while executing \"{}\"", self.renderer, e, command)),
        }
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().map_or(false, |e| e == ext)
}
