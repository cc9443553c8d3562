use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jopac::{ast::printer, Config, SourceFile};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "jopac")]
#[command(about = "Java 8 compiler producing JVM class files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse .java files and print their ASTs as JSON
    Parse {
        /// Input .java files
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Compile .java files to .class files
    Compile {
        /// Input .java files
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Output directory for .class files
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Additional classpath entries (directories or jar/zip archives)
        #[arg(short = 'c', long = "classpath", value_name = "PATH")]
        classpath: Vec<PathBuf>,

        /// Do not locate the platform runtime archive
        #[arg(long = "no-rt")]
        no_rt: bool,

        /// Print each generated class file
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Parse { files } => parse_files(&files),
        Commands::Compile { files, output, classpath, no_rt, verbose } => {
            compile_files(&files, output.as_deref(), &classpath, no_rt, verbose)
        }
    }
}

fn parse_files(files: &[PathBuf]) -> Result<ExitCode> {
    let mut failed = false;
    for path in files {
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match jopac::parser::parse_java(&source, &file_name) {
            Ok(unit) => println!("{}", printer::to_json(&unit)),
            Err(err) => {
                eprintln!("{}: {}", path.display(), err);
                failed = true;
            }
        }
    }
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn compile_files(
    files: &[PathBuf],
    output: Option<&Path>,
    classpath: &[PathBuf],
    no_rt: bool,
    verbose: bool,
) -> Result<ExitCode> {
    let output_dir = output.unwrap_or(Path::new("."));
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let mut config = Config {
        verbose,
        output_dir: output_dir.to_string_lossy().into_owned(),
        classpath: classpath.iter().map(|p| p.to_string_lossy().into_owned()).collect(),
        use_runtime: !no_rt,
    };
    // previously written classes stay visible to later invocations
    config.classpath.push(config.output_dir.clone());

    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        sources.push(SourceFile { name, text });
    }

    let outcome = jopac::compile_sources(&sources, &config)?;
    for (file, err) in &outcome.errors {
        eprintln!("{}: {}", file, err);
    }

    for (binary_name, bytes) in &outcome.classes {
        let class_path = output_dir.join(format!("{}.class", binary_name));
        if let Some(parent) = class_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&class_path, bytes)
            .with_context(|| format!("writing {}", class_path.display()))?;
        if verbose {
            println!("Wrote {}", class_path.display());
        }
    }

    Ok(if outcome.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
