use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use jflowc::ast::AstPrinter;
use jflowc::parser::{parse_program, Lexer};
use jflowc::Config;

const SOURCE_EXT: &str = "jl";
const LISTING_EXT: &str = "lst";

#[derive(Parser)]
#[command(name = "jflowc")]
#[command(about = "Compiler for a small Java-like language")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file, or every .jl file under a directory, to listings
    Compile {
        /// Input file or directory
        #[arg(value_name = "PATH")]
        input: PathBuf,

        /// Output directory for .lst files
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Encode assert statements in every method
        #[arg(long = "assert")]
        assertions: bool,

        /// Call runtime routines through a dynamically allocated context
        #[arg(long)]
        dynamic: bool,

        /// Target word size in bytes (4 or 8)
        #[arg(long, default_value_t = 4)]
        word_size: u32,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Parse a source file and print its statement trees
    Parse {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show the raw arenas instead of the tree
        #[arg(short, long)]
        detailed: bool,
    },

    /// Lexically analyze a source file
    Lex {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show token locations
        #[arg(short, long)]
        locations: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Compile { verbose: true, .. });
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    let _ = env_logger::builder().filter_level(level).parse_default_env().try_init();

    match &cli.command {
        Commands::Compile { input, output, assertions, dynamic, word_size, verbose } => {
            let defaults = Config::default();
            let enable_asserts = *assertions || defaults.assertions;
            let config = defaults
                .with_assertions(enable_asserts)
                .with_dynamic_memory(*dynamic)
                .with_word_size(*word_size)
                .with_debug(*verbose);
            compile_path(input, output.as_deref(), &config)?;
        }
        Commands::Parse { input, detailed } => {
            parse_file(input, *detailed)?;
        }
        Commands::Lex { input, locations } => {
            lex_file(input, *locations)?;
        }
    }

    Ok(())
}

fn collect_sources(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == SOURCE_EXT))
        .collect();
    files.sort();
    files
}

fn compile_path(input: &Path, output: Option<&Path>, config: &Config) -> Result<()> {
    let files = collect_sources(input);
    if files.is_empty() {
        anyhow::bail!("no .{} files found under {}", SOURCE_EXT, input.display());
    }

    let output_dir = output.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(output_dir).with_context(|| format!("creating {}", output_dir.display()))?;

    let mut failed = 0;
    for file in &files {
        log::info!("compiling {}", file.display());
        match jflowc::compile_file(file, config) {
            Ok(compilation) => {
                for warning in compilation.diagnostics.warnings() {
                    eprintln!("{}:{}", file.display(), warning);
                }
                let stem = file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
                let target = output_dir.join(format!("{}.{}", stem, LISTING_EXT));
                let mut text = String::new();
                for method in &compilation.methods {
                    text.push_str(&method.to_string());
                    text.push('\n');
                }
                fs::write(&target, text).with_context(|| format!("writing {}", target.display()))?;
                log::debug!("wrote {}", target.display());
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", file.display(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed to compile", failed, files.len());
    }
    Ok(())
}

fn parse_file(input: &Path, detailed: bool) -> Result<()> {
    let source = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let program = parse_program(&source)?;

    if detailed {
        println!("{:#?}", program);
    } else {
        print!("{}", AstPrinter::new().print(&program));
    }

    Ok(())
}

fn lex_file(input: &Path, locations: bool) -> Result<()> {
    let source = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let lexer = Lexer::new(&source);
    let tokens = lexer.tokenize().map_err(|e| anyhow::anyhow!("Lexical error: {}", e))?;

    for token in tokens {
        if locations {
            println!("{:?} at {}:{}", token.token_type(), token.location().line, token.location().column);
        } else {
            println!("{:?}: '{}'", token.token_type(), token.lexeme());
        }
    }

    Ok(())
}
