use clap::{Parser, Subcommand};
use next_single_file::{compose, config, output, pipeline, router, scan};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "next-single-file")]
#[command(about = "Pack a static Next.js export into one self-contained HTML file")]
#[command(long_about = "\
Pack a static Next.js export into one self-contained HTML file

Every stylesheet, script, font and image becomes a data URI. Every page is
embedded in a small hash router, so links keep working when the file is
opened straight from disk.

Input structure (next build with output: \"export\"):

  out/
  ├── index.html                 # Route /        (required: becomes the shell)
  ├── about.html                 # Route /about
  ├── blog/first-post.html       # Route /blog/first-post
  ├── 404.html                   # Route /404     (shown for unknown routes)
  ├── images/logo.png            # Image, inlined wherever referenced
  └── _next/static/
      ├── <build-id>/            # Names the build
      ├── chunks/*.js            # Scripts, bundled into the head
      ├── css/*.css              # Stylesheets, bundled into the head
      └── media/*.woff2          # Fonts, inlined into the stylesheets

In the output, /about is reached at index.html#/about.

Run 'next-single-file gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Static export directory
    #[arg(long, default_value = "out", global = true)]
    input: PathBuf,

    /// Output HTML file
    #[arg(long, default_value = "dist/index.html", global = true)]
    output: PathBuf,

    /// Config file (TOML), merged over the stock defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug diagnostics to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline and write the single-file document
    Build,
    /// List discovered routes and assets
    Scan,
    /// Validate the export directory without writing anything
    Check,
    /// List the routes embedded in a produced document
    Routes {
        /// A document written by `build`
        document: PathBuf,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Build => {
            let config = config::load_config(cli.config.as_deref())?;
            init_thread_pool(&config.processing);

            println!("==> Bundling {}", cli.input.display());
            let result = pipeline::build(&cli.input, &config)?;
            write_document(&cli.output, &result.document)?;
            output::print_build_output(&result, &cli.output);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Scan => {
            let tree = scan::scan(&cli.input)?;
            output::print_scan_output(&tree);
        }
        Command::Check => {
            config::load_config(cli.config.as_deref())?;
            println!("==> Checking {}", cli.input.display());
            let tree = scan::scan(&cli.input)?;
            output::print_scan_output(&tree);
            if tree.index_route().is_none() {
                return Err(compose::ComposeError::MissingIndexRoute.into());
            }
            println!("==> Export is valid");
        }
        Command::Routes { document } => {
            warn_unused_config(cli.config.as_deref());
            let html = std::fs::read_to_string(document)?;
            let table = router::extract_route_table(&html)?;
            output::print_route_table(&table);
        }
        Command::GenConfig => {
            warn_unused_config(cli.config.as_deref());
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug, else warn.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn write_document(path: &Path, document: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, document)
}

fn warn_unused_config(path: Option<&Path>) {
    if let Some(path) = path {
        warn!(path = %path.display(), "--config has no effect on this command");
    }
}
