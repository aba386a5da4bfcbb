use clap::{Parser, Subcommand};
use kindling::{config, output, publish::PublishingContext};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "kindling")]
#[command(about = "Static site generator built from typed Rust page trees")]
#[command(long_about = "\
Static site generator built from typed Rust page trees

A site root is any directory holding a config.toml. Markdown under content/
becomes articles, assets/ is copied verbatim, and everything else is
generated.

Site structure:

  my-site/
  ├── config.toml                  # Site config (required marker)
  ├── assets/                      # Copied to the output root as-is
  │   └── images/logo.png
  └── content/
      ├── about.md                 # Article at /about
      └── posts/
          └── hello.md             # Article at /posts/hello (type: posts)

Output:

  build/
  ├── index.html                   # Home listing
  ├── posts/hello/index.html
  ├── tags/index.html              # Tag listings
  ├── 404.html
  ├── css/themes.min.css
  ├── css/styles.min.css
  ├── sitemap.xml, feed.rss, robots.txt, manifest.webmanifest

Set RUST_LOG=info (or debug) for pipeline logging.
Run 'kindling gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site root (the directory holding config.toml)
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "build", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load content and render every route into the output directory
    Build,
    /// Validate config and content and list the routes without writing
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build => {
            println!("==> Loading site {}", cli.source.display());
            let context = PublishingContext::from_source(&cli.source, &cli.output)?;
            println!("==> Publishing → {}", cli.output.display());
            let report = context.publish()?;
            output::print_build_report(&report);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let mut context = PublishingContext::from_source(&cli.source, &cli.output)?;
            context.load_content()?;
            let routes = context.routes()?;
            output::print_routes(&routes);
            for warning in context.warnings() {
                println!("warning: {warning}");
            }
            println!("==> Site is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
