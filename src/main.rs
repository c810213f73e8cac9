//! image-border - silhouette borders for transparent images
//!
//! CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::Level;

use image_border_processor::{
    convert_to_png, exit_codes, BorderError, BorderProcessor, BorderSettings, BorderSpec, Cli,
    Commands, Config, ConvertArgs, ErrorKind, MetadataArgs, MetadataStore, ProcessArgs,
};

#[cfg(feature = "web")]
use image_border_processor::{AppState, ServeArgs, ServerConfig, WebServer};

fn main() {
    let cli = Cli::parse();

    let (verbose, quiet) = match &cli.command {
        Commands::Process(args) => (args.verbose, args.quiet),
        Commands::Convert(args) => (args.verbose, false),
        #[cfg(feature = "web")]
        Commands::Serve(args) => (args.verbose.saturating_add(1), false),
        Commands::Metadata(_) | Commands::Info => (0, false),
    };
    init_logging(verbose, quiet);

    let result = match cli.command {
        Commands::Process(args) => run_process(&args),
        Commands::Convert(args) => run_convert(&args),
        Commands::Metadata(args) => run_metadata(&args),
        Commands::Info => run_info(),
        #[cfg(feature = "web")]
        Commands::Serve(args) => run_serve(&args),
    };

    std::process::exit(match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    });
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let Some(border_err) = err.downcast_ref::<BorderError>() else {
        return exit_codes::GENERAL_ERROR;
    };

    match border_err.kind() {
        ErrorKind::InvalidParameter => exit_codes::INVALID_ARGS,
        ErrorKind::ProcessingFailure if border_err.stage() == Some("input") => {
            exit_codes::INPUT_NOT_FOUND
        }
        ErrorKind::ProcessingFailure => exit_codes::PROCESSING_ERROR,
        ErrorKind::UnexpectedFailure => exit_codes::GENERAL_ERROR,
    }
}

fn load_config(path: Option<&Path>) -> Config {
    let loaded = match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config file, using defaults");
        Config::default()
    })
}

// ============ Process Command ============

fn run_process(args: &ProcessArgs) -> Result<()> {
    let config = load_config(args.config.as_deref());
    let settings = config.merge_with_cli(&args.overrides());
    let spec = BorderSpec::with_color_str(
        settings.margin_size,
        settings.border_thickness,
        &settings.border_color,
    )?;

    if args.dry_run {
        print_plan(args, &settings);
        return Ok(());
    }

    if args.input.is_file() {
        if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let outcome = BorderProcessor::process(&args.input, &args.output, &spec)?;

    if !args.quiet {
        let bbox = outcome.analysis.bounding_box;
        println!("Output:     {}", outcome.output_path.display());
        println!("Metadata:   {}", outcome.sidecar_path.display());
        println!(
            "Content:    {}x{} at ({}, {}), {}",
            bbox.width(),
            bbox.height(),
            bbox.left,
            bbox.top,
            outcome.analysis.shape
        );
        println!(
            "Size:       {}x{}",
            outcome.image.width(),
            outcome.image.height()
        );
        println!("Thickness:  {} px", outcome.thickness_used);
        println!(
            "History:    {} entries",
            outcome.metadata.processing_history.len()
        );
    }

    Ok(())
}

/// Print what `process` would do, for --dry-run
fn print_plan(args: &ProcessArgs, settings: &BorderSettings) {
    println!("=== Dry Run - Execution Plan ===");
    println!();
    println!("Input:  {}", args.input.display());
    println!("Output: {}", args.output.display());
    println!(
        "Sidecar: {}",
        MetadataStore::sidecar_path(&args.output).display()
    );
    println!();
    println!("Pipeline:");
    println!("  1. Crop to non-transparent content");
    println!("  2. Transparent margin: {} px", settings.margin_size);
    println!(
        "  3. Border: {} px (a third of that for rectangular content)",
        settings.border_thickness
    );
    println!("  4. Border color: {}", settings.border_color);
}

// ============ Convert Command ============

fn run_convert(args: &ConvertArgs) -> Result<()> {
    let output = convert_to_png(&args.input)
        .with_context(|| format!("Converting {}", args.input.display()))?;
    println!("{}", output.display());
    Ok(())
}

// ============ Metadata Command ============

fn run_metadata(args: &MetadataArgs) -> Result<()> {
    if !MetadataStore::exists(&args.image) {
        eprintln!(
            "No sidecar at {}, showing metadata derived from the image",
            MetadataStore::sidecar_path(&args.image).display()
        );
    }

    let metadata = MetadataStore::load(&args.image)
        .with_context(|| format!("Reading metadata of {}", args.image.display()))?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

// ============ Info Command ============

fn run_info() -> Result<()> {
    println!("image-border v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);
    println!("  CPUs: {}", num_cpus::get());

    println!();
    println!("Features:");
    println!(
        "  Web server: {}",
        if cfg!(feature = "web") { "ENABLED" } else { "DISABLED" }
    );

    println!();
    println!("Config File Locations:");
    for path in Config::search_paths() {
        let state = if path.is_file() { "found" } else { "not found" };
        println!("  {} ({})", path.display(), state);
    }

    Ok(())
}

// ============ Serve Command (Web Server) ============

#[cfg(feature = "web")]
fn run_serve(args: &ServeArgs) -> Result<()> {
    let mut file_config = load_config(args.config.as_deref());
    if let Some(port) = args.port {
        file_config.server.port = port;
    }
    if let Some(bind) = &args.bind {
        file_config.server.bind = bind.clone();
    }
    if let Some(limit_mb) = args.upload_limit {
        file_config.server.upload_limit_mb = limit_mb;
    }
    let config = ServerConfig::from_config(&file_config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers.max(1))
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async {
        let server = WebServer::new(config, AppState::new(&file_config));
        server.run().await.map_err(|e| anyhow::anyhow!(e))
    })
}
