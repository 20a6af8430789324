use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "bandeiras", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the icon set for every catalogued flag.
    Generate(GenerateArgs),
    /// Rebuild the coverage database from the catalogue and the output tree.
    Database(DatabaseArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Municipality catalogue JSON.
    #[arg(long, default_value = "data/municipios.json")]
    catalog: PathBuf,

    /// Directory raw flag paths are resolved against.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Root of the generated artifact tree.
    #[arg(long, default_value = "dist")]
    out: PathBuf,

    /// Number of parallel workers.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Process only a specific UF (e.g. SP).
    #[arg(long)]
    uf: Option<String>,

    /// Process only the first N municipalities (for testing).
    #[arg(long, default_value_t = 0)]
    limit: usize,

    /// Skip SVG generation (PNG only).
    #[arg(long)]
    skip_svg: bool,

    /// Skip PNG generation (SVG only).
    #[arg(long)]
    skip_png: bool,

    /// Vector rasterizer backend.
    #[arg(long, value_enum, default_value_t = RasterizerChoice::Auto)]
    rasterizer: RasterizerChoice,
}

#[derive(Parser, Debug)]
struct DatabaseArgs {
    /// Municipality catalogue JSON.
    #[arg(long, default_value = "data/municipios.json")]
    catalog: PathBuf,

    /// Root of the generated artifact tree.
    #[arg(long, default_value = "dist")]
    dist: PathBuf,

    /// Directory the database files are written to.
    #[arg(long, default_value = "database")]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RasterizerChoice {
    Auto,
    RsvgConvert,
    Resvg,
}

impl From<RasterizerChoice> for bandeiras::RasterizerKind {
    fn from(choice: RasterizerChoice) -> Self {
        match choice {
            RasterizerChoice::Auto => bandeiras::RasterizerKind::Auto,
            RasterizerChoice::RsvgConvert => bandeiras::RasterizerKind::RsvgConvert,
            RasterizerChoice::Resvg => bandeiras::RasterizerKind::Resvg,
        }
    }
}

const MAX_REPORTED_FAILURES: usize = 20;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::Database(args) => cmd_database(args),
    }
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let catalogue = bandeiras::load_catalog(&args.catalog)?;

    let mut municipios: Vec<_> = catalogue
        .into_iter()
        .filter(|m| m.flag_local.is_some())
        .filter(|m| {
            args.uf
                .as_deref()
                .map(|uf| m.uf.eq_ignore_ascii_case(uf))
                .unwrap_or(true)
        })
        .collect();
    if args.limit > 0 {
        municipios.truncate(args.limit);
    }

    let rasterizer = bandeiras::create_rasterizer(args.rasterizer.into());
    let layout = bandeiras::OutputLayout::new(&args.out);
    let opts = bandeiras::RunOpts {
        workers: args.workers,
        render: bandeiras::RenderOpts {
            skip_svg: args.skip_svg,
            skip_png: args.skip_png,
        },
    };

    eprintln!(
        "processing {} municipalities with flags ({} workers, {} rasterizer)",
        municipios.len(),
        args.workers,
        rasterizer.label()
    );

    let report = bandeiras::run(
        &municipios,
        &args.data_dir,
        &layout,
        rasterizer.as_ref(),
        opts,
        &bandeiras::CancelFlag::new(),
    )?;

    println!(
        "done: {}/{} succeeded, {} partial, {} failed, {} skipped",
        report.succeeded, report.processed, report.partial, report.failed, report.skipped
    );
    println!(
        "artifacts: {} written, {} already up to date",
        report.artifacts_written, report.artifacts_skipped
    );

    if !report.failures.is_empty() {
        println!("\n{} failures:", report.failures.len());
        for (ibge_code, cause) in report.failures.iter().take(MAX_REPORTED_FAILURES) {
            println!("  {ibge_code}: {cause}");
        }
        if report.failures.len() > MAX_REPORTED_FAILURES {
            println!(
                "  ... and {} more",
                report.failures.len() - MAX_REPORTED_FAILURES
            );
        }
    }

    if !report.style_failures.is_empty() {
        println!("\n{} style failures:", report.style_failures.len());
        for (ibge_code, failure) in report.style_failures.iter().take(MAX_REPORTED_FAILURES) {
            println!(
                "  {ibge_code}: {}/{}: {}",
                failure.style,
                failure.format.dir_name(),
                failure.error
            );
        }
    }

    Ok(())
}

fn cmd_database(args: DatabaseArgs) -> anyhow::Result<()> {
    let catalogue = bandeiras::load_catalog(&args.catalog)?;
    let layout = bandeiras::OutputLayout::new(&args.dist);

    let db = bandeiras::aggregate(&catalogue, &layout);
    bandeiras::write_database(&db, &args.out)?;
    eprintln!("wrote {}", args.out.display());

    let stats = &db.stats;
    println!("total municipalities:  {}", stats.total_municipios);
    println!(
        "with raw flag:         {} ({:.1}%)",
        stats.total_with_raw_flag, stats.raw_coverage_pct
    );
    println!(
        "with generated icons:  {} ({:.1}%)",
        stats.total_with_icons, stats.icon_coverage_pct
    );
    println!(
        "missing flags:         {}",
        stats.total_municipios - stats.total_with_raw_flag
    );

    println!("\n{:<4} {:>6} {:>6} {:>6} {:>9}", "UF", "Total", "Flag", "Icons", "Coverage");
    for (uf, group) in &stats.by_uf {
        println!(
            "{:<4} {:>6} {:>6} {:>6} {:>8.1}%",
            uf, group.total, group.with_flag, group.with_icons, group.coverage_pct
        );
    }

    Ok(())
}
