use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pfpgen", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an avatar spec and write the composited PNG.
    Export(ExportArgs),
    /// Print the built-in image catalog.
    Catalog,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input avatar spec JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long, default_value = pfpgen::DEFAULT_EXPORT_FILENAME)]
    out: PathBuf,

    /// Directory that relative image sources resolve against.
    #[arg(long, default_value = ".")]
    assets_root: PathBuf,

    /// Font file used for the caption text.
    #[arg(long)]
    font: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Catalog => cmd_catalog(),
    }
}

fn read_spec_json(path: &Path) -> anyhow::Result<pfpgen::AvatarSpec> {
    let f = File::open(path).with_context(|| format!("open avatar spec '{}'", path.display()))?;
    let r = BufReader::new(f);
    let spec: pfpgen::AvatarSpec =
        serde_json::from_reader(r).with_context(|| "parse avatar spec JSON")?;
    Ok(spec)
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let spec = read_spec_json(&args.in_path)?;
    spec.validate()?;

    let mut compositor = pfpgen::Compositor::new();
    if let Some(font_path) = &args.font {
        let bytes = std::fs::read(font_path)
            .with_context(|| format!("read font '{}'", font_path.display()))?;
        compositor.set_font_bytes(bytes);
    }

    let mut images = pfpgen::FsImageStore::new(&args.assets_root);
    images.prefetch(&spec);

    let png = pfpgen::export_png(&mut compositor, &spec, &mut images)?;
    pfpgen::write_png(&args.out, &png)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_catalog() -> anyhow::Result<()> {
    let catalog = pfpgen::Catalog::builtin();
    for category in pfpgen::LayerCategory::ALL {
        println!("{}:", category.label());
        for option in catalog.options(category) {
            println!("  {:<16} {}", option.label, option.source);
        }
    }
    Ok(())
}
