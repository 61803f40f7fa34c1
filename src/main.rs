use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use qr_art::{encode_art, encode_text, ArtRequest, ECLevel, Mask, Rotation, Target, Version};

#[derive(Parser)]
#[command(
    name = "qr-art",
    about = "Generate QR codes whose module pattern approximates a target image"
)]
struct Cli {
    /// Text or URL payload
    url: String,

    /// Target image; without one a plain QR code is produced
    #[arg(long)]
    image: Option<PathBuf>,

    /// Symbol version, 1..=8
    #[arg(long, default_value = "6")]
    version: u8,

    /// Error correction level: L, M, Q or H
    #[arg(long, default_value = "L")]
    level: String,

    /// Mask pattern 0..=7; chosen automatically for plain codes when
    /// omitted
    #[arg(long)]
    mask: Option<u8>,

    /// Quarter turns to rotate the symbol, 0..=3
    #[arg(long, default_value = "0")]
    rotation: u8,

    /// Pixels per module
    #[arg(long, default_value = "8")]
    scale: u32,

    /// Extra target padding in modules around the symbol
    #[arg(long, default_value = "0")]
    size: u32,

    /// Horizontal target offset in modules
    #[arg(long, default_value = "0")]
    dx: i32,

    /// Vertical target offset in modules
    #[arg(long, default_value = "0")]
    dy: i32,

    /// Random module priorities instead of image contrast
    #[arg(long)]
    rand: bool,

    /// Error-diffusion second pass
    #[arg(long)]
    dither: bool,

    /// Also diffuse dither error to the row below
    #[arg(long)]
    dither_down: bool,

    /// Steer data bits only, leaving check bits alone
    #[arg(long)]
    only_data_bits: bool,

    /// PRNG seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Write the control image showing steered modules here
    #[arg(long)]
    control: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "qr.png")]
    output: PathBuf,
}

fn parse_level(s: &str) -> Result<ECLevel> {
    match s {
        "L" | "l" => Ok(ECLevel::L),
        "M" | "m" => Ok(ECLevel::M),
        "Q" | "q" => Ok(ECLevel::Q),
        "H" | "h" => Ok(ECLevel::H),
        _ => bail!("unknown error correction level {:?}", s),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let version = Version::new(cli.version)?;
    let level = parse_level(&cli.level)?;

    let Some(image_path) = &cli.image else {
        // plain code, no steering
        let mask = cli.mask.map(Mask::new).transpose()?;
        let mut code = encode_text(&cli.url, version, level, mask)?;
        code.scale = cli.scale;
        code.to_image()
            .save(&cli.output)
            .with_context(|| format!("writing {}", cli.output.display()))?;
        println!("wrote {}", cli.output.display());
        return Ok(());
    };

    let data = fs::read(image_path).with_context(|| format!("reading {}", image_path.display()))?;
    let side = version.size() as u32 + cli.size;
    let target = Target::from_bytes(&data, side, cli.dx, cli.dy)?;

    let mut req = ArtRequest::new(&cli.url, version, level, Mask::new(cli.mask.unwrap_or(2))?);
    req.rotation = Rotation::new(cli.rotation)?;
    req.scale = cli.scale;
    req.rand_priority = cli.rand;
    req.dither = cli.dither;
    req.dither_down = cli.dither_down;
    req.only_data_bits = cli.only_data_bits;
    req.save_control = cli.control.is_some();
    req.seed = cli.seed;

    let art = encode_art(&req, &target)?;
    art.code
        .to_image()
        .save(&cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    println!(
        "wrote {} ({} modules steered, payload {}#{})",
        cli.output.display(),
        art.steered,
        cli.url,
        art.digits
    );

    if let (Some(path), Some(control)) = (&cli.control, &art.control) {
        control
            .save(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {}", path.display());
    }

    Ok(())
}
