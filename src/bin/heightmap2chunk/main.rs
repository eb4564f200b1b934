// heightmap2chunk - Bake a grayscale heightmap into a terrain chunk dump
//
// Pipeline:
//   1. Load image, resample to the chunk resolution
//   2. Map luminance to [min, max] elevation
//   3. Derive normals and build the BVH
//   4. Write the binary chunk dump
//
// Usage: cargo run --bin heightmap2chunk -- <image> [--out chunk.tbvh] [--depth 8] [--size 128] [--min 0] [--max 32]

mod heightmap;

use std::env;
use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result, bail};
use log::info;
use terrain_bvh::{HeightField, TerrainChunk, TerrainConfig};

struct Args {
    image: String,
    out: String,
    config: TerrainConfig,
    min: f32,
    max: f32,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!(
            "Usage: {} <image> [--out path] [--depth N] [--size S] [--min H] [--max H]",
            args[0]
        );
    }

    let mut parsed = Args {
        image: args[1].clone(),
        out: "chunk.tbvh".into(),
        config: TerrainConfig::default(),
        min: 0.0,
        max: 32.0,
    };

    let mut i = 2;
    while i < args.len() {
        let value = args.get(i + 1).map(String::as_str);
        match (args[i].as_str(), value) {
            ("--out", Some(v)) => parsed.out = v.to_string(),
            ("--depth", Some(v)) => parsed.config.depth = v.parse().context("--depth")?,
            ("--size", Some(v)) => parsed.config.chunk_world_size = v.parse().context("--size")?,
            ("--min", Some(v)) => parsed.min = v.parse().context("--min")?,
            ("--max", Some(v)) => parsed.max = v.parse().context("--max")?,
            (flag, _) => bail!("unknown or incomplete flag {}", flag),
        }
        i += 2;
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = parse_args()?;
    args.config.validate()?;

    let resolution = args.config.resolution() as u32;
    info!("Processing {} ({}x{} samples)...", args.image, resolution, resolution);

    let img = image::open(&args.image).with_context(|| format!("opening {}", args.image))?;
    let values = heightmap::to_elevations(&img, resolution, args.min, args.max);
    let (lo, hi) = heightmap::range(&values);
    info!("  Elevation range {:.3} .. {:.3}", lo, hi);

    let field = HeightField::from_elevations(&args.config, &values)?;

    info!("  Building normals and BVH...");
    let chunk = TerrainChunk::from_field(args.config, field)?;
    let Some(root) = chunk.bvh().root_bounds() else {
        bail!("built BVH has an empty root");
    };
    info!("  Root bounds {:.3} .. {:.3}", root.min, root.max);

    let file = File::create(&args.out).with_context(|| format!("creating {}", args.out))?;
    chunk.save(BufWriter::new(file))?;
    info!("Done! Wrote {}", args.out);
    Ok(())
}
