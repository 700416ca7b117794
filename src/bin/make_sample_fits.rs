use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use stellar_classifier::adapters::fits::{write_primary_array, write_table, FloatFormat, TableColumn};
use stellar_classifier::core::templates::synthetic_spectrum;

#[derive(Parser)]
#[command(name = "make-sample-fits")]
#[command(about = "Write demo FITS spectra (binary table and primary array layouts)")]
struct Args {
    /// Directory the files are written to
    #[arg(short, long, default_value = "data/input")]
    output_dir: PathBuf,

    /// Effective temperature of the synthetic star (K)
    #[arg(long, default_value_t = 5800.0)]
    teff: f64,

    /// Standard deviation of the uniform noise added to the flux
    #[arg(long, default_value_t = 0.0)]
    noise: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let template = synthetic_spectrum(args.teff);
    let mut rng = StdRng::seed_from_u64(args.seed);
    // 加上傾斜的連續譜與雜訊，讓正規化有事可做
    let amplitude = args.noise * 3f64.sqrt();
    let flux: Vec<f64> = template
        .wavelength()
        .iter()
        .zip(template.flux())
        .map(|(w, f)| {
            let continuum = 100.0 * (1.0 + 5.0e-5 * (w - 3000.0));
            let noise = if amplitude > 0.0 {
                rng.gen_range(-amplitude..amplitude)
            } else {
                0.0
            };
            continuum * (f + noise)
        })
        .collect();
    let loglam: Vec<f64> = template.wavelength().iter().map(|w| w.log10()).collect();

    let table = write_table(&[
        TableColumn { name: "flux", format: FloatFormat::Single, values: &flux },
        TableColumn { name: "loglam", format: FloatFormat::Double, values: &loglam },
    ])?;
    let table_path = args.output_dir.join(format!("sample_{:.0}K_table.fits", args.teff));
    std::fs::write(&table_path, table).with_context(|| format!("writing {}", table_path.display()))?;
    println!("✅ Wrote {}", table_path.display());

    let primary_path = args.output_dir.join(format!("sample_{:.0}K_primary.fits", args.teff));
    std::fs::write(&primary_path, write_primary_array(&flux))
        .with_context(|| format!("writing {}", primary_path.display()))?;
    println!("✅ Wrote {}", primary_path.display());

    Ok(())
}
