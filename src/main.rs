use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::Path;

use tis_gen::cli::Args;
use tis_gen::{expand, render_config, Fixture, Options, NAME};

fn main() -> Result<()> {
    let args = Args::parse();

    let fixture_json = fs::read_to_string(&args.fixture)
        .with_context(|| format!("Failed to read {}", args.fixture.display()))?;
    let fixture: Fixture = serde_json::from_str(&fixture_json)
        .with_context(|| format!("Failed to parse {}", args.fixture.display()))?;

    let defaults = Options::default();
    let opts = Options {
        vectors_dir: args.vectors_dir.clone(),
        no_results_from: Some(args.no_results_from),
        machdeps: if args.machdep.is_empty() {
            defaults.machdeps
        } else {
            args.machdep.clone()
        },
        includes: if args.include.is_empty() {
            defaults.includes
        } else {
            args.include.clone()
        },
    };

    let matrix = expand(&fixture, &opts)?;

    fs::create_dir_all(&args.vectors_dir)
        .with_context(|| format!("Failed to create {}", args.vectors_dir))?;
    for file in &matrix.files {
        let path = Path::new(&args.vectors_dir).join(&file.name);
        fs::write(&path, &file.contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if args.verbose {
            eprintln!("wrote {}", path.display());
        }
    }

    if args.verbose {
        for entry in &matrix.entries {
            eprintln!("{}", entry.name);
        }
    }

    let config = render_config(&matrix.entries)?;
    fs::write(&args.output, &config)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    eprintln!(
        "{}: {} vectors, {} files, {} entries -> {}",
        NAME,
        fixture.cases.len(),
        matrix.files.len(),
        matrix.entries.len(),
        args.output.display(),
    );
    Ok(())
}
