use eigenfaces::config::{load_config, PipelineConfig};
use eigenfaces::pipeline::run_pipeline;
use std::env;
use std::error::Error;
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(flag) if flag == "-h" || flag == "--help" => {
            println!("{}", usage());
            return Ok(());
        }
        Some(path) => load_config(Path::new(&path))?,
        None => PipelineConfig::default(),
    };
    if args.next().is_some() {
        return Err(usage().into());
    }

    let summary = run_pipeline(&config)?;
    println!(
        "{} images of size {}x{}, k={}: {:.2}% variance retained, reconstruction error {:.4e}",
        summary.n_samples,
        summary.height,
        summary.width,
        summary.n_components,
        summary.total_explained_variance_ratio * 100.0,
        summary.reconstruction_error
    );
    for path in &summary.written {
        println!("  {}", path.display());
    }
    Ok(())
}

fn usage() -> String {
    "Usage: eigenfaces [CONFIG.json]\n\
     Without a config file, images are read from ./assets with k=10 and 5 previews written to ./results."
        .to_string()
}
