use std::env;
use std::path::Path;

use sync::engine::existing_dropped_files;
use sync::{load_config, run_sync, RunMode};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path =
        env::var("RADIOSYNC_CONFIG").unwrap_or_else(|_| "radiosync.yaml".to_string());
    let config = load_config(Path::new(&config_path))?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mode = if args.is_empty() {
        println!("Mode: scanning {}", config.songs_path.display());
        RunMode::Scan
    } else {
        let files = existing_dropped_files(&args);
        if files.is_empty() {
            println!("No usable files supplied");
            return Ok(());
        }
        println!("Mode: processing {} dropped files", files.len());
        RunMode::Dropped(files)
    };

    let report = run_sync(&config, mode)?;
    report.print_summary();

    if let Some(path) = report.write_json(config.report_dir.as_deref()) {
        println!("\nReport saved to {}", path.display());
    }

    Ok(())
}
