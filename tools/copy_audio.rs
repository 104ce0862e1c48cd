use std::env;
use std::path::Path;
use std::process;

use common::default_extensions;
use remote::SftpTree;
use sync::{mirror_local, mirror_remote};
use tracing_subscriber::EnvFilter;

const DEFAULT_SSH_PORT: u16 = 22;

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  copy_audio <source_folder> <target_folder>");
    eprintln!("  copy_audio --remote <host[:port]> <user> <source_folder> <server_folder>");
    eprintln!();
    eprintln!("Remote mode reads the password from RADIOSYNC_SSH_PASSWORD.");
    process::exit(2);
}

fn split_host(spec: &str) -> Result<(String, u16), Box<dyn std::error::Error>> {
    match spec.split_once(':') {
        Some((host, port)) => Ok((host.to_string(), port.parse()?)),
        None => Ok((spec.to_string(), DEFAULT_SSH_PORT)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let extensions = default_extensions();

    match args.as_slice() {
        [source, target] if source.as_str() != "--remote" => {
            let stats = mirror_local(Path::new(source), Path::new(target), &extensions)?;
            stats.print_summary("LOCAL COPY");
        }
        [flag, host_spec, user, source, server_folder] if flag.as_str() == "--remote" => {
            let (host, port) = split_host(host_spec)?;
            let password = env::var("RADIOSYNC_SSH_PASSWORD")
                .map_err(|_| "RADIOSYNC_SSH_PASSWORD is not set")?;
            let tree = SftpTree::connect(&host, port, user, &password)?;
            let stats = mirror_remote(Path::new(source), server_folder, &tree, &extensions)?;
            stats.print_summary("REMOTE COPY");
        }
        _ => usage(),
    }

    Ok(())
}
