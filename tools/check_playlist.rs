use std::env;
use std::process;

use playlist::PlaylistStore;
use remote::SftpTree;
use sync::{check_local, check_remote, prune_missing};
use tracing_subscriber::EnvFilter;

const DEFAULT_SSH_PORT: u16 = 22;

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  check_playlist <playlist.pls> [--remote <host[:port]> <user>] [--remove-missing]");
    eprintln!();
    eprintln!("Remote mode reads the password from RADIOSYNC_SSH_PASSWORD.");
    process::exit(2);
}

struct Args {
    playlist: String,
    remote: Option<(String, u16, String)>,
    remove_missing: bool,
}

fn parse_args(args: &[String]) -> Option<Args> {
    let mut playlist = None;
    let mut remote = None;
    let mut remove_missing = false;

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--remote" => {
                let host_spec = args.get(index + 1)?;
                let user = args.get(index + 2)?;
                let (host, port) = match host_spec.split_once(':') {
                    Some((host, port)) => (host.to_string(), port.parse().ok()?),
                    None => (host_spec.to_string(), DEFAULT_SSH_PORT),
                };
                remote = Some((host, port, user.to_string()));
                index += 3;
            }
            "--remove-missing" => {
                remove_missing = true;
                index += 1;
            }
            value if playlist.is_none() => {
                playlist = Some(value.to_string());
                index += 1;
            }
            _ => return None,
        }
    }

    Some(Args {
        playlist: playlist?,
        remote,
        remove_missing,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let raw_args: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&raw_args) {
        Some(args) => args,
        None => usage(),
    };

    let store = PlaylistStore::new(&args.playlist);
    if !store.path().exists() {
        return Err(format!("playlist not found: {}", args.playlist).into());
    }

    let references = store.load_references();
    if references.is_empty() {
        println!("Playlist has no tracks");
        return Ok(());
    }
    println!("Found {} tracks", references.len());

    let outcome = match &args.remote {
        Some((host, port, user)) => {
            let password = env::var("RADIOSYNC_SSH_PASSWORD")
                .map_err(|_| "RADIOSYNC_SSH_PASSWORD is not set")?;
            let tree = SftpTree::connect(host, *port, user, &password)?;
            check_remote(&references, &tree)
        }
        None => check_local(&references),
    };

    outcome.print_summary(store.path());

    if args.remove_missing && !outcome.missing.is_empty() {
        prune_missing(&store, &outcome)?;
        println!("\nPlaylist updated; {} tracks removed", outcome.missing.len());
    } else if !outcome.missing.is_empty() {
        println!("\nRe-run with --remove-missing to drop the missing tracks");
    }

    Ok(())
}
