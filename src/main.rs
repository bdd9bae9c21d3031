use clap::{Parser, Subcommand};
use imsakiyah::config::Config;
use imsakiyah::location::{
    zone_for_province, Coordinates, FixedPosition, GeolocationProvider, MatchKind, ProviderError,
    ResolutionFailure, ResolutionSession, ResolveError, ResolvedLocation,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Imsakiyah locator: find the province and city/regency the Indonesian
/// Ramadan schedule API knows you by.
///
/// Examples:
///   imsakiyah locate --lat -7.7156 --lon 110.3556
///   imsakiyah locate --auto --json
///   imsakiyah provinces
///   imsakiyah cities "D.I. Yogyakarta"
///   imsakiyah serve --port 3000
#[derive(Parser)]
#[command(name = "imsakiyah", version, about, long_about = None)]
struct Cli {
    /// Config file. Defaults to <config_dir>/imsakiyah/config.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Geocoder language (overrides config).
    #[arg(long, global = true)]
    language: Option<String>,

    /// Bypass the on-disk region cache.
    #[arg(long, global = true)]
    no_cache: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a position to schedule province and city.
    Locate {
        /// Latitude (-90 to 90).
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,

        /// Longitude (-180 to 180).
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,

        /// Detect position via IP geolocation (the default without --lat/--lon).
        #[arg(long, short = 'a', conflicts_with_all = ["lat", "lon"])]
        auto: bool,

        /// Print JSON to stdout.
        #[arg(long)]
        json: bool,
    },
    /// List reference provinces.
    Provinces,
    /// List reference cities/regencies of a province.
    Cities {
        province: String,
    },
    /// Run the HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, short = 'p', default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum LocateOutput<'a> {
    Resolved {
        #[serde(flatten)]
        location: &'a ResolvedLocation,
        province_match: MatchKind,
        city_match: MatchKind,
        degraded: bool,
        timezone: &'static str,
    },
    Failed {
        reason: ResolutionFailure,
        message: &'static str,
        default: &'a ResolvedLocation,
        timezone: &'static str,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "imsakiyah=info",
        1 => "imsakiyah=debug",
        _ => "imsakiyah=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // ── Load config ─────────────────────────────────────────────

    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = match loaded {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(lang) = cli.language {
        config.language = lang;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }

    match cli.command {
        Command::Locate { lat, lon, auto: _, json } => locate(&config, lat.zip(lon), json).await,
        Command::Provinces => {
            let list = config.directory().list_provinces().await;
            print_list(list)
        }
        Command::Cities { province } => {
            let list = config.directory().list_cities(&province).await;
            print_list(list)
        }
        Command::Serve { host, port } => match imsakiyah::server::start(&config, &host, port).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: server failed: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn locate(config: &Config, manual: Option<(f64, f64)>, json: bool) -> ExitCode {
    let locator: Box<dyn GeolocationProvider> = match manual {
        Some((lat, lon)) => match Coordinates::checked(lat, lon) {
            Some(at) => Box::new(FixedPosition(at)),
            None => {
                eprintln!("Error: Invalid coordinates. Lat: -90..90, Lon: -180..180");
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(config.ip_geolocator()),
    };

    let resolver = config.resolver();
    let mut session = ResolutionSession::new();
    let outcome = resolver
        .resolve_location(&mut session, Some(&*locator))
        .await;

    match outcome {
        Ok(resolution) => {
            let zone = zone_for_province(&resolution.location.province);
            if json {
                print_json(&LocateOutput::Resolved {
                    location: &resolution.location,
                    province_match: resolution.province_match,
                    city_match: resolution.city_match,
                    degraded: resolution.is_degraded(),
                    timezone: zone.tz().name(),
                });
            } else {
                println!("  {}", resolution.location.display_line());
                println!(
                    "  province: {} ({}), city: {} ({})",
                    resolution.location.province,
                    resolution.province_match,
                    resolution.location.city,
                    resolution.city_match
                );
                println!("  zone: {}", zone);
                if resolution.is_degraded() {
                    eprintln!("  \u{26A0}\u{FE0F}  City guessed; pick one with `imsakiyah cities`.");
                }
            }
            ExitCode::SUCCESS
        }
        Err(ResolveError::Failed(reason)) => {
            let fallback = &config.default_location;
            let zone = zone_for_province(&fallback.province);
            if json {
                print_json(&LocateOutput::Failed {
                    reason,
                    message: reason.localized(),
                    default: fallback,
                    timezone: zone.tz().name(),
                });
            } else {
                eprintln!("  {}", reason.localized());
                println!("  {} (default)", fallback.display_line());
                println!("  zone: {}", zone);
            }
            // A failed lookup still leaves the caller with a usable location.
            ExitCode::SUCCESS
        }
        Err(ResolveError::Superseded) => {
            eprintln!("Error: resolution was cancelled");
            ExitCode::FAILURE
        }
    }
}

fn print_list(list: Result<Vec<String>, ProviderError>) -> ExitCode {
    match list {
        Ok(names) => {
            for name in names {
                println!("{}", name);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Error: cannot encode output: {}", e),
    }
}
