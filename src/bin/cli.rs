use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gpslink::{Session, SessionConfig};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry, fmt};

#[derive(Parser)]
#[command(name = "gpslink", version, about)]
struct Args {
    /// Serial port the device is attached to, e.g. /dev/ttyUSB0 or COM3
    #[clap(long)]
    device: String,

    /// Serial baud rate
    #[clap(long, default_value_t = gpslink::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Configure diagnostic logging level
    #[clap(long, default_value_t = Level::WARN)]
    log: Level,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the device's identity and negotiated protocol capabilities
    ProductInfo,
    /// Download all waypoints
    GetWaypoints,
    /// Download all routes
    GetRoutes,
    /// Download the track log
    GetTracks,
    /// Download the almanac
    GetAlmanac,
    /// Download lap data
    GetLaps,
    /// Download fitness runs
    GetRuns,
    /// Read the device's current date and time
    GetTime,
    /// Read the device's current position
    GetPosition,
    /// Stream live position/velocity/time samples until interrupted or COUNT
    /// samples have been printed
    Pvt {
        /// Number of samples to print before disabling the stream
        #[clap(long, default_value_t = 10)]
        count: usize,
    },
}

fn main() -> Result<()> {
    // Intentionally avoid wrapping argument parsing errors in anyhow::Result so
    // we preserve Clap's pretty formatting of usage info.
    let args = Args::parse();

    let fmt_layer = fmt::Layer::new()
        .with_target(false)
        .with_filter(LevelFilter::from_level(args.log));
    tracing::subscriber::set_global_default(Registry::default().with(fmt_layer))?;

    let config = SessionConfig::new(args.device.clone()).baud_rate(args.baud);
    let mut session = Session::open(&config).context("opening device session")?;

    match &args.cmd {
        Commands::ProductInfo => {
            println!("{:#?}", session.product_info());
            println!("{:#?}", session.capabilities());
        }
        Commands::GetWaypoints => {
            for record in session.get_waypoints(None).context("downloading waypoints")? {
                println!("{record:#?}");
            }
        }
        Commands::GetRoutes => {
            for group in session.get_routes(None).context("downloading routes")? {
                println!("{group:#?}");
            }
        }
        Commands::GetTracks => {
            let tracks = session.get_tracks(None).context("downloading tracks")?;
            println!("{tracks:#?}");
        }
        Commands::GetAlmanac => {
            for record in session.get_almanac(None).context("downloading almanac")? {
                println!("{record:#?}");
            }
        }
        Commands::GetLaps => {
            for record in session.get_laps(None).context("downloading laps")? {
                println!("{record:#?}");
            }
        }
        Commands::GetRuns => {
            for group in session.get_runs(None).context("downloading runs")? {
                println!("{group:#?}");
            }
        }
        Commands::GetTime => {
            println!("{:#?}", session.get_time().context("reading device time")?);
        }
        Commands::GetPosition => {
            println!(
                "{:#?}",
                session.get_position().context("reading device position")?
            );
        }
        Commands::Pvt { count } => {
            session.pvt_on().context("enabling PVT stream")?;
            for _ in 0..*count {
                match session.get_pvt() {
                    Ok(sample) => println!("{sample:#?}"),
                    Err(err) => {
                        eprintln!("PVT read failed: {err}");
                        break;
                    }
                }
            }
            session.pvt_off().context("disabling PVT stream")?;
        }
    }

    Ok(())
}
