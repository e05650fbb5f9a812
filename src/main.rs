use clap::Parser;
use ezdl::cli::Cli;
use ezdl::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Starting ezdl v{}", env!("CARGO_PKG_VERSION"));

    // Every failure ends here as a single error line; stdout stays empty.
    match cli.run().await {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            let kind = e.downcast_ref::<Error>().map(Error::kind).unwrap_or("Error");
            error!("{}: {:#}", kind, e);
            std::process::exit(1);
        }
    }
}
