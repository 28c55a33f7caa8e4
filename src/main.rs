use tracing_subscriber::FmtSubscriber;
use verse_wallpaper::config::{CliOverrides, Config};
use verse_wallpaper::errors::Result;

#[cfg(feature = "server")]
async fn serve(addr_argument: Option<&str>, config: Config) -> Result<()> {
    use std::net::SocketAddr;
    use verse_wallpaper::{server, WallpaperGenerator};

    // If no address is provided, use the configured default
    let addr = match addr_argument {
        Some(addr) => {
            server::parse_address(addr, config.default_host(), config.default_port())?
        }
        None => SocketAddr::new(config.default_host(), config.default_port()),
    };

    let max_dimension = config.server.max_dimension;
    let generator = WallpaperGenerator::new(config)?;
    server::start_server(addr, server::AppState::new(generator, max_dimension)).await
}

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(feature = "cli")]
    {
        use clap::Parser;
        use verse_wallpaper::cli;

        let cli = cli::Cli::parse();

        let subscriber = FmtSubscriber::builder()
            .with_max_level(cli.log_level)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");

        let config = Config::load(Some(CliOverrides::from_cli_args(
            cli.port,
            cli.fonts_dir.clone(),
        )));

        if let Some(addr_argument) = cli.server.as_ref() {
            #[cfg(feature = "server")]
            serve(addr_argument.as_deref(), config).await?;

            #[cfg(not(feature = "server"))]
            {
                let _ = (addr_argument, config);
                tracing::error!("Server support is not enabled; rebuild with the 'server' feature.");
            }
        } else if cli.has_verse() {
            cli::run(cli, config).await?;
        } else {
            tracing::error!("Please provide verse text or start the server with --server.");
        }
    }

    #[cfg(not(feature = "cli"))]
    {
        // Server-only mode
        let subscriber = FmtSubscriber::builder()
            .with_max_level(tracing::Level::INFO)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");

        let config = Config::load(None::<CliOverrides>);

        #[cfg(feature = "server")]
        {
            // Parse command line arguments manually for server address
            let args: Vec<String> = std::env::args().collect();
            serve(args.get(1).map(String::as_str), config).await?;
        }

        #[cfg(not(feature = "server"))]
        {
            let _ = config;
            tracing::error!("Please enable the 'cli' or 'server' feature.");
        }
    }

    Ok(())
}
