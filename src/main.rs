use clap::Parser;
use pumpwatch::cli::{Cli, Commands};
use pumpwatch::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Configuration errors are fatal
    let config = Config::load(&cli.config)
        .map_err(|e| anyhow::anyhow!("Invalid configuration in {}: {}", cli.config, e))?;

    match cli.command {
        Commands::Run(args) => {
            let _telemetry = pumpwatch::telemetry::init_telemetry(&config.telemetry)?;
            args.execute(config).await?;
        }
        Commands::Check => {
            println!("{}: configuration ok", cli.config);
            println!("  Sources: {:?}", config.sources.venues);
            println!(
                "  Sniper: {} ({:?}, max {} per venue)",
                if config.sniper.enabled { "on" } else { "off" },
                config.sniper.venues,
                config.sniper.max_subscriptions
            );
            println!("  Notifier: {:?}", config.notifier.kind);
            println!("  Recipients: {}", config.recipients.len());
        }
        Commands::Config => {
            let mut shown = config.clone();
            if shown.notifier.bot_token.is_some() {
                shown.notifier.bot_token = Some("<redacted>".to_string());
            }
            print!("{}", toml::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}
