use clap::Parser;
use slotmarshal::{
    config::{self, QueryMode, WalletConfig},
    Error, OfferRequest, WalletAction,
};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Executes an offer against a published contract instance.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Contract instance name under published.agoricNames.instance
    instance: String,

    /// Public invitation maker to call on the instance
    public_invitation_maker: String,

    /// Wallet address the offer is sent from
    wallet_address: String,

    /// Invitation arguments, passed as string literals
    args: Vec<String>,

    /// Path to config file
    #[arg(short, long, default_value = "wallet.json")]
    config: PathBuf,

    /// Query through the node's RPC endpoint instead of agd
    #[arg(long)]
    rpc: bool,

    /// Print the offer instead of sending it
    #[arg(long)]
    dry_run: bool,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<WalletConfig, Error> {
    let config: WalletConfig = if cli.config.exists() {
        config::from_file(&cli.config)?
    } else {
        WalletConfig::default()
    };

    let mut config = config.with_env_overrides();
    if cli.rpc {
        config.query_mode = QueryMode::Rpc;
    }
    Ok(config)
}

async fn run(cli: &Cli) -> Result<(), Error> {
    let config = load_config(cli)?;
    info!("config loaded.");
    debug!("config: {:?}", config);

    let action = WalletAction::from_config(&config)?;
    let request = OfferRequest {
        instance: cli.instance.clone(),
        public_invitation_maker: cli.public_invitation_maker.clone(),
        args: cli.args.clone(),
        from: cli.wallet_address.clone(),
    };

    if cli.dry_run {
        let payload = action.prepare(&request).await?;
        println!("{}", payload.to_wire()?);
        return Ok(());
    }

    let submission = action.execute(&request).await?;
    print!("{}", submission.output);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
