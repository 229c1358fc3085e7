use clap::Parser;
use color_eyre::Result;
use sapawarga_exporter::{
    init_errors,
    init_logging,
    run,
};
use sapawarga_exporter_config::{
    Args,
    Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let args = Args::parse();
    init_logging(args.verbose)?;
    let config = Config::new(&args)?;
    if args.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }
    tracing::info!(listen_address = %config.listen_address, groups = config.groups.len(), "Starting exporter");
    run(config).await
}
