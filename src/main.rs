use clap::Parser;
use crinet_agent::config::{Cli, Commands};
use crinet_agent::{Result, cni};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    setup_subscriber();
    let cli = Cli::parse();
    match cli.command {
        Commands::Agent(args) => {
            info!("using node port range {}", args.node_port_range);
            let plugin = cni::ConfDirPlugin::new(&args.cni_conf_dir);
            cni::reconcile(
                &args.pod_cidrs,
                args.cni_conf_template.as_deref(),
                &args.cni_conf_dir,
                &plugin,
            )?;
        }
    }
    Ok(())
}

fn setup_subscriber() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crinet_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
