use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{Error, Result};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand, Debug)]
pub enum Commands {
    Agent(AgentArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AgentArgs {
    /// Comma separated pod CIDRs assigned to the node, first entry is the
    /// primary range. Reconciliation is skipped when empty.
    #[arg(long, env = "POD_CIDRS", default_value = "")]
    pub pod_cidrs: String,

    /// CNI configuration directory
    #[arg(long, env = "CNI_CONF_DIR", default_value = "/etc/cni/net.d")]
    pub cni_conf_dir: PathBuf,

    /// Template used to generate the CNI config, generation is skipped when
    /// unset
    #[arg(long, env = "CNI_CONF_TEMPLATE")]
    pub cni_conf_template: Option<PathBuf>,

    /// Port range usable by node port services, "N:M" or "N-M" with N < M
    #[arg(long, env = "NODE_PORT_RANGE", default_value = "30000-32767", value_parser = parse_node_port_range)]
    pub node_port_range: String,
}

/// Normalizes a node port range to "N:M". Both ports must be valid u16 and
/// the range must be ascending.
pub fn parse_node_port_range(s: &str) -> Result<String> {
    let Some((first, second)) = s.split_once([':', '-']) else {
        return Err(Error::Parse(format!("invalid node port range: '{s}'")));
    };
    let first = parse_port(first, s)?;
    let second = parse_port(second, s)?;
    if first >= second {
        return Err(Error::Parse(format!(
            "port 1 is greater than or equal to port 2 in range: '{s}'"
        )));
    }
    Ok(format!("{first}:{second}"))
}

fn parse_port(port: &str, range: &str) -> Result<u16> {
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Parse(format!(
            "could not parse port number from range: '{range}'"
        )));
    }
    port.parse().map_err(|_| {
        Error::Parse(format!(
            "port number out of range in: '{range}'"
        ))
    })
}
