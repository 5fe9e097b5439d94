use clap::Parser;
use concurrent::DEFAULT_CONCURRENCY;
use ec2::Ec2Provider;
use inventory::{
    build_inventory, ConnectionVars, InventorySettings, DEFAULT_REGION_FILTER,
    DEFAULT_SSH_PRIVATE_KEY_FILE, DEFAULT_SSH_USER,
};
use provider::InstanceProvider;

mod concurrent;
mod ec2;
mod inventory;
mod provider;
mod utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    env_logger::builder()
        .filter_module("aws_config", log::LevelFilter::Warn)
        .filter_module("aws_smithy_http_tower", log::LevelFilter::Warn)
        .filter_level(log_level(args.verbose))
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let mode = match args.mode() {
        Some(mode) => mode,
        None => return Ok(()),
    };

    let provider = Ec2Provider::new(utils::load_sdk_config().await);
    let output = render(&mode, &provider, &args.settings(), args.pretty).await?;
    println!("{}", output);

    Ok(())
}

#[derive(Parser, Debug)]
#[clap(
    name = "ec2-inventory",
    bin_name = "ec2-inventory",
    about = "Ansible dynamic inventory of EC2 instances"
)]
struct Cli {
    #[clap(long, help = "List all webserver hosts")]
    list: bool,
    #[clap(
        long,
        value_name = "ID",
        conflicts_with = "list",
        help = "Print the variables of a single host"
    )]
    host: Option<String>,
    #[clap(
        long,
        env = "EC2_INVENTORY_REGION_FILTER",
        default_value = DEFAULT_REGION_FILTER,
        help = "Only scan regions whose name contains this string"
    )]
    region_filter: String,
    #[clap(long, env = "EC2_INVENTORY_SSH_USER", default_value = DEFAULT_SSH_USER)]
    ssh_user: String,
    #[clap(
        long,
        env = "EC2_INVENTORY_SSH_KEY",
        default_value = DEFAULT_SSH_PRIVATE_KEY_FILE
    )]
    ssh_private_key_file: String,
    #[clap(
        long,
        default_value_t = DEFAULT_CONCURRENCY,
        help = "Maximum number of regions scanned at once"
    )]
    concurrency: usize,
    #[clap(long, help = "Indent the JSON output")]
    pretty: bool,
    #[clap(short, long, action = clap::ArgAction::Count, help = "Log more, repeat for more detail")]
    verbose: u8,
}

#[derive(Debug, PartialEq, Eq)]
enum Mode {
    List,
    Host(String),
}

impl Cli {
    fn mode(&self) -> Option<Mode> {
        match (&self.host, self.list) {
            (Some(host), _) => Some(Mode::Host(host.clone())),
            (None, true) => Some(Mode::List),
            (None, false) => None,
        }
    }

    fn settings(&self) -> InventorySettings {
        InventorySettings {
            region_filter: self.region_filter.clone(),
            connection: ConnectionVars {
                ansible_ssh_user: self.ssh_user.clone(),
                ansible_ssh_private_key_file: self.ssh_private_key_file.clone(),
            },
            concurrency: self.concurrency,
        }
    }
}

fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

async fn render<P>(
    mode: &Mode,
    provider: &P,
    settings: &InventorySettings,
    pretty: bool,
) -> anyhow::Result<String>
where
    P: InstanceProvider + Sync + ?Sized,
{
    let document = build_inventory(provider, settings).await?;
    let value = match mode {
        Mode::List => serde_json::to_value(&document)?,
        Mode::Host(id) => match document.host_vars(id) {
            Some(vars) => serde_json::to_value(vars)?,
            None => serde_json::json!({}),
        },
    };

    let output = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(output)
}
