use crate::cli::ConfigCommands;
use crate::config_file::CliConfig;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { server_url, token } => run_config_init(server_url, token),
    }
}

pub fn run_config_init(server_url: Option<String>, token: Option<String>) -> Result<(), CliError> {
    let mut config = CliConfig::load()?;
    config.apply(server_url, token)?;

    let path = config.save()?;
    println!("Config written to {}", path.display());

    let server = config.server_config()?;
    println!("Server: {}", server.base_url);
    if !server.has_token() {
        println!("No messaging token configured; pass --token or set SPIDERNOTES_TOKEN to sync.");
    }
    Ok(())
}
