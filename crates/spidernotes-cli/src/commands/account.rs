use std::path::Path;

use spidernotes_core::models::User;
use spidernotes_core::sync::HttpSyncTransport;

use crate::cli::AccountCommands;
use crate::commands::common::{confirm, open_service};
use crate::config_file::CliConfig;
use crate::error::CliError;

pub async fn run_account(command: AccountCommands, db_path: &Path) -> Result<(), CliError> {
    let transport = open_transport()?;
    match command {
        AccountCommands::Show => {
            let user = transport.get_user().await?;
            print_user(&user);
            Ok(())
        }
        AccountCommands::Disconnect => {
            let user = transport.disconnect_user().await?;
            print_user(&user);
            Ok(())
        }
        AccountCommands::Delete { yes } => {
            if !yes && !confirm("Delete the server account and every local note?")? {
                return Err(CliError::Aborted);
            }

            transport.delete_user().await?;
            let service = open_service(db_path).await?;
            service.clear_all_data().await?;
            println!("Account and local data deleted");
            Ok(())
        }
    }
}

fn open_transport() -> Result<HttpSyncTransport, CliError> {
    let server = CliConfig::load()?.server_config()?;
    if !server.has_token() {
        return Err(CliError::SyncNotConfigured);
    }
    Ok(HttpSyncTransport::new(server)?)
}

pub fn format_user(user: &User) -> String {
    if !user.is_connected {
        return "Not connected".to_string();
    }

    let name = if user.name.trim().is_empty() {
        user.email.clone()
    } else {
        format!("{} <{}>", user.name, user.email)
    };
    if user.provider.trim().is_empty() {
        format!("Connected as {name}")
    } else {
        format!("Connected as {name} via {}", user.provider)
    }
}

fn print_user(user: &User) {
    println!("{}", format_user(user));
}
