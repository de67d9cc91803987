use crate::config::ClientConfig;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "envelope-client")]
#[command(about = "Call JSON envelope APIs with stored authorization")]
pub struct CliConfig {
    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Base URL used to resolve relative request paths")]
    pub base_url: Option<String>,

    #[arg(long, help = "Authorization header value, overrides the token file")]
    pub token: Option<String>,

    #[arg(long, help = "File used to persist the authorization token")]
    pub token_file: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Send a GET request
    Get { url: String },
    /// Send a POST request with an optional JSON body
    Post {
        url: String,
        #[arg(long)]
        body: Option<String>,
    },
    /// Send a PUT request with an optional JSON body
    Put {
        url: String,
        #[arg(long)]
        body: Option<String>,
    },
    /// Send a DELETE request with an optional JSON body
    Delete {
        url: String,
        #[arg(long)]
        body: Option<String>,
    },
    /// Upload a file and form fields as multipart/form-data
    Upload {
        url: String,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
    /// Store an authorization token in the token file
    Login { token: String },
    /// Remove the stored authorization token
    Logout,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Post { .. } => "post",
            Command::Put { .. } => "put",
            Command::Delete { .. } => "delete",
            Command::Upload { .. } => "upload",
            Command::Login { .. } => "login",
            Command::Logout => "logout",
        }
    }
}

impl CliConfig {
    /// 載入配置檔後以命令列參數覆蓋
    pub fn resolve(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.client.base_url = Some(base_url.clone());
        }

        if self.token.is_some() || self.token_file.is_some() {
            let auth = config.auth.get_or_insert_with(Default::default);
            if let Some(token) = &self.token {
                auth.token = Some(token.clone());
            }
            if let Some(token_file) = &self.token_file {
                auth.token_file = Some(token_file.clone());
            }
        }

        config.validate()?;
        Ok(config)
    }
}
