use clap::Parser;
use envelope_client::config::cli::Command;
use envelope_client::utils::{logger, validation};
use envelope_client::{
    ApiClient, CliConfig, Envelope, TokenStore, UploadFile, AUTHORIZATION_KEY,
};
use std::sync::Arc;
use tokio::sync::Notify;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    // 不記錄 --token 與 login 參數
    tracing::debug!(
        "Command: {} (config: {:?}, base_url: {:?})",
        cli.command.name(),
        cli.config,
        cli.base_url
    );

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    // login/logout 只操作 token 存儲
    match &cli.command {
        Command::Login { token } => {
            validation::validate_non_empty_string("token", token)?;
            config.persistent_token_store()?.set(AUTHORIZATION_KEY, token)?;
            println!("✅ Authorization stored");
            return Ok(());
        }
        Command::Logout => {
            config.persistent_token_store()?.remove(AUTHORIZATION_KEY)?;
            println!("✅ Authorization removed");
            return Ok(());
        }
        _ => {}
    }

    let expired = Arc::new(Notify::new());
    let reload = Arc::clone(&expired);
    let client = config
        .client_builder(move || reload.notify_one())?
        .build()?;

    match execute(&client, cli.command).await {
        Ok(envelope) => {
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(())
        }
        Err(e) => {
            tracing::debug!("Request failed: {:?}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            if e.is_session_expired() {
                // 等待延遲的 reload 觸發後再結束
                expired.notified().await;
                eprintln!("🔒 Session expired, run `envelope-client login <token>` again");
                std::process::exit(3);
            }
            std::process::exit(2);
        }
    }
}

async fn execute(client: &ApiClient, command: Command) -> envelope_client::Result<Envelope> {
    match command {
        Command::Get { url } => client.get(&url).await,
        Command::Post { url, body } => client.post(&url, &parse_body(body)?).await,
        Command::Put { url, body } => client.put(&url, &parse_body(body)?).await,
        Command::Delete { url, body } => client.delete(&url, &parse_body(body)?).await,
        Command::Upload { url, file, fields } => {
            let file = match file {
                Some(path) => Some(UploadFile::from_path(path).await?),
                None => None,
            };
            let fields = fields
                .iter()
                .map(|raw| validation::parse_key_value("field", raw))
                .collect::<envelope_client::Result<Vec<_>>>()?;
            client.upload(&url, file, fields).await
        }
        Command::Login { .. } | Command::Logout => unreachable!("handled before building the client"),
    }
}

fn parse_body(body: Option<String>) -> envelope_client::Result<serde_json::Value> {
    match body {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(serde_json::Value::Null),
    }
}
