pub mod cli;
pub mod client;
pub mod config;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;
pub mod terminal;

use cli::{ Args, Command, ServeArgs };
use log::info;
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve_args) => {
            log_serve_config(&serve_args);
            let server = Server::new(serve_args)?;
            server.run().await
        }
        Command::Chat(chat_args) => terminal::run_chat(chat_args).await,
    }
}

fn log_serve_config(args: &ServeArgs) {
    info!("--- Core Configuration ---");
    info!("Server Address: {}:{}", args.host, args.port);
    info!("Static Directory: {}", args.static_dir.display());
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("client default"));
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or("client default"));
    info!(
        "System Prompt: {}",
        args.system_prompt_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string())
    );
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");
}
