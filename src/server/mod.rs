pub mod api;
pub mod error;

use crate::cli::ServeArgs;
use crate::config::prompt::load_system_instruction;
use crate::llm::chat::{ ChatClient, GeminiChatClient };
use crate::llm::LlmConfig;
use std::error::Error;
use std::net::{ SocketAddr, ToSocketAddrs };
use std::sync::Arc;
use tokio::signal;
use log::{ info, warn, error };

use self::api::{ router, AppState };

pub struct Server {
    addr: SocketAddr,
    state: AppState,
    args: ServeArgs,
}

impl Server {
    pub fn new(args: ServeArgs) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let addr = resolve_addr(&args.host, args.port)?;

        let config = LlmConfig {
            api_key: Some(args.api_key.clone()).filter(|k| !k.trim().is_empty()),
            completion_model: args.chat_model.clone(),
            base_url: args.chat_base_url.clone(),
        };
        let chat_client: Arc<dyn ChatClient> = Arc::new(GeminiChatClient::from_config(&config)?);
        info!("Chat client configured: Model={}", chat_client.get_model());

        let system_instruction = load_system_instruction(args.system_prompt_path.as_ref())?;
        if args.system_prompt_path.is_none() {
            info!("Using built-in Mon/English system instruction");
        }

        Ok(Self {
            addr,
            state: AppState::new(chat_client, system_instruction),
            args,
        })
    }

    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if !self.args.static_dir.join("index.html").is_file() {
            warn!(
                "No index.html under '{}'; only /api/chat will be useful",
                self.args.static_dir.display()
            );
        }
        let app = router(self.state, &self.args.static_dir);

        if self.args.enable_tls {
            let (cert_path, key_path) = match (&self.args.tls_cert_path, &self.args.tls_key_path) {
                (Some(cert_path), Some(key_path)) => (cert_path, key_path),
                (Some(_), None) | (None, Some(_)) => {
                    error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                    return Err("Missing TLS certificate or key path".into());
                }
                (None, None) => {
                    error!("--enable-tls was set but no certificate/key paths provided.");
                    return Err("TLS enabled without cert/key".into());
                }
            };
            info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                cert_path,
                key_path
            ).await?;

            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown_handle.graceful_shutdown(None);
            });

            info!("HTTPS server listening on: https://{}", self.addr);
            axum_server::bind_rustls(self.addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service()).await?;
        } else {
            let listener = tokio::net::TcpListener::bind(self.addr).await.map_err(|e| {
                error!("Failed to bind HTTP server to {}: {}. Try a different port.", self.addr, e);
                e
            })?;
            info!("HTTP server listening on: http://{}", self.addr);
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(shutdown_signal()).await?;
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Accepts IP literals (IPv6 with or without brackets) and host names such as
/// `localhost`; the first resolved address wins.
fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr, Box<dyn Error + Send + Sync>> {
    let host = host.trim().trim_start_matches('[').trim_end_matches(']');
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| format!("Cannot resolve HOST '{}': {}", host, e))?
        .next()
        .ok_or_else(|| format!("HOST '{}' did not resolve to any address", host))?;
    Ok(addr)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
