use anyhow::{anyhow, Context};
use log::{info, warn};
use photomatch::api;
use photomatch::auth::{self, Argon2Verifier, CredentialVerifier, RejectAll};
use photomatch::config::AppConfig;
use photomatch::drive::{init_drive, load_sdk_config, S3Drive};
use photomatch::faces::RekognitionComparator;
use photomatch::shared::state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "hash-password" => {
                let password = args
                    .get(2)
                    .ok_or_else(|| anyhow!("usage: photomatch hash-password <password>"))?;
                println!("{}", auth::hash_password(password)?);
                return Ok(());
            }
            "--help" | "-h" => {
                println!("usage: photomatch [hash-password <password>]");
                return Ok(());
            }
            other => return Err(anyhow!("Unknown command: {}", other)),
        }
    }

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let verifier: Arc<dyn CredentialVerifier> = match Argon2Verifier::from_config(&config.auth)? {
        Some(verifier) => Arc::new(verifier),
        None => {
            warn!("AUTH_USERNAME/AUTH_PASSWORD_HASH not set; all logins will be rejected");
            Arc::new(RejectAll)
        }
    };

    let sdk_config = load_sdk_config(&config.drive).await;
    let drive = Arc::new(S3Drive::new(init_drive(&sdk_config, &config.drive)));
    let comparator = Arc::new(RekognitionComparator::new(&sdk_config));

    let state = Arc::new(AppState::new(&config, drive, comparator, verifier));
    let app = api::router(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "Serving on {} (bucket {}, threshold {}, listing {:?})",
        addr, config.drive.bucket, config.matching.threshold, config.drive.listing
    );
    axum::serve(listener, app).await?;
    Ok(())
}
