use std::io::Write;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use testgen_core::api::RestBackend;
use testgen_core::auth::{AuthSession, FirebaseAuth, IDENTITY_TOOLKIT_BASE};
use testgen_core::Notifier;

use testgen_studio::cli::{self, render, studio::Reply, Studio};
use testgen_studio::config::Config;
use testgen_studio::transport::ReqwestTransport;

/// Signs in when credentials are configured, otherwise falls back to a fixed
/// or throwaway user id.
async fn resolve_user(config: &Config) -> anyhow::Result<String> {
    if let Some((api_key, email, password)) = config.credentials() {
        let auth = AuthSession::new(FirebaseAuth::new(ReqwestTransport::new(IDENTITY_TOOLKIT_BASE), api_key));
        let user = auth.sign_in(email, password).await.context("Sign-in failed")?;
        if !user.email_verified {
            warn!("{} has not verified their email address yet", user.email);
        }
        return Ok(user.uid);
    }
    if let Some(user_id) = &config.user_id {
        return Ok(user_id.clone());
    }
    let user_id = format!("local-{}", uuid::Uuid::new_v4().simple());
    warn!("No credentials or STUDIO_USER_ID configured; using throwaway user {user_id}");
    Ok(user_id)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Logs go to stderr so they never interleave with the transcript
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "testgen_studio=info,testgen_core=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let user_id = resolve_user(&config).await?;
    info!("Using agent backend at {} as {user_id}", config.api_base);

    // ── Wiring ────────────────────────────────────────────────────────────────
    let notifier = Notifier::new();
    notifier.set_listener(|notice| println!("{}", render::notice(&notice)));
    let backend = RestBackend::new(ReqwestTransport::new(&config.api_base));
    let studio = Studio::new(backend, &user_id, config.analytics_days, notifier);

    println!("{}", studio.start().await);
    println!("Type /help for commands.");

    // ── Input loop ────────────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match cli::parse(&line) {
            Ok(command) => command,
            Err(usage) => {
                println!("{usage}");
                continue;
            }
        };
        match studio.handle(command).await {
            Ok(Reply::Quit) => break,
            Ok(Reply::Output(text)) if text.is_empty() => {}
            Ok(Reply::Output(text)) => println!("{}", text.trim_end()),
            Err(e) => println!("{}", render::failure(&e)),
        }
    }
    info!("Bye");
    Ok(())
}
