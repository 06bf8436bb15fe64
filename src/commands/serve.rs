//! `hookline serve`: run the Messenger webhook receiver and job worker.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::ArgMatches;
use hookline_messenger::{
    configured, load_config, CredentialResolver, EventProcessors, FacebookAdapter,
    FacebookMessageHandler, HooklineConfig, InMemoryCredentialStore, InMemoryJobQueue, JobWorker,
    LoggingEventProcessor, MessagingService, OutcomeLogger, ServiceRegistry, WebhookAdapter,
};

/// How long the worker may keep draining after the webhook server stops.
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(matches: &ArgMatches) {
    // Initialize tracing for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config_path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .expect("config has default value");

    let mut config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Failed to load {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = apply_overrides(&mut config, matches) {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }

    println!("✓ Starting Hookline...");

    // Worker side: credentials → handler → registry
    let store = Arc::new(InMemoryCredentialStore::from_pages(
        MessagingService::Facebook,
        &config.facebook.pages,
    ));
    let stored_tokens = store.len().await;
    let no_tokens = store.is_empty().await;
    let fallback_token = configured(&config.facebook.page_access_token).map(str::to_string);
    let has_fallback = fallback_token.is_some();
    let resolver = CredentialResolver::new(MessagingService::Facebook, store, fallback_token);
    let processors = EventProcessors::uniform(Arc::new(LoggingEventProcessor));
    let mut registry = ServiceRegistry::new();
    registry.register(
        MessagingService::Facebook,
        Arc::new(FacebookMessageHandler::new(resolver, processors)),
    );

    let logger = Arc::new(OutcomeLogger::new(config.logging.outcome_log.clone()));
    let (queue, rx) = InMemoryJobQueue::new(config.queue.capacity);
    let worker = tokio::spawn(JobWorker::new(rx, Arc::new(registry), logger.clone()).run());

    let adapter = match FacebookAdapter::new(config.facebook.clone(), Arc::new(queue)) {
        Ok(adapter) => adapter,
        Err(e) => {
            eprintln!("✗ Invalid Messenger configuration: {}", e);
            eprintln!("  Set facebook.verify_token in the config file or pass --verify-token");
            std::process::exit(1);
        }
    };

    if let Err(e) = adapter.start().await {
        eprintln!("✗ Failed to start Messenger adapter: {}", e);
        std::process::exit(1);
    }

    println!(
        "✓ Messenger webhook listening on {}:{}{}",
        config.facebook.bind_address,
        config.facebook.webhook_port,
        hookline_messenger::adapters::facebook::WEBHOOK_PATH
    );
    println!("✓ Job queue capacity: {}", config.queue.capacity);
    if configured(&config.facebook.app_secret).is_some() {
        println!("✓ Payload signatures: ENABLED (X-Hub-Signature-256)");
    } else {
        println!("→ Payload signatures: disabled (set facebook.app_secret to enable)");
    }
    if !no_tokens {
        println!("→ {} page token(s) loaded", stored_tokens);
    }
    if !has_fallback && no_tokens {
        eprintln!("⚠️  No page access tokens configured: every delivery will fail processing");
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("⚠️  Failed to listen for shutdown signal: {}", e);
    }

    match adapter.stop().await {
        Ok(()) => println!("\n✓ Messenger adapter stopped"),
        Err(e) => eprintln!("\n⚠️  Messenger adapter stop error: {}", e),
    }

    // Dropping the adapter drops the last queue sender, letting the worker drain.
    drop(adapter);
    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker).await {
        Ok(_) => {
            let counts = logger.counts().await;
            println!(
                "✓ Worker stopped after {} job(s) ({} processed, {} unhandled, {} failed)",
                counts.total(),
                counts.processed,
                counts.unhandled,
                counts.failed
            );
        }
        Err(_) => eprintln!("⚠️  Worker did not drain within {:?}", WORKER_DRAIN_TIMEOUT),
    }
}

/// Apply command-line flags on top of the loaded configuration.
pub fn apply_overrides(config: &mut HooklineConfig, matches: &ArgMatches) -> Result<(), String> {
    if let Some(port) = matches.get_one::<String>("port") {
        config.facebook.webhook_port = port
            .parse()
            .map_err(|e| format!("Invalid port number '{}': {}", port, e))?;
    }
    if let Some(host) = matches.get_one::<String>("host") {
        config.facebook.bind_address = host.clone();
    }
    if let Some(token) = matches.get_one::<String>("verify-token") {
        config.facebook.verify_token = Some(token.clone());
    }
    if let Some(token) = matches.get_one::<String>("page-access-token") {
        config.facebook.page_access_token = Some(token.clone());
    }
    if let Some(secret) = matches.get_one::<String>("app-secret") {
        config.facebook.app_secret = Some(secret.clone());
    }
    if let Some(capacity) = matches.get_one::<String>("queue-capacity") {
        config.queue.capacity = capacity
            .parse()
            .map_err(|e| format!("Invalid queue capacity '{}': {}", capacity, e))?;
    }
    if let Some(path) = matches.get_one::<String>("outcome-log") {
        config.logging.outcome_log = Some(PathBuf::from(path));
    }
    Ok(())
}
