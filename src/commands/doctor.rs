use std::path::PathBuf;

use clap::ArgMatches;
use hookline_messenger::{configured, load_config, HooklineConfig};

pub async fn run(matches: &ArgMatches) {
    println!("🔍 Checking Hookline configuration...\n");

    let config_path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .expect("config has default value");

    print!("• Loading {}... ", config_path.display());
    let config = if !config_path.exists() {
        println!("○ Not found, using defaults");
        HooklineConfig::default()
    } else {
        match load_config(&config_path) {
            Ok(config) => {
                println!("✓ Parsed");
                config
            }
            Err(e) => {
                println!("✗ {}", e);
                std::process::exit(1);
            }
        }
    };

    let all_ok = check(&config);

    println!();
    if all_ok {
        println!("✅ All checks passed! You're ready to run: hookline serve");
    } else {
        println!("⚠️  Some checks failed. Fix the issues above before running hookline serve");
        std::process::exit(1);
    }
}

/// Print one line per check and return whether the receiver can start.
fn check(config: &HooklineConfig) -> bool {
    let facebook = &config.facebook;
    let mut all_ok = true;

    print!("• Checking verify token... ");
    if configured(&facebook.verify_token).is_some() {
        println!("✓ Configured");
    } else {
        println!("✗ facebook.verify_token is not set");
        println!("  Subscription handshakes cannot be answered without it");
        all_ok = false;
    }

    print!("• Checking app secret... ");
    if configured(&facebook.app_secret).is_some() {
        println!("✓ Payload signatures will be verified");
    } else {
        println!("○ Not set (deliveries are accepted unsigned)");
    }

    print!("• Checking page tokens... ");
    match (configured(&facebook.page_access_token).is_some(), facebook.pages.len()) {
        (true, 0) => println!("✓ Fallback token configured"),
        (true, n) => println!("✓ {} page token(s) plus fallback", n),
        (false, 0) => {
            println!("⚠️  No page tokens and no fallback token");
            println!("  Every delivery will fail credential resolution");
        }
        (false, n) => println!("✓ {} page token(s), no fallback", n),
    }

    print!("• Checking webhook port... ");
    if is_port_in_use(&facebook.bind_address, facebook.webhook_port) {
        println!("✗ Port {} is in use", facebook.webhook_port);
        all_ok = false;
    } else {
        println!("✓ Port {} available", facebook.webhook_port);
    }

    print!("• Checking job queue... ");
    if config.queue.capacity == 0 {
        println!("✗ queue.capacity must be greater than zero");
        all_ok = false;
    } else {
        println!("✓ Capacity {}", config.queue.capacity);
    }

    all_ok
}

fn is_port_in_use(host: &str, port: u16) -> bool {
    std::net::TcpListener::bind((host, port)).is_err()
}
