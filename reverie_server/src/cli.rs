use std::{env, env::VarError};

use reverie_engine::PseudonymScheme;

/// There's no real CLI for the server, so just do quick 'n dirty.
///
/// Returns true if arguments were given, in which case the server should not start.
pub fn handle_command_line_args() -> bool {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return false;
    }
    if args.iter().any(|a| a == "--generate-crypto-vars") {
        print_crypto_vars();
    } else {
        display_readme();
        display_envs();
    }
    true
}

fn print_crypto_vars() {
    let (key, nonce) = PseudonymScheme::generate_config();
    println!("# Add these to your .env file. Changing them later orphans every offer on file.");
    println!("REVERIE_CRYPTO_KEY={key}");
    println!("REVERIE_CRYPTO_NONCE={nonce}");
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 7] = [
        "RUST_LOG",
        "REVERIE_HOST",
        "REVERIE_PORT",
        "REVERIE_DATABASE_URL",
        "REVERIE_JWT_ISSUER",
        "REVERIE_STORE_TIMEOUT_MS",
        "REVERIE_EVENT_BUFFER_SIZE",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
