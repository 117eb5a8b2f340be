use std::{env, env::VarError};

/// The service takes no arguments. Any argument prints the help text and the current environment instead.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Only non-secret variables are listed
    const DISPLAY_ENVS: [&str; 16] = [
        "RUST_LOG",
        "OPL_DATABASE_URL",
        "OPL_DB_MAX_CONNECTIONS",
        "OPL_RUN_MIGRATIONS",
        "OPL_QUEUE_BACKEND",
        "OPL_SQS_QUEUE_URL",
        "OPL_SQS_ENDPOINT",
        "OPL_AWS_REGION",
        "OPL_AWS_ACCESS_KEY_ID",
        "OPL_MAX_MESSAGES",
        "OPL_WAIT_TIME_SECONDS",
        "OPL_ERROR_BACKOFF_SECS",
        "OPL_CONCURRENCY",
        "OPL_INVENTORY_FAILURE_RATE",
        "OPL_PAYMENT_FAILURE_RATE",
        "OPL_SIMULATED_LATENCY_MS",
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
