//! CVForge CLI - drive the client session layer from a terminal.
//!
//! Mirrors what the web client does on its login form and on page loads,
//! so remembered logins and silent sign-in can be exercised end to end
//! against a real API.

mod app;

use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use cvforge_core::auth::AutoLoginOutcome;
use cvforge_core::Config;

const USAGE: &str = "\
Usage: cvforge <command>

Commands:
  login [email] [--remember|--no-remember]   Sign in with a password prompt
  logout [--keep]                            Sign out (--keep keeps remembered login)
  open <route>                               Load a page, e.g. /dashboard
  forget                                     Turn off remember me
  status                                     Show remembered login and session";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Login {
        email: Option<String>,
        remember: Option<bool>,
    },
    Logout {
        keep: bool,
    },
    Open {
        route: String,
    },
    Forget,
    Status,
    Help,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };
    let rest = &args[1..];

    match command.as_str() {
        "login" => {
            let mut email = None;
            let mut remember = None;
            for arg in rest {
                match arg.as_str() {
                    "--remember" => remember = Some(true),
                    "--no-remember" => remember = Some(false),
                    flag if flag.starts_with("--") => bail!("Unknown flag for login: {}", flag),
                    value if email.is_none() => email = Some(value.to_string()),
                    extra => bail!("Unexpected argument: {}", extra),
                }
            }
            Ok(Command::Login { email, remember })
        }
        "logout" => match rest {
            [] => Ok(Command::Logout { keep: false }),
            [flag] if flag == "--keep" => Ok(Command::Logout { keep: true }),
            _ => bail!("Usage: cvforge logout [--keep]"),
        },
        "open" => match rest {
            [route] => Ok(Command::Open {
                route: route.clone(),
            }),
            _ => bail!("Usage: cvforge open <route>"),
        },
        "forget" => Ok(Command::Forget),
        "status" => Ok(Command::Status),
        "help" | "-h" | "--help" => Ok(Command::Help),
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

/// Initialize the tracing subscriber for logging.
/// Warnings go to stderr; everything the filter allows also goes to a
/// daily log file when a log directory is available.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cvforge.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    let log_dir = config.data_dir().ok().filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let _log_guard = init_tracing(log_dir.as_deref());
    info!(?command, "cvforge starting");

    let app = App::new(&config)?;
    app.bootstrap().await;

    let result = run(&app, command).await;
    app.shutdown();
    result
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Login { email, remember } => {
            let email = match email {
                Some(email) => email,
                None => match app.remembered_email() {
                    Some(last) => {
                        let input = prompt_line(&format!("Email [{}]: ", last))?;
                        if input.is_empty() { last } else { input }
                    }
                    None => prompt_line("Email: ")?,
                },
            };
            let password = rpassword::prompt_password("Password: ")?;
            let remember = remember.unwrap_or_else(|| app.remember_checked());

            let profile = app.login(&email, &password, remember).await?;
            println!(
                "Signed in as {}{}",
                profile.full_name.as_deref().unwrap_or(&profile.email),
                if remember { " (remembered for 30 days)" } else { "" }
            );
        }
        Command::Logout { keep } => {
            app.logout(keep).await?;
            println!("Signed out");
        }
        Command::Open { route } => match app.navigate(&route).await {
            AutoLoginOutcome::SignedIn(profile) => {
                println!("{}: signed in automatically as {}", route, profile.email);
            }
            AutoLoginOutcome::Skipped(reason) => {
                println!("{}: no automatic sign-in ({:?})", route, reason);
            }
            // Silent failures look exactly like no remembered login.
            AutoLoginOutcome::Failed { .. }
            | AutoLoginOutcome::TimedOut
            | AutoLoginOutcome::Discarded => {
                println!("{}: please sign in", route);
            }
        },
        Command::Forget => {
            app.forget();
            println!("Remember me turned off");
        }
        Command::Status => {
            let status = app.status();
            println!("Remember me:   {}", if status.remember_enabled { "on" } else { "off" });
            if let Some(email) = status.remembered_email {
                println!("Remembered:    {}", email);
            }
            if let Some(saved_at) = status.saved_at {
                println!("Saved at:      {}", saved_at.format("%Y-%m-%d %H:%M UTC"));
            }
            match status.signed_in_as {
                Some(profile) => println!(
                    "Session:       {} ({} min left{})",
                    profile.email,
                    status.minutes_until_expiry.unwrap_or(0),
                    if status.needs_refresh { ", sign in again soon" } else { "" }
                ),
                None => println!("Session:       signed out"),
            }
        }
        Command::Help => println!("{}", USAGE),
    }
    Ok(())
}
