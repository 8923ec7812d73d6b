//! `prefsync` - read and change notification preferences from a terminal

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::Utc;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use prefsync_core::{LoadState, SettingsSession, SyncConfig};
use prefsync_identity::{HostContext, HostEnvironment, HostError};
use prefsync_model::{format_snoozed_until, DiagnosticLog, TimeOfDay};
use prefsync_store::{
    FileConfigSource, HttpPreferencesStore, RuntimeConfigSource, StaticConfigSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Host backed by command-line flags
struct StaticHost {
    user_id: Option<String>,
    token: Option<String>,
}

#[async_trait]
impl HostEnvironment for StaticHost {
    async fn initialize(&self) -> Result<(), HostError> {
        Ok(())
    }

    async fn context(&self) -> Result<HostContext, HostError> {
        Ok(HostContext {
            user_id: self.user_id.clone(),
            ..HostContext::default()
        })
    }

    async fn request_token(&self) -> Result<String, HostError> {
        self.token
            .clone()
            .ok_or_else(|| HostError::new("no --user-id or --token supplied"))
    }
}

fn cli() -> Command {
    Command::new("prefsync")
        .version(prefsync_core::VERSION)
        .about("Notification preference synchroniser")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Runtime config document (JSON with API_BASE_URL)"),
        )
        .arg(
            Arg::new("api-base")
                .long("api-base")
                .global(true)
                .help("API base URL, overrides --config"),
        )
        .arg(
            Arg::new("user-id")
                .long("user-id")
                .global(true)
                .help("User object id"),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .global(true)
                .help("Identity token carrying the subject claim"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .arg(
            Arg::new("show-log")
                .long("show-log")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print the diagnostic log on exit"),
        )
        .subcommand(Command::new("show").about("Show current preferences"))
        .subcommand(
            Command::new("notifications")
                .about("Turn all alerts on or off")
                .arg(
                    Arg::new("state")
                        .required(true)
                        .value_parser(["on", "off"]),
                ),
        )
        .subcommand(
            Command::new("dnd")
                .about("Set or disable quiet hours")
                .arg(
                    Arg::new("from")
                        .long("from")
                        .value_parser(value_parser!(TimeOfDay))
                        .requires("to")
                        .help("Start, HH:MM"),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .value_parser(value_parser!(TimeOfDay))
                        .requires("from")
                        .help("End, HH:MM"),
                )
                .arg(
                    Arg::new("off")
                        .long("off")
                        .action(ArgAction::SetTrue)
                        .conflicts_with_all(["from", "to"])
                        .help("Disable quiet hours"),
                ),
        )
        .subcommand(
            Command::new("snooze")
                .about("Pause all alerts for a number of hours")
                .arg(
                    Arg::new("hours")
                        .long("hours")
                        .value_parser(value_parser!(u32).range(1..))
                        .help("Snooze length (1, 4 and 24 are the usual presets)"),
                )
                .arg(
                    Arg::new("clear")
                        .long("clear")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("hours")
                        .help("Remove the snooze"),
                ),
        )
        .subcommand(Command::new("options").about("List the quiet-hours selector values"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn config_source(matches: &ArgMatches) -> Box<dyn RuntimeConfigSource> {
    if let Some(base) = matches.get_one::<String>("api-base") {
        return Box::new(StaticConfigSource::new(Some(base.clone())));
    }
    match matches.get_one::<PathBuf>("config") {
        Some(path) => Box::new(FileConfigSource::new(path.clone())),
        None => Box::new(StaticConfigSource::default()),
    }
}

fn print_preferences(session: &SettingsSession<HttpPreferencesStore>) {
    let draft = session.draft();
    println!("User:          {}", session.user_id());
    println!(
        "Notifications: {}",
        if draft.notifications_enabled { "on" } else { "off" }
    );
    if draft.dnd.enabled {
        println!("Quiet hours:   {} - {}", draft.dnd.start, draft.dnd.end);
    } else {
        println!("Quiet hours:   off");
    }
    match draft.snoozed_until {
        Some(until) if until > Utc::now() => {
            println!("Snoozed until: {}", format_snoozed_until(until));
        }
        _ => println!("Snoozed until: not snoozed"),
    }
    if let LoadState::Defaults { reason } = session.load_state() {
        println!("(showing defaults: {reason})");
    }
}

async fn run(matches: &ArgMatches, session: &SettingsSession<HttpPreferencesStore>) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => print_preferences(session),
        Some(("notifications", args)) => {
            let enabled = args.get_one::<String>("state").is_some_and(|s| s == "on");
            session.set_notifications_enabled(enabled);
            if session.can_save_notifications() {
                session.save_notifications().await?;
                println!("Notifications turned {}", if enabled { "on" } else { "off" });
            } else {
                println!("Notifications already {}", if enabled { "on" } else { "off" });
            }
        }
        Some(("dnd", args)) => {
            if args.get_flag("off") {
                session.set_dnd_enabled(false);
            } else {
                let (Some(from), Some(to)) = (
                    args.get_one::<TimeOfDay>("from"),
                    args.get_one::<TimeOfDay>("to"),
                ) else {
                    bail!("pass --from and --to, or --off");
                };
                session.set_dnd_window(*from, *to);
                session.set_dnd_enabled(true);
            }
            session.save_dnd().await?;
            print_preferences(session);
        }
        Some(("snooze", args)) => {
            if args.get_flag("clear") {
                session.clear_snooze();
            } else {
                let hours = args
                    .get_one::<u32>("hours")
                    .copied()
                    .context("pass --hours N or --clear")?;
                session.snooze_for(hours);
            }
            session.save_snooze().await?;
            print_preferences(session);
        }
        _ => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    if matches.subcommand_name() == Some("options") {
        for option in TimeOfDay::hourly_options() {
            println!("{option}");
        }
        return Ok(());
    }

    let host = StaticHost {
        user_id: matches.get_one::<String>("user-id").cloned(),
        token: matches.get_one::<String>("token").cloned(),
    };
    let source = config_source(&matches);
    let log = Arc::new(DiagnosticLog::new());

    let opened =
        SettingsSession::open_http(&SyncConfig::new(), source.as_ref(), &host, Arc::clone(&log)).await;
    let result = match opened {
        Ok(session) => {
            tracing::debug!(session = %session.id(), base = %session.api_base(), "session ready");
            let outcome = run(&matches, &session).await;
            session.close();
            outcome
        }
        Err(e) => Err(e).context("could not open settings session"),
    };

    if matches.get_flag("show-log") {
        eprintln!("{}", log.render());
    }
    result
}
