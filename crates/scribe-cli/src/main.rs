//! `scribe`: drive authoring sessions from the command line
//!
//! Sessions live as JSON files under `--store`; every command loads the
//! session, runs one orchestrator operation and writes it back.

use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use scribe_core::{FileSessionStore, Orchestrator, ProcessAdapter, ScribeConfig, SessionId};
use scribe_reconcile::{DiffKind, DiffView};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let id = || Arg::new("id").required(true).help("Session id");
    let index = || {
        Arg::new("index")
            .required(true)
            .value_parser(value_parser!(usize))
            .help("Index into the current diff")
    };

    Command::new("scribe")
        .version(scribe_core::VERSION)
        .about("Conversational document authoring with reviewed merges")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML config file"),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .global(true)
                .default_value(".scribe/sessions")
                .value_parser(value_parser!(PathBuf))
                .help("Session directory"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("new")
                .about("Start a session")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .value_parser(value_parser!(PathBuf))
                        .help("Initial document (default: empty)"),
                ),
        )
        .subcommand(Command::new("list").about("List sessions"))
        .subcommand(
            Command::new("turn").about("Send one message").arg(id()).arg(
                Arg::new("message")
                    .required(true)
                    .num_args(1..)
                    .help("Message text"),
            ),
        )
        .subcommand(Command::new("show").about("Show session state as JSON").arg(id()))
        .subcommand(
            Command::new("diff").about("Show the pending proposal").arg(id()).arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Output as JSON"),
            ),
        )
        .subcommand(Command::new("accept-line").about("Accept one diff line").arg(id()).arg(index()))
        .subcommand(Command::new("reject-line").about("Reject one diff line").arg(id()).arg(index()))
        .subcommand(Command::new("accept-hunk").about("Accept one hunk").arg(id()).arg(index()))
        .subcommand(Command::new("reject-hunk").about("Reject one hunk").arg(id()).arg(index()))
        .subcommand(Command::new("accept-all").about("Accept the proposal verbatim").arg(id()))
        .subcommand(Command::new("reject-all").about("Discard the proposal").arg(id()))
        .subcommand(
            Command::new("finalize")
                .about("Commit the merge (default: the current working copy)")
                .arg(id())
                .arg(
                    Arg::new("file")
                        .long("file")
                        .value_parser(value_parser!(PathBuf))
                        .help("Commit this file instead"),
                ),
        )
        .subcommand(Command::new("undo").about("Undo the last line or hunk operation").arg(id()))
        .subcommand(Command::new("delete").about("Delete a session").arg(id()))
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

fn session_id(args: &ArgMatches) -> Result<SessionId> {
    let raw = args
        .get_one::<String>("id")
        .ok_or_else(|| anyhow!("missing session id"))?;
    raw.parse::<SessionId>()
        .with_context(|| format!("invalid session id `{raw}`"))
}

fn index(args: &ArgMatches) -> Result<usize> {
    args.get_one::<usize>("index")
        .copied()
        .ok_or_else(|| anyhow!("missing index"))
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_diff(view: &DiffView) {
    if !view.has_pending_proposal {
        println!("No pending proposal.");
        return;
    }
    for (idx, line) in view.lines.iter().enumerate() {
        let marker = match line.kind {
            DiffKind::Added => '+',
            DiffKind::Removed => '-',
            DiffKind::Unchanged => ' ',
        };
        println!("{idx:>4} {marker} {}", line.text);
    }
    println!();
    for (idx, hunk) in view.hunks.iter().enumerate() {
        println!("hunk {idx}: {}", hunk.header());
    }
    if view.can_undo {
        println!("(undo available)");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ScribeConfig::load(path)?,
        None => ScribeConfig::default(),
    };
    let store_dir = matches
        .get_one::<PathBuf>("store")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(".scribe/sessions"));
    let store = FileSessionStore::open(&store_dir)
        .await
        .with_context(|| format!("failed to open store {}", store_dir.display()))?;
    tracing::debug!(store = %store_dir.display(), "store opened");
    let adapter = ProcessAdapter::new(config.adapter.clone());
    let orch = Orchestrator::new(config, Arc::new(store), Arc::new(adapter));

    match matches.subcommand() {
        Some(("new", args)) => {
            let initial = match args.get_one::<PathBuf>("file") {
                Some(path) => read_file(path)?,
                None => String::new(),
            };
            println!("{}", orch.create_session(&initial).await?);
        }
        Some(("list", _)) => {
            for id in orch.list().await? {
                println!("{id}");
            }
        }
        Some(("turn", args)) => {
            let id = session_id(args)?;
            let message = args
                .get_many::<String>("message")
                .map(|words| words.cloned().collect::<Vec<_>>().join(" "))
                .unwrap_or_default();
            let result = orch.submit_turn(id, &message).await?;
            println!("{}", result.reply);
            if result.has_pending_proposal {
                println!("\n[proposal pending: run `scribe diff {id}`]");
            }
        }
        Some(("show", args)) => {
            let snapshot = orch.snapshot(session_id(args)?).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Some(("diff", args)) => {
            let view = orch.get_diff(session_id(args)?).await?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_diff(&view);
            }
        }
        Some(("accept-line", args)) => print_diff(&orch.accept_line(session_id(args)?, index(args)?).await?),
        Some(("reject-line", args)) => print_diff(&orch.reject_line(session_id(args)?, index(args)?).await?),
        Some(("accept-hunk", args)) => print_diff(&orch.accept_hunk(session_id(args)?, index(args)?).await?),
        Some(("reject-hunk", args)) => print_diff(&orch.reject_hunk(session_id(args)?, index(args)?).await?),
        Some(("undo", args)) => print_diff(&orch.undo(session_id(args)?).await?),
        Some(("accept-all", args)) => {
            let outcome = orch.accept_all(session_id(args)?).await?;
            println!("ok ({outcome:?})");
        }
        Some(("reject-all", args)) => {
            let outcome = orch.reject_all(session_id(args)?).await?;
            println!("ok ({outcome:?})");
        }
        Some(("finalize", args)) => {
            let id = session_id(args)?;
            let merged = match args.get_one::<PathBuf>("file") {
                Some(path) => read_file(path)?,
                None => orch.get_diff(id).await?.working_text,
            };
            let hash = orch.finalize(id, &merged).await?;
            println!("ok ({})", hash.short());
        }
        Some(("delete", args)) => {
            let id = session_id(args)?;
            if orch.delete(id).await? {
                println!("deleted {id}");
            } else {
                println!("no session {id}");
            }
        }
        _ => return Err(anyhow!("unknown command")),
    }
    Ok(())
}
