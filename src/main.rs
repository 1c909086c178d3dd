use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{Local, NaiveDate};

use taskline::config::{self, TasklineConfig};
use taskline::github::GitHubGateway;
use taskline::recur::apply_recurring;
use taskline::remind;
use taskline::sync::{CursorStore, Reconciler};
use taskline::todos::codec::parse_date;
use taskline::todos::{TaskRecord, TodoStore, parse};

const USAGE: &str = "\
Usage: taskline <command> [args]

Commands:
  add <task line>          Add a task (creation date stamped today)
  list                     List open tasks
  done <n>                 Complete the n-th open task
  recur [YYYY-MM-DD]       Generate recurring tasks for a date (default today)
  remind [YYYY-MM-DD]      Promote due reminders (default today)
  remind add <task line>   Add a reminder (needs remind:YYYY-MM-DD)
  remind list              List pending reminders by date
  sync [source]            Sync one GitHub source, or all of them

Environment:
  TASKLINE_DIR   root directory (default ~/.taskline)
  GITHUB_TOKEN   token used by sync
  RUST_LOG       log filter (default info)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{USAGE}");
        return Ok(());
    };
    let rest = &args[1..];

    let root = config::root_dir_from_env()?;
    let store = TodoStore::new(config::todo_dir(&root));
    let today = Local::now().date_naive();

    match command.as_str() {
        "add" => {
            let line = rest.join(" ");
            if line.trim().is_empty() {
                bail!("nothing to add");
            }
            let record = store.add(parse(&line), today).await?;
            println!("{record}");
        }
        "list" => {
            let records = store.load().await?;
            print_numbered(records.iter().filter(|r| !r.done));
        }
        "done" => {
            let index: usize = rest
                .first()
                .context("usage: taskline done <n>")?
                .parse()
                .context("task number must be a positive integer")?;
            let record = store.complete(index, today).await?;
            println!("{record}");
        }
        "recur" => {
            let date = date_arg(rest.first(), today)?;
            let added = apply_recurring(&store, date).await?;
            for record in &added {
                println!("{record}");
            }
            eprintln!("{} recurring task(s) added for {date}", added.len());
        }
        "remind" => match rest.first().map(String::as_str) {
            Some("add") => {
                let line = rest[1..].join(" ");
                let reminder = remind::add_reminder(&store, parse(&line)).await?;
                println!("{reminder}");
            }
            Some("list") => {
                let mut pending = remind::load_reminders(&store).await?;
                remind::sort_by_remind_date(&mut pending);
                print_numbered(pending.iter());
            }
            other => {
                let date = date_arg(other.map(String::from).as_ref(), today)?;
                let promoted = remind::process(&store, date).await?;
                for record in &promoted {
                    println!("{record}");
                }
                eprintln!("{} reminder(s) promoted for {date}", promoted.len());
            }
        },
        "sync" => {
            let cfg = TasklineConfig::load(&root).await?;
            let token = config::github_token_from_env()?;
            let gateway = GitHubGateway::new(&cfg.github, token)?;
            let reconciler =
                Reconciler::new(Arc::new(gateway), store, CursorStore::in_dir(&root));

            let reports = match rest.first() {
                Some(name) => vec![reconciler.sync(cfg.source(name)?, today).await?],
                None => {
                    if cfg.github.sources.is_empty() {
                        bail!("no [[github.sources]] configured in {}", root.join(config::CONFIG_FILE).display());
                    }
                    reconciler.sync_all(&cfg.github.sources, today).await?
                }
            };
            for report in reports {
                eprintln!(
                    "{}: {} created, {} updated, {} closed remotely",
                    report.source, report.created, report.updated, report.pushed
                );
            }
        }
        "help" | "-h" | "--help" => eprintln!("{USAGE}"),
        other => {
            eprintln!("{USAGE}");
            bail!("unknown command: {other}");
        }
    }

    Ok(())
}

fn date_arg(arg: Option<&String>, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    match arg {
        Some(s) => parse_date(s).with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD")),
        None => Ok(today),
    }
}

fn print_numbered<'a>(records: impl Iterator<Item = &'a TaskRecord>) {
    for (i, record) in records.enumerate() {
        println!("{:>3} {record}", i + 1);
    }
}
