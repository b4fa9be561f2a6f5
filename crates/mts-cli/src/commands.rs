use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::{json, Value};

use mts_server::{MetricsServer, ServerConfig, DATA_PATH_ENV};
use mts_store::TopicStore;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli { command, root, format, .. } = cli;
    match command {
        Command::Serve(args) => cmd_serve(args, root),
        Command::Create(args) => with_store(root, |s, out| cmd_create(s, &args.topic, &format, out)),
        Command::Put(args) => with_store(root, |s, out| cmd_put(s, &args, &format, out)),
        Command::Latest(args) => with_store(root, |s, out| cmd_latest(s, &args.topic, &format, out)),
        Command::Data(args) => with_store(root, |s, out| cmd_data(s, &args.topic, &format, out)),
        Command::Topics(_) => with_store(root, |s, out| cmd_topics(s, &format, out)),
    }
}

fn with_store<F>(root: Option<String>, f: F) -> anyhow::Result<()>
where
    F: FnOnce(&TopicStore, &mut io::StdoutLock<'static>) -> anyhow::Result<()>,
{
    let store = open_store(root)?;
    tracing::debug!(root = ?store.root(), "store opened");
    let mut out = io::stdout().lock();
    f(&store, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Open a store from `--root`, falling back to the environment.
fn open_store(root: Option<String>) -> anyhow::Result<TopicStore> {
    let root = root.or_else(|| std::env::var(DATA_PATH_ENV).ok().filter(|v| !v.is_empty()));
    match root {
        Some(root) => TopicStore::open(&root).with_context(|| format!("invalid store root {root:?}")),
        None => Ok(TopicStore::unconfigured()),
    }
}

fn cmd_serve(args: ServeArgs, root: Option<String>) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(Path::new(path))?,
        None => ServerConfig::default(),
    }
    .apply_env();
    if let Some(root) = root {
        config.data_root = Some(root.into());
    }
    if let Some(bind) = &args.bind {
        config.bind_addr = bind
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid bind address {bind:?}"))?;
    }
    if args.sync {
        config.sync_every_write = true;
    }

    let server = MetricsServer::new(config)?;
    println!(
        "Metrics store on {} (root: {})",
        server.config().bind_addr.to_string().bold(),
        server
            .store()
            .root()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "not configured".into())
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_create(store: &TopicStore, topic: &str, format: &OutputFormat, out: &mut impl Write) -> anyhow::Result<()> {
    store.create_topic(topic)?;
    match format {
        OutputFormat::Text => writeln!(out, "{} Created topic {}", "✓".green().bold(), topic.yellow())?,
        OutputFormat::Json => writeln!(out, "{}", json!({ "created": topic }))?,
    }
    Ok(())
}

fn cmd_put(store: &TopicStore, args: &PutArgs, format: &OutputFormat, out: &mut impl Write) -> anyhow::Result<()> {
    let value: Value = serde_json::from_str(&args.data).context("record is not valid JSON")?;
    store.append_json(&args.topic, &value)?;
    match format {
        OutputFormat::Text => writeln!(out, "{} Appended to {}", "✓".green().bold(), args.topic.yellow())?,
        OutputFormat::Json => writeln!(out, "{}", json!({ "topic": args.topic, "appended": value }))?,
    }
    Ok(())
}

fn cmd_latest(store: &TopicStore, topic: &str, format: &OutputFormat, out: &mut impl Write) -> anyhow::Result<()> {
    let record = store.read_last(topic)?;
    match format {
        OutputFormat::Text => {
            out.write_all(&record)?;
            writeln!(out)?;
        }
        OutputFormat::Json => {
            writeln!(out, "{}", json!({ "topic": topic, "latest": parse_record(&record) }))?
        }
    }
    Ok(())
}

fn cmd_data(store: &TopicStore, topic: &str, format: &OutputFormat, out: &mut impl Write) -> anyhow::Result<()> {
    let mut reader = store.read_all(topic)?;
    match format {
        OutputFormat::Text => {
            io::copy(&mut reader, out)?;
        }
        OutputFormat::Json => {
            let records = reader
                .records()
                .map(|line| line.map(|l| parse_record(&l)))
                .collect::<io::Result<Vec<_>>>()?;
            writeln!(out, "{}", json!({ "topic": topic, "records": records }))?;
        }
    }
    Ok(())
}

fn cmd_topics(store: &TopicStore, format: &OutputFormat, out: &mut impl Write) -> anyhow::Result<()> {
    let topics = store.list_topics()?;
    match format {
        OutputFormat::Text if topics.is_empty() => writeln!(out, "No topics.")?,
        OutputFormat::Text => {
            for topic in &topics {
                writeln!(out, "{topic}")?;
            }
        }
        OutputFormat::Json => writeln!(out, "{}", json!({ "topics": topics }))?,
    }
    Ok(())
}

/// Records are JSON by convention; anything else is shown as a string.
fn parse_record(record: &[u8]) -> Value {
    serde_json::from_slice(record)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(record).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> anyhow::Result<()>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn temp_store() -> (tempfile::TempDir, TopicStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TopicStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn create_put_latest_json() {
        let (_dir, store) = temp_store();
        let fmt = OutputFormat::Json;

        let created = run(|out| cmd_create(&store, "cpu", &fmt, out));
        assert_eq!(created.trim(), r#"{"created":"cpu"}"#);

        let put = PutArgs { topic: "cpu".into(), data: r#"{ "v": 3 }"#.into() };
        run(|out| cmd_put(&store, &put, &fmt, out));

        let latest = run(|out| cmd_latest(&store, "cpu", &fmt, out));
        let value: Value = serde_json::from_str(&latest).unwrap();
        assert_eq!(value["latest"], json!({ "v": 3 }));
    }

    #[test]
    fn data_text_streams_raw_lines() {
        let (_dir, store) = temp_store();
        store.create_topic("mem").unwrap();
        store.append("mem", b"1").unwrap();
        store.append("mem", b"2").unwrap();

        let data = run(|out| cmd_data(&store, "mem", &OutputFormat::Text, out));
        assert_eq!(data, "1\n2\n");
    }

    #[test]
    fn data_json_parses_records() {
        let (_dir, store) = temp_store();
        store.create_topic("mem").unwrap();
        store.append("mem", br#"{"v":1}"#).unwrap();
        store.append("mem", b"raw text").unwrap();

        let data = run(|out| cmd_data(&store, "mem", &OutputFormat::Json, out));
        let value: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(value["records"], json!([{ "v": 1 }, "raw text"]));
    }

    #[test]
    fn topics_text_lists_sorted_names() {
        let (_dir, store) = temp_store();
        assert_eq!(run(|out| cmd_topics(&store, &OutputFormat::Text, out)), "No topics.\n");

        store.create_topic("net").unwrap();
        store.create_topic("cpu").unwrap();
        assert_eq!(run(|out| cmd_topics(&store, &OutputFormat::Text, out)), "cpu\nnet\n");
    }

    #[test]
    fn put_rejects_invalid_json() {
        let (_dir, store) = temp_store();
        store.create_topic("cpu").unwrap();

        let put = PutArgs { topic: "cpu".into(), data: "{oops".into() };
        let mut out = Vec::new();
        assert!(cmd_put(&store, &put, &OutputFormat::Text, &mut out).is_err());
        assert!(store.read_all("cpu").unwrap().is_empty());
    }

    #[test]
    fn unconfigured_store_reports_error() {
        let store = TopicStore::unconfigured();
        let mut out = Vec::new();
        let err = cmd_topics(&store, &OutputFormat::Text, &mut out).unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn open_store_with_explicit_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(Some(dir.path().display().to_string())).unwrap();
        assert!(store.root().is_some());
    }
}
