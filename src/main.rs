//! simple-inotify - watch paths and print filesystem events
//!
//! Entry point for the command-line watcher.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::ffi::OsString;
use std::io::Write;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use simple_inotify::observability::{init_tracing, spans};
use simple_inotify::{mask, Backend, Config, Event, Inotify, Result};
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tracing::Instrument;

/// simple-inotify - watch paths and print filesystem events
#[derive(Parser, Debug)]
#[command(name = "simple-inotify")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Paths to watch (falls back to `SIMPLE_INOTIFY_PATHS`, `:`-separated)
    paths: Vec<PathBuf>,

    /// Events to watch for (e.g. modify,create,delete or all_events)
    #[arg(
        short,
        long,
        env = "SIMPLE_INOTIFY_EVENTS",
        value_delimiter = ',',
        default_value = "all_events"
    )]
    events: Vec<String>,

    /// Remove each watch after its first event
    #[arg(long)]
    oneshot: bool,

    /// Only watch directories
    #[arg(long)]
    only_dir: bool,

    /// Do not follow symlinks
    #[arg(long)]
    dont_follow: bool,

    /// Bytes requested per read
    #[arg(long, env = "SIMPLE_INOTIFY_READ_SIZE", default_value = "4096")]
    read_size: usize,

    /// Exit after this many events
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SIMPLE_INOTIFY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "SIMPLE_INOTIFY_LOG_JSON")]
    log_json: bool,
}

/// Environment variable listing paths when none are given on the command line.
const PATHS_ENV: &str = "SIMPLE_INOTIFY_PATHS";

/// Positional paths win; otherwise split `env` the way `PATH` is split.
fn watch_paths(positional: Vec<PathBuf>, env: Option<OsString>) -> Vec<PathBuf> {
    if !positional.is_empty() {
        return positional;
    }
    env.map(|value| std::env::split_paths(&value).collect())
        .unwrap_or_default()
}

/// Borrowed queue descriptor registered with the tokio reactor.
struct QueueFd(RawFd);

impl AsRawFd for QueueFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

/// One line of JSON output.
#[derive(Serialize)]
struct EventRecord<'a> {
    time: DateTime<Utc>,
    path: Option<PathBuf>,
    events: Vec<&'static str>,
    #[serde(flatten)]
    event: &'a Event,
}

fn print_event<B: Backend>(
    out: &mut impl Write,
    inotify: &Inotify<B>,
    event: &Event,
    json: bool,
) -> Result<()> {
    let path = inotify.event_path(event);
    if json {
        let record = EventRecord {
            time: Utc::now(),
            path,
            events: mask::names(event.mask),
            event,
        };
        let line = serde_json::to_string(&record).map_err(std::io::Error::from)?;
        writeln!(out, "{line}")?;
    } else {
        let shown = path.map_or_else(|| format!("wd={}", event.wd), |p| p.display().to_string());
        writeln!(
            out,
            "{shown} {} cookie={}",
            mask::describe(event.mask),
            event.cookie
        )?;
    }
    Ok(())
}

/// What the watch loop does after a batch of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Print a batch of events in order, retire watches the kernel dropped, and
/// decide whether to keep going.
///
/// Stops once `limit` events have been seen in total, or when no watches
/// remain.
fn handle_events<B: Backend>(
    out: &mut impl Write,
    inotify: &mut Inotify<B>,
    events: &[Event],
    json: bool,
    seen: &mut u64,
    limit: Option<u64>,
) -> Result<Flow> {
    for event in events {
        if event.is_overflow() {
            tracing::warn!("Event queue overflowed, events were lost");
        }
        print_event(out, inotify, event, json)?;
        if event.is_ignored() {
            inotify.remove_watch(event.wd);
        }

        *seen += 1;
        if limit.is_some_and(|limit| *seen >= limit) {
            tracing::info!(seen = *seen, "Event limit reached");
            return Ok(Flow::Stop);
        }
    }

    if inotify.watches().is_empty() {
        tracing::info!("No watches remain");
        return Ok(Flow::Stop);
    }
    Ok(Flow::Continue)
}

/// Wait for readiness, then read, print and react to events until told to stop.
async fn watch<B: Backend>(
    inotify: &mut Inotify<B>,
    fd: RawFd,
    config: &Config,
    json: bool,
) -> Result<()> {
    let async_fd = AsyncFd::with_interest(QueueFd(fd), Interest::READABLE)?;

    let mut buf = vec![0u8; config.read_size];
    let mut seen: u64 = 0;
    let mut stdout = std::io::stdout().lock();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    'watch: loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Interrupted, shutting down");
                break 'watch;
            }
            guard = async_fd.readable() => {
                let mut guard = guard?;
                let events = inotify.read_events_with(&mut buf)?;
                if events.is_empty() {
                    guard.clear_ready();
                    continue 'watch;
                }

                let flow = handle_events(
                    &mut stdout,
                    inotify,
                    &events,
                    json,
                    &mut seen,
                    config.count,
                )?;
                stdout.flush()?;
                if flow == Flow::Stop {
                    break 'watch;
                }
            }
        }
    }

    stdout.flush()?;
    drop(async_fd);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    tracing::info!(
        "simple-inotify v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config {
        paths: watch_paths(cli.paths, std::env::var_os(PATHS_ENV)),
        events: cli.events,
        oneshot: cli.oneshot,
        only_dir: cli.only_dir,
        dont_follow: cli.dont_follow,
        read_size: cli.read_size,
        log_level: cli.log_level,
        count: cli.count,
    };

    tracing::debug!(?config, "Configuration loaded");
    config.validate()?;
    let watch_mask = config.watch_mask()?;

    let mut inotify = Inotify::open(config.init_flags())?;
    for path in &config.paths {
        let _span = spans::watch_span(path).entered();
        let wd = inotify.add_watch(path, watch_mask)?;
        tracing::info!(wd, "Watching path");
    }

    let Some(fd) = inotify.fileno() else {
        return Ok(());
    };
    let span = spans::session_span(fd, inotify.watches().len());
    watch(&mut inotify, fd, &config, cli.json)
        .instrument(span)
        .await?;

    let stats = inotify.stats();
    tracing::info!(
        events = stats.events_decoded,
        reads = stats.reads,
        watches_added = stats.watches_added,
        watches_removed = stats.watches_removed,
        "Watcher stopped"
    );
    inotify.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_inotify::mask::{IN_CREATE, IN_IGNORED, IN_ISDIR, IN_MODIFY, IN_MOVED_TO};
    use simple_inotify::EventName;
    use std::io;
    use std::path::Path;

    /// Hands out sequential descriptors and accepts everything else.
    #[derive(Debug, Default)]
    struct StubKernel {
        next_wd: i32,
        removed: Vec<i32>,
    }

    impl Backend for StubKernel {
        fn init(&mut self, _flags: i32) -> io::Result<RawFd> {
            Ok(3)
        }

        fn add_watch(&mut self, _fd: RawFd, _path: &Path, _mask: u32) -> io::Result<i32> {
            self.next_wd += 1;
            Ok(self.next_wd)
        }

        fn rm_watch(&mut self, _fd: RawFd, wd: i32) -> io::Result<()> {
            self.removed.push(wd);
            Ok(())
        }

        fn read(&mut self, _fd: RawFd, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::WouldBlock))
        }

        fn close(&mut self, _fd: RawFd) -> io::Result<()> {
            Ok(())
        }
    }

    fn event(wd: i32, mask: u32, cookie: u32, name: Option<&str>) -> Event {
        Event {
            wd,
            mask,
            cookie,
            len: 16,
            name: name.map(|n| EventName::Text(n.to_string())),
        }
    }

    fn session_watching(paths: &[&str]) -> Inotify<StubKernel> {
        let mut inotify = Inotify::with_backend(StubKernel::default(), 0).unwrap();
        for path in paths {
            inotify.add_watch(path, IN_MODIFY).unwrap();
        }
        inotify
    }

    fn render(inotify: &Inotify<StubKernel>, event: &Event, json: bool) -> String {
        let mut out = Vec::new();
        print_event(&mut out, inotify, event, json).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_cli_keeps_commas_in_paths() {
        let cli = Cli::try_parse_from(["simple-inotify", "/tmp/report,final.txt", "/srv"]).unwrap();
        assert_eq!(
            cli.paths,
            vec![PathBuf::from("/tmp/report,final.txt"), PathBuf::from("/srv")]
        );
    }

    #[test]
    fn test_cli_events_are_comma_separated() {
        let cli = Cli::try_parse_from(["simple-inotify", "-e", "create,delete", "/srv"]).unwrap();
        assert_eq!(cli.events, vec!["create".to_string(), "delete".to_string()]);
    }

    #[test]
    fn test_watch_paths_prefers_positional() {
        let paths = watch_paths(
            vec![PathBuf::from("/a,b")],
            Some(OsString::from("/x:/y")),
        );
        assert_eq!(paths, vec![PathBuf::from("/a,b")]);
    }

    #[test]
    fn test_watch_paths_splits_env_on_colon() {
        let paths = watch_paths(Vec::new(), Some(OsString::from("/var/log:/tmp/a,b")));
        assert_eq!(
            paths,
            vec![PathBuf::from("/var/log"), PathBuf::from("/tmp/a,b")]
        );
        assert!(watch_paths(Vec::new(), None).is_empty());
    }

    #[test]
    fn test_text_line_with_child_name() {
        let inotify = session_watching(&["/srv/app"]);
        let line = render(&inotify, &event(1, IN_CREATE | IN_ISDIR, 0, Some("logs")), false);
        insta::assert_snapshot!(line.trim_end(), @"/srv/app/logs CREATE|ISDIR cookie=0");
    }

    #[test]
    fn test_text_line_for_unknown_descriptor() {
        let inotify = session_watching(&[]);
        let line = render(&inotify, &event(7, IN_MOVED_TO, 42, Some("x")), false);
        insta::assert_snapshot!(line.trim_end(), @"wd=7 MOVED_TO cookie=42");
    }

    #[test]
    fn test_json_record_shape() {
        let inotify = session_watching(&["/srv/app"]);
        let line = render(&inotify, &event(1, IN_MODIFY, 0, Some("a.txt")), true);
        assert!(line.ends_with('\n'));

        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert!(value["time"].is_string());
        assert_eq!(value["path"], "/srv/app/a.txt");
        assert_eq!(value["events"], serde_json::json!(["MODIFY"]));
        assert_eq!(value["wd"], 1);
        assert_eq!(value["mask"], IN_MODIFY);
        assert_eq!(value["cookie"], 0);
        assert_eq!(value["len"], 16);
        assert_eq!(value["name"], "a.txt");
    }

    #[test]
    fn test_ignored_event_retires_watch() {
        let mut inotify = session_watching(&["/a", "/b"]);
        let mut out = Vec::new();
        let mut seen = 0;

        let flow = handle_events(
            &mut out,
            &mut inotify,
            &[event(1, IN_IGNORED, 0, None)],
            false,
            &mut seen,
            None,
        )
        .unwrap();

        assert_eq!(flow, Flow::Continue);
        assert_eq!(inotify.resolve(1), None);
        assert_eq!(inotify.resolve(2), Some(Path::new("/b")));
        assert_eq!(seen, 1);
        // The line is printed while the path still resolves.
        assert_eq!(String::from_utf8(out).unwrap(), "/a IGNORED cookie=0\n");
    }

    #[test]
    fn test_stops_when_no_watches_remain() {
        let mut inotify = session_watching(&["/a"]);
        let mut seen = 0;

        let flow = handle_events(
            &mut io::sink(),
            &mut inotify,
            &[event(1, IN_MODIFY, 0, None), event(1, IN_IGNORED, 0, None)],
            false,
            &mut seen,
            None,
        )
        .unwrap();

        assert_eq!(flow, Flow::Stop);
        assert!(inotify.watches().is_empty());
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_stops_at_event_limit_across_batches() {
        let mut inotify = session_watching(&["/a"]);
        let mut out = Vec::new();
        let mut seen = 0;
        let batch = [event(1, IN_MODIFY, 0, Some("x")), event(1, IN_MODIFY, 0, Some("y"))];

        let first = handle_events(&mut out, &mut inotify, &batch, false, &mut seen, Some(3)).unwrap();
        assert_eq!(first, Flow::Continue);

        let second =
            handle_events(&mut out, &mut inotify, &batch, false, &mut seen, Some(3)).unwrap();
        assert_eq!(second, Flow::Stop);
        assert_eq!(seen, 3);

        // The event past the limit is not printed.
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.lines().last(), Some("/a/x MODIFY cookie=0"));
    }
}
