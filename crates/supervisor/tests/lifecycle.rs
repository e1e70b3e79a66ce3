#![forbid(unsafe_code)]
#![cfg(unix)]

use config::Config;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use store::{FlatFileStore, SettingsStore};
use supervisor::{LogEvent, LogMessage, LogSink, ServerCommand, ServerStatus, Stream, Supervisor, Timings};
use tempfile::{TempDir, tempdir};

#[derive(Debug, Default)]
struct Recorder {
    events: Mutex<Vec<LogEvent>>,
}

impl Recorder {
    fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    fn output(&self, stream: Stream) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LogEvent::Output(LogMessage { stream: s, text }) if s == stream => Some(text),
                _ => None,
            })
            .collect()
    }

    fn notices(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LogEvent::Notice(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn position(&self, predicate: impl Fn(&LogEvent) -> bool) -> Option<usize> {
        self.events().iter().position(predicate)
    }
}

impl LogSink for Recorder {
    fn emit(&self, event: LogEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct Fixture {
    dir: TempDir,
    store: Arc<FlatFileStore>,
    recorder: Arc<Recorder>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let base = fs::canonicalize(dir.path()).unwrap();
        let store = Arc::new(FlatFileStore::new(Config::default().layout(&base)));
        store.initialize();
        Self {
            dir,
            store,
            recorder: Arc::new(Recorder::default()),
        }
    }

    fn base(&self) -> PathBuf {
        fs::canonicalize(self.dir.path()).unwrap()
    }

    fn supervisor(&self, script: &str) -> Supervisor {
        self.supervisor_with(script, fast_timings())
    }

    fn supervisor_with(&self, script: &str, timings: Timings) -> Supervisor {
        let command = ServerCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".into(), script.into()],
            folder_env_var: "LANSHARE_SERVE_FOLDER".into(),
            working_dir: self.base(),
        };
        let store: Arc<dyn SettingsStore> = self.store.clone();
        Supervisor::new(command, store, self.store.layout().default_folder.clone())
            .with_timings(timings)
            .with_sink(self.recorder.clone())
    }
}

fn fast_timings() -> Timings {
    Timings {
        grace_period: Duration::from_millis(300),
        stop_timeout: Duration::from_secs(2),
        reader_join_timeout: Duration::from_millis(500),
    }
}

/// Drain until `count` output lines arrived or two seconds passed.
async fn drain_until(supervisor: &mut Supervisor, recorder: &Recorder, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        supervisor.drain_log_queue();
        let seen = recorder.output(Stream::Out).len() + recorder.output(Stream::Err).len();
        if seen >= count || Instant::now() > deadline {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn process_exists(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[tokio::test]
async fn immediate_exit_is_a_failed_start_with_output_first() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("echo hello; exit 3");

    assert!(!supervisor.start().await);

    let recorder = &fixture.recorder;
    let hello = recorder
        .position(|e| *e == LogEvent::Output(LogMessage::new(Stream::Out, "hello")))
        .expect("stdout line was not forwarded");
    let failure = recorder
        .position(|e| matches!(e, LogEvent::Notice(text) if text.contains("exited unexpectedly")))
        .expect("failure notice missing");
    assert!(hello < failure);
    assert_eq!(
        recorder.events()[failure],
        LogEvent::Notice("Server failed to start or exited unexpectedly (exit code 3).".into())
    );
    assert_eq!(supervisor.status(), ServerStatus::Stopped);
}

#[tokio::test]
async fn second_start_is_rejected_and_leaves_first_process_alone() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("exec sleep 30");

    assert!(supervisor.start().await);
    let pid = supervisor.pid().unwrap();

    assert!(!supervisor.start().await);
    assert_eq!(supervisor.status(), ServerStatus::Running);
    assert_eq!(supervisor.pid(), Some(pid));
    assert!(process_exists(pid));
    assert!(
        fixture
            .recorder
            .notices()
            .contains(&"Server is already running.".to_string())
    );

    supervisor.stop().await;
    assert_eq!(supervisor.status(), ServerStatus::Stopped);
}

#[tokio::test]
async fn stop_without_server_is_a_noop() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("exec sleep 30");

    supervisor.stop().await;
    supervisor.stop().await;

    assert_eq!(supervisor.status(), ServerStatus::Stopped);
    assert_eq!(supervisor.drain_log_queue(), 0);
    assert!(
        fixture
            .recorder
            .notices()
            .iter()
            .all(|n| n == "Server process is not running.")
    );
}

#[tokio::test]
async fn cooperative_server_terminates_gracefully() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("exec sleep 30");

    assert!(supervisor.start().await);
    let pid = supervisor.pid().unwrap();
    let started = Instant::now();
    supervisor.stop().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!process_exists(pid));
    assert!(
        fixture
            .recorder
            .notices()
            .contains(&"Server terminated gracefully.".to_string())
    );
}

#[tokio::test]
async fn stubborn_server_is_killed_after_timeout() {
    let fixture = Fixture::new();
    let timings = Timings {
        stop_timeout: Duration::from_millis(400),
        ..fast_timings()
    };
    let mut supervisor =
        fixture.supervisor_with("trap '' TERM; echo ready; while :; do sleep 0.1; done", timings);

    assert!(supervisor.start().await);
    let pid = supervisor.pid().unwrap();
    let started = Instant::now();
    supervisor.stop().await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(400), "stopped after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "stopped after {elapsed:?}");
    assert!(!process_exists(pid));
    assert_eq!(supervisor.status(), ServerStatus::Stopped);
    assert!(
        fixture
            .recorder
            .notices()
            .contains(&"Server did not terminate gracefully, killed.".to_string())
    );
}

#[tokio::test]
async fn both_streams_are_tagged_and_ordered() {
    let fixture = Fixture::new();
    let mut supervisor = fixture
        .supervisor("echo one; echo two >&2; echo three; echo four >&2; echo; exec sleep 30");

    assert!(supervisor.start().await);
    drain_until(&mut supervisor, &fixture.recorder, 4).await;

    assert_eq!(fixture.recorder.output(Stream::Out), ["one", "three"]);
    assert_eq!(fixture.recorder.output(Stream::Err), ["two", "four"]);

    supervisor.shutdown().await;
    assert_eq!(
        fixture.recorder.notices().last().map(String::as_str),
        Some("Supervisor shut down complete.")
    );
}

#[tokio::test]
async fn undecodable_bytes_do_not_end_the_reader() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("printf 'caf\\377\\n'; echo after; exec sleep 30");

    assert!(supervisor.start().await);
    drain_until(&mut supervisor, &fixture.recorder, 2).await;

    assert_eq!(fixture.recorder.output(Stream::Out), ["caf\u{fffd}", "after"]);
    supervisor.stop().await;
}

#[tokio::test]
async fn child_gets_folder_env_and_base_dir() {
    let fixture = Fixture::new();
    let mut supervisor =
        fixture.supervisor("echo \"folder=$LANSHARE_SERVE_FOLDER\"; echo \"cwd=$(pwd -P)\"; exec sleep 30");

    assert!(supervisor.start().await);
    drain_until(&mut supervisor, &fixture.recorder, 2).await;

    let folder = fixture.store.layout().default_folder.clone();
    assert_eq!(
        fixture.recorder.output(Stream::Out),
        [
            format!("folder={}", folder.display()),
            format!("cwd={}", fixture.base().display()),
        ]
    );
    supervisor.stop().await;
}

#[tokio::test]
async fn start_clears_connected_log_and_reads_it_fresh() {
    let fixture = Fixture::new();
    fixture.store.record_connected_ip("10.0.0.1");

    // relative to the pinned working directory
    let mut supervisor =
        fixture.supervisor("echo 10.0.0.9 >> logs/connected_ips.log; exec sleep 30");

    assert!(supervisor.start().await);
    assert_eq!(
        supervisor.connected_ips(),
        ["10.0.0.9".to_string()].into_iter().collect()
    );
    supervisor.stop().await;
}

#[tokio::test]
async fn server_dying_on_its_own_reports_exit_and_can_restart() {
    let fixture = Fixture::new();
    let timings = Timings {
        grace_period: Duration::from_millis(100),
        ..fast_timings()
    };
    let mut supervisor = fixture.supervisor_with("sleep 0.5; exit 7", timings);

    assert!(supervisor.start().await);
    assert_eq!(supervisor.status(), ServerStatus::Running);

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(supervisor.status(), ServerStatus::Exited(Some(7)));
    assert!(!supervisor.is_running());

    assert!(supervisor.start().await);
    assert_eq!(supervisor.status(), ServerStatus::Running);
    supervisor.stop().await;
}

#[tokio::test]
async fn served_folder_changes_only_while_stopped() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor("exec sleep 30");
    let other = fixture.base().join("other");
    fs::create_dir(&other).unwrap();

    assert!(!supervisor.set_served_folder(fixture.base().join("missing")));
    assert!(supervisor.set_served_folder(&other));
    assert_eq!(supervisor.served_folder(), other.as_path());

    assert!(supervisor.start().await);
    assert!(!supervisor.set_served_folder(fixture.base()));
    assert_eq!(supervisor.served_folder(), other.as_path());
    supervisor.stop().await;

    assert!(supervisor.set_served_folder(fixture.base()));
}

#[tokio::test]
async fn missing_folder_or_binary_fails_without_spawning() {
    let fixture = Fixture::new();

    let mut supervisor = fixture.supervisor("exec sleep 30");
    fs::remove_dir(&fixture.store.layout().default_folder).unwrap();
    assert!(!supervisor.start().await);
    assert_eq!(supervisor.pid(), None);

    let command = ServerCommand {
        program: Path::new("/nonexistent/lanshare-server").to_path_buf(),
        args: Vec::new(),
        folder_env_var: "LANSHARE_SERVE_FOLDER".into(),
        working_dir: fixture.base(),
    };
    let store: Arc<dyn SettingsStore> = fixture.store.clone();
    let mut supervisor = Supervisor::new(command, store, fixture.base())
        .with_timings(fast_timings())
        .with_sink(fixture.recorder.clone());
    assert!(!supervisor.start().await);
    assert_eq!(supervisor.status(), ServerStatus::Stopped);
    assert!(
        fixture
            .recorder
            .notices()
            .iter()
            .any(|n| n.starts_with("Error starting server"))
    );
}

#[tokio::test]
async fn relative_folder_reaches_child_as_absolute_path() {
    let fixture = Fixture::new();
    let mut supervisor = fixture.supervisor(
        "echo \"folder=$LANSHARE_SERVE_FOLDER\"; \
         if test -d \"$LANSHARE_SERVE_FOLDER\"; then echo found; else echo missing; fi; \
         exec sleep 30",
    );

    // `src` exists next to this crate's manifest but not in the base directory
    assert!(!fixture.base().join("src").exists());
    assert!(supervisor.set_served_folder("src"));
    let expected = fs::canonicalize("src").unwrap();
    assert_eq!(supervisor.served_folder(), expected.as_path());

    assert!(supervisor.start().await);
    drain_until(&mut supervisor, &fixture.recorder, 2).await;

    assert_eq!(
        fixture.recorder.output(Stream::Out),
        [format!("folder={}", expected.display()), "found".to_string()]
    );
    supervisor.stop().await;
}

#[test]
fn relative_folder_given_at_construction_is_made_absolute() {
    let fixture = Fixture::new();
    let command = ServerCommand {
        program: PathBuf::from("/bin/sh"),
        args: vec!["-c".into(), "exec sleep 30".into()],
        folder_env_var: "LANSHARE_SERVE_FOLDER".into(),
        working_dir: fixture.base(),
    };
    let store: Arc<dyn SettingsStore> = fixture.store.clone();
    let supervisor = Supervisor::new(command, store, "tests").with_sink(fixture.recorder.clone());

    assert!(supervisor.served_folder().is_absolute());
    assert_eq!(supervisor.served_folder(), fs::canonicalize("tests").unwrap().as_path());
}
