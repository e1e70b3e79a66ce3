#![forbid(unsafe_code)]

//! Interactive console: reads commands from stdin and polls the supervisor
//! on two timers, one draining server output and one refreshing the server
//! status and the connected devices.

use crate::error::Error;
use crate::signals::SignalEvent;
use crate::throughput::{CounterSource, Reading, SystemCounters, ThroughputMeter};
use config::Config;
use flume::Receiver;
use std::collections::HashSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use store::SettingsStore;
use supervisor::{LogEvent, LogSink, ServerStatus, Supervisor};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

pub const HELP: &str = "\
Commands:
  start           start the file server
  stop            stop the file server
  restart         stop the file server if running, then start it
  status          show server status, address, served folder and traffic
  folder [DIR]    show the served folder, or change it while stopped
  ips             list devices connected since the server started
  blocked         list blocked addresses
  block IP...     block addresses
  unblock IP...   unblock addresses
  traffic         toggle live network traffic reports
  help            show this help
  quit            stop the server and exit";

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Restart,
    Status,
    Folder(Option<PathBuf>),
    Ips,
    Blocked,
    Block(Vec<String>),
    Unblock(Vec<String>),
    Traffic,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command `{0}`, type `help` for the list of commands")]
    Unknown(String),

    #[error("`{0}` needs at least one address")]
    MissingAddress(&'static str),
}

impl FromStr for ConsoleCommand {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let addresses = |verb: &'static str| {
            let ips: Vec<String> = rest.split_whitespace().map(str::to_owned).collect();
            if ips.is_empty() {
                Err(ParseError::MissingAddress(verb))
            } else {
                Ok(ips)
            }
        };

        match verb.to_ascii_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "status" => Ok(Self::Status),
            // the rest of the line is one path, spaces included
            "folder" => Ok(Self::Folder((!rest.is_empty()).then(|| PathBuf::from(rest)))),
            "ips" | "devices" => Ok(Self::Ips),
            "blocked" => Ok(Self::Blocked),
            "block" => addresses("block").map(Self::Block),
            "unblock" => addresses("unblock").map(Self::Unblock),
            "traffic" | "stats" => Ok(Self::Traffic),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ParseError::Unknown(other.to_owned())),
        }
    }
}

/// Prints supervisor notices and tagged server output on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn emit(&self, event: LogEvent) {
        say(event);
    }
}

#[allow(clippy::print_stdout)]
pub(crate) fn say(text: impl Display) {
    println!("{text}");
}

pub(crate) fn device_label(ip: &str, blocked: &HashSet<String>) -> String {
    if blocked.contains(ip) {
        format!("{ip} (Blocked)")
    } else {
        ip.to_owned()
    }
}

pub(crate) fn sorted(set: &HashSet<String>) -> Vec<&str> {
    let mut items: Vec<&str> = set.iter().map(String::as_str).collect();
    items.sort_unstable();
    items
}

/// Read stdin line by line on a dedicated thread.
///
/// The channel disconnects at end of input. The thread is never joined; it
/// dies with the process.
pub fn spawn_stdin_reader() -> Result<Receiver<String>, Error> {
    let (tx, rx) = flume::unbounded();
    std::thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(%err, "failed to read console input");
                        break;
                    }
                }
            }
        })
        .map_err(Error::InputThread)?;
    Ok(rx)
}

enum Flow {
    Continue,
    Quit,
}

/// The control surface: owns the supervisor and its polling timers.
pub struct Console {
    supervisor: Supervisor,
    store: Arc<dyn SettingsStore>,
    address: String,
    log_interval: Duration,
    status_interval: Duration,
    last_status: ServerStatus,
    known_ips: HashSet<String>,
    meter: ThroughputMeter,
    live_traffic: bool,
}

impl Console {
    pub fn new(supervisor: Supervisor, store: Arc<dyn SettingsStore>, config: &Config) -> Self {
        let control = config.control.clamp();
        Self {
            supervisor,
            store,
            address: format!("http://{}:{}", config.server.host, config.server.port),
            log_interval: control.log_interval,
            status_interval: control.status_interval,
            last_status: ServerStatus::Stopped,
            known_ips: HashSet::new(),
            meter: ThroughputMeter::new(SystemCounters),
            live_traffic: false,
        }
    }

    /// Sample network traffic from `source` instead of the system counters.
    pub fn with_counters(mut self, source: impl CounterSource + 'static) -> Self {
        self.meter = ThroughputMeter::new(source);
        self
    }

    /// Serve console commands from `input` until `quit`, end of input, or a
    /// shutdown signal, then shut the supervisor down.
    pub async fn run(
        mut self,
        input: Receiver<String>,
        signals: Receiver<SignalEvent>,
        autostart: bool,
    ) {
        say("lanshare console, type `help` for the list of commands.");
        if autostart {
            self.supervisor.start().await;
            self.refresh();
        }

        let mut log_tick = time::interval(self.log_interval);
        let mut status_tick = time::interval(self.status_interval);
        log_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        status_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = log_tick.tick() => {
                    self.supervisor.drain_log_queue();
                }

                _ = status_tick.tick() => self.refresh(),

                event = signals.recv_async() => match event {
                    Ok(SignalEvent::Shutdown) => {
                        debug!("shutdown requested by signal");
                        break;
                    }
                    Ok(SignalEvent::DumpStatus) => self.print_status(),
                    Err(_) => {
                        warn!("signal handler stopped, shutting down");
                        break;
                    }
                },

                line = input.recv_async() => match line {
                    Ok(line) => {
                        if let Flow::Quit = self.execute_line(&line).await {
                            break;
                        }
                    }
                    Err(_) => {
                        debug!("console input closed");
                        break;
                    }
                },
            }
        }

        self.supervisor.shutdown().await;
    }

    async fn execute_line(&mut self, line: &str) -> Flow {
        match line.parse::<ConsoleCommand>() {
            Ok(command) => self.execute(command).await,
            Err(ParseError::Empty) => Flow::Continue,
            Err(err) => {
                say(err);
                Flow::Continue
            }
        }
    }

    async fn execute(&mut self, command: ConsoleCommand) -> Flow {
        debug!(?command, "console command");
        match command {
            ConsoleCommand::Start => {
                self.supervisor.start().await;
                self.refresh();
            }
            ConsoleCommand::Stop => {
                self.supervisor.stop().await;
                self.refresh();
            }
            ConsoleCommand::Restart => {
                if self.supervisor.is_running() {
                    self.supervisor.stop().await;
                }
                self.supervisor.start().await;
                self.refresh();
            }
            ConsoleCommand::Status => self.print_status(),
            ConsoleCommand::Folder(None) => {
                say(format_args!(
                    "Served folder: {}",
                    self.supervisor.served_folder().display()
                ));
            }
            ConsoleCommand::Folder(Some(dir)) => self.change_folder(&dir),
            ConsoleCommand::Ips => self.print_devices(),
            ConsoleCommand::Blocked => print_blocklist(self.store.as_ref()),
            ConsoleCommand::Block(ips) => block(self.store.as_ref(), &ips),
            ConsoleCommand::Unblock(ips) => unblock(self.store.as_ref(), &ips),
            ConsoleCommand::Traffic => {
                self.live_traffic = !self.live_traffic;
                if self.live_traffic {
                    say(format_args!("Live network traffic on: {}", self.meter.reading()));
                } else {
                    say("Live network traffic off.");
                }
            }
            ConsoleCommand::Help => say(HELP),
            ConsoleCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Report a status change and devices that connected since the last
    /// refresh, and take a traffic sample.
    fn refresh(&mut self) {
        let reading = self.meter.sample();
        if self.live_traffic && matches!(reading, Reading::Rate(_)) {
            say(format_args!("Network traffic: {reading}"));
        }

        let status = self.supervisor.status();
        if status != self.last_status {
            say(format_args!("Server status: {status}"));
            self.last_status = status;
        }

        let connected = self.supervisor.connected_ips();
        let mut fresh: Vec<&String> = connected.difference(&self.known_ips).collect();
        if !fresh.is_empty() {
            let blocked = self.store.blocked_ips();
            fresh.sort_unstable();
            for ip in fresh {
                say(format_args!("New device: {}", device_label(ip, &blocked)));
            }
        }
        // a restart truncates the log, so this also forgets old devices
        self.known_ips = connected;
    }

    fn print_status(&mut self) {
        let status = self.supervisor.status();
        match self.supervisor.pid().filter(|_| status.is_running()) {
            Some(pid) => say(format_args!("Server status: {status} (PID: {pid})")),
            None => say(format_args!("Server status: {status}")),
        }
        say(format_args!("Address: {}", self.address));
        say(format_args!(
            "Served folder: {}",
            self.supervisor.served_folder().display()
        ));
        say(format_args!(
            "Connected devices: {}",
            self.supervisor.connected_ips().len()
        ));
        say(format_args!("Network traffic: {}", self.meter.reading()));
    }

    fn print_devices(&self) {
        let connected = self.supervisor.connected_ips();
        if connected.is_empty() {
            say("No devices connected.");
            return;
        }
        let blocked = self.store.blocked_ips();
        for ip in sorted(&connected) {
            say(format_args!("  {}", device_label(ip, &blocked)));
        }
    }

    fn change_folder(&mut self, dir: &Path) {
        if self.supervisor.set_served_folder(dir) {
            self.store.save_served_folder(self.supervisor.served_folder());
        }
    }
}

pub(crate) fn print_blocklist(store: &dyn SettingsStore) {
    let blocked = store.blocked_ips();
    if blocked.is_empty() {
        say("Blocklist is empty.");
        return;
    }
    for ip in sorted(&blocked) {
        say(format_args!("  {ip}"));
    }
}

pub(crate) fn block(store: &dyn SettingsStore, ips: &[String]) {
    for ip in ips {
        if store.block_ip(ip) {
            say(format_args!("Blocked {ip}."));
        } else {
            say(format_args!("{ip} was not added: already blocked or not an address."));
        }
    }
}

pub(crate) fn unblock(store: &dyn SettingsStore, ips: &[String]) {
    for ip in ips {
        if store.unblock_ip(ip) {
            say(format_args!("Unblocked {ip}."));
        } else {
            say(format_args!("{ip} is not blocked."));
        }
    }
}
