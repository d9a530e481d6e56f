mod logger;

use ksched::{Channel, Config, CoreSnapshot, DevKsched, Ksched, KschedError};
use log::{LevelFilter, error, info, warn};
use logger::StderrLogger;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use std::{env, hint};

const USAGE: &str = "usage: kschedctl <status | wake CORE... | idle CORE...>

  status  read the control blocks without touching them
  wake    interrupt the given cores
  idle    send the given cores idle and wait for confirmation

wake and idle make kschedctl the channel's owner for the duration of the
command. They fail while a scheduler holds the device.

environment:
  KSCHED_DEVICE  device node (default /dev/ksched)
  KSCHED_CORES   number of cores to map (default 256)
  KSCHED_LOG     error|warn|info|debug|trace (default info)";

/// How long `idle` polls for confirmation before giving up on a core.
const CONFIRM_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
enum CtlError {
    #[error("{0}")]
    Usage(&'static str),
    #[error("invalid core id {0:?}")]
    BadCore(String),
    #[error("invalid KSCHED_CORES value {0:?}")]
    BadCoreCount(String),
    #[error(transparent)]
    Ksched(#[from] KschedError),
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Status,
    Wake(Vec<u32>),
    Idle(Vec<u32>),
}

fn main() -> ExitCode {
    if let Err(e) = StderrLogger::from_env("KSCHED_LOG", LevelFilter::Info).init() {
        eprintln!("failed to install logger: {e}");
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(CtlError::Usage(msg)) => {
            eprintln!("{msg}\n\n{USAGE}");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), CtlError> {
    let action = parse_args(env::args().skip(1))?;
    let config = config_from_env(env::var("KSCHED_DEVICE").ok(), env::var("KSCHED_CORES").ok())?;

    let cores = match action {
        Action::Status => {
            for snapshot in ksched::inspect(&config)? {
                println!("{}", status_row(&snapshot));
            }
            return Ok(());
        }
        Action::Wake(ref cores) | Action::Idle(ref cores) => cores,
    };

    let mut ksched = Ksched::<DevKsched>::new();
    let channel = ksched.init(&config)?;

    if matches!(action, Action::Idle(_)) {
        for &core in cores {
            channel.set_idle(core)?;
        }
    }
    for &core in cores {
        channel.mark_pending(core)?;
    }
    channel.flush_pending()?;
    info!("interrupted {} cores", cores.len());

    if matches!(action, Action::Idle(_)) {
        for &core in cores {
            if wait_applied(channel, core)? {
                println!("core {core}: idle");
            } else {
                warn!("core {core}: idle not confirmed within {CONFIRM_TIMEOUT:?}");
            }
        }
    }

    ksched.teardown();
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Action, CtlError> {
    let command = args.next().ok_or(CtlError::Usage("missing command"))?;
    let cores = args
        .map(|arg| arg.parse::<u32>().map_err(|_| CtlError::BadCore(arg)))
        .collect::<Result<Vec<_>, _>>()?;

    match command.as_str() {
        "status" if cores.is_empty() => Ok(Action::Status),
        "status" => Err(CtlError::Usage("status takes no arguments")),
        "wake" | "idle" if cores.is_empty() => Err(CtlError::Usage("no cores given")),
        "wake" => Ok(Action::Wake(cores)),
        "idle" => Ok(Action::Idle(cores)),
        _ => Err(CtlError::Usage("unknown command")),
    }
}

fn config_from_env(device: Option<String>, cores: Option<String>) -> Result<Config, CtlError> {
    let mut config = Config::new();
    if let Some(device) = device {
        config = config.with_device_path(device);
    }
    if let Some(cores) = cores {
        let n = cores
            .parse::<u32>()
            .map_err(|_| CtlError::BadCoreCount(cores))?;
        config = config.with_num_cores(n);
    }
    config.validate()?;
    Ok(config)
}

fn status_row(snapshot: &CoreSnapshot) -> String {
    let state = snapshot.state().map_or_else(
        || format!("bad command {:#010x}", snapshot.command.into_bits()),
        |s| format!("{s:?}"),
    );
    format!(
        "core {:>3}  issued {:>10}  committed {:>10}  tid {:>7}  hint {:#x}  {state}",
        snapshot.core, snapshot.issued, snapshot.committed, snapshot.tid, snapshot.idle_hint
    )
}

/// Spin until `core` confirms its last directive or [`CONFIRM_TIMEOUT`] passes.
fn wait_applied(channel: &Channel<DevKsched>, core: u32) -> Result<bool, KschedError> {
    let deadline = Instant::now() + CONFIRM_TIMEOUT;
    while !channel.is_applied(core)? {
        if Instant::now() >= deadline {
            return Ok(false);
        }
        hint::spin_loop();
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ksched::Command;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(ToString::to_string).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_args(args(&["status"])).unwrap(), Action::Status);
        assert_eq!(
            parse_args(args(&["wake", "1", "3"])).unwrap(),
            Action::Wake(vec![1, 3])
        );
        assert_eq!(parse_args(args(&["idle", "0"])).unwrap(), Action::Idle(vec![0]));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse_args(args(&[])), Err(CtlError::Usage(_))));
        assert!(matches!(parse_args(args(&["wake"])), Err(CtlError::Usage(_))));
        assert!(matches!(parse_args(args(&["park", "1"])), Err(CtlError::Usage(_))));
        assert!(matches!(
            parse_args(args(&["wake", "x"])),
            Err(CtlError::BadCore(s)) if s == "x"
        ));
    }

    #[test]
    fn config_honours_overrides() {
        let config = config_from_env(Some("/tmp/ksched".into()), Some("8".into())).unwrap();
        assert_eq!(config.device_path(), std::path::Path::new("/tmp/ksched"));
        assert_eq!(config.num_cores(), 8);

        assert!(matches!(
            config_from_env(None, Some("many".into())),
            Err(CtlError::BadCoreCount(_))
        ));
        assert!(matches!(
            config_from_env(None, Some("0".into())),
            Err(CtlError::Ksched(KschedError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn status_rows_show_pending_and_undecodable_blocks() {
        let pending = CoreSnapshot {
            core: 2,
            issued: 5,
            committed: 4,
            command: Command::run(),
            tid: 1001,
            idle_hint: 0,
        };
        let row = status_row(&pending);
        assert!(row.starts_with("core   2"));
        assert!(row.ends_with("RunPending"));

        let garbage = CoreSnapshot {
            command: Command::from_bits(0xff),
            ..pending
        };
        assert!(status_row(&garbage).ends_with("bad command 0x000000ff"));
    }
}
