//! `rover drive`: JSON-lines request/reply session over stdin/stdout.
//!
//! One request per line:
//!
//! ```text
//! {"op":"control","left":512,"right":-300}   stick units, +/- control.full_scale
//! {"op":"distance"}
//! {"op":"shutdown"}
//! ```
//!
//! Every request gets exactly one reply line. Malformed lines get an error
//! reply and the session carries on; a latched actuator fault ends it.

use crossbeam_channel as xch;
use rover_core::{CommandReply, Rover, RoverStatus};
use rover_traits::clock::Clock;
use rover_traits::{Buzzer, Drive, RangeSensor};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How often the session wakes up to check Ctrl-C and the fault latch.
const POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Request {
    /// A missing wheel means 0.
    Control {
        #[serde(default)]
        left: f64,
        #[serde(default)]
        right: f64,
    },
    Distance,
    Shutdown,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reply {
    Ok {
        distance: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        effective: Option<[f64; 2]>,
        #[serde(skip_serializing_if = "Option::is_none")]
        buzzer: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stalled_ms: Option<u64>,
    },
    #[serde(rename = "shutting down")]
    ShuttingDown,
    Error {
        message: String,
    },
}

impl Reply {
    fn error(message: impl Into<String>) -> Self {
        Reply::Error {
            message: message.into(),
        }
    }
}

impl From<CommandReply> for Reply {
    fn from(r: CommandReply) -> Self {
        let eff = r.decision.effective;
        Reply::Ok {
            distance: r.distance_cm,
            effective: Some([eff.left, eff.right]),
            buzzer: Some(r.decision.buzzer_on),
            stalled_ms: None,
        }
    }
}

impl From<RoverStatus> for Reply {
    fn from(s: RoverStatus) -> Self {
        Reply::Ok {
            distance: s.distance_cm,
            effective: Some([s.applied.left, s.applied.right]),
            buzzer: Some(s.buzzer_on),
            stalled_ms: s.stalled_ms,
        }
    }
}

/// Why the session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Eof,
    ShutdownRequested,
    Interrupted,
}

/// Totals reported when the session ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub requests: u64,
    pub rejected: u64,
}

/// Read lines on a helper thread so the session can also watch the shutdown
/// flag. The channel disconnects at EOF.
fn spawn_reader<R>(input: R) -> eyre::Result<xch::Receiver<std::io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = xch::unbounded();
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in input.lines() {
                let stop = line.is_err();
                if tx.send(line).is_err() || stop {
                    break;
                }
            }
        })?;
    Ok(rx)
}

fn write_reply<W: Write>(out: &mut W, reply: &Reply) -> eyre::Result<()> {
    serde_json::to_writer(&mut *out, reply)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// Serve requests until EOF, `shutdown`, the shutdown flag or an actuator
/// fault. Sampling is started here and the rover is always shut down before
/// returning.
pub fn run_session<S, D, B, C, R, W>(
    rover: &mut Rover<S, D, B, C>,
    input: R,
    out: &mut W,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<(SessionEnd, SessionStats)>
where
    S: RangeSensor + Send + 'static,
    D: Drive + Send + 'static,
    B: Buzzer + Send + 'static,
    C: Clock + Clone + Send + 'static,
    R: BufRead + Send + 'static,
    W: Write,
{
    rover.start()?;
    let served = serve(rover, input, out, shutdown);
    let stopped = rover.shutdown();
    let (end, stats) = served?;
    stopped?;
    tracing::info!(
        ?end,
        requests = stats.requests,
        rejected = stats.rejected,
        "drive session ended"
    );
    Ok((end, stats))
}

fn serve<S, D, B, C, R, W>(
    rover: &Rover<S, D, B, C>,
    input: R,
    out: &mut W,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<(SessionEnd, SessionStats)>
where
    S: RangeSensor + Send + 'static,
    D: Drive + Send + 'static,
    B: Buzzer + Send + 'static,
    C: Clock + Clone + Send + 'static,
    R: BufRead + Send + 'static,
    W: Write,
{
    let lines = spawn_reader(input)?;
    let mut stats = SessionStats::default();
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Ok((SessionEnd::Interrupted, stats));
        }
        if let Some(fault) = rover.fault() {
            return Err(fault.into());
        }
        let line = match lines.recv_timeout(POLL) {
            Ok(line) => line?,
            Err(xch::RecvTimeoutError::Timeout) => continue,
            Err(xch::RecvTimeoutError::Disconnected) => return Ok((SessionEnd::Eof, stats)),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.requests += 1;

        let request = match serde_json::from_str::<Request>(line) {
            Ok(r) => r,
            Err(e) => {
                stats.rejected += 1;
                tracing::debug!(error = %e, "rejected request");
                write_reply(out, &Reply::error(format!("bad request: {e}")))?;
                continue;
            }
        };
        match request {
            Request::Control { left, right } => match rover.submit_stick(left, right) {
                Ok(reply) => write_reply(out, &reply.into())?,
                Err(e) => {
                    write_reply(out, &Reply::error(e.to_string()))?;
                    return Err(e);
                }
            },
            Request::Distance => write_reply(out, &rover.status().into())?,
            Request::Shutdown => {
                write_reply(out, &Reply::ShuttingDown)?;
                return Ok((SessionEnd::ShutdownRequested, stats));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_core::mocks::{DriveCall, RecordingBuzzer, RecordingDrive, ScriptedSensor};
    use rover_core::{MotorCommand, RoverCfg, RoverError};
    use std::io::Cursor;

    type TestRover = Rover<ScriptedSensor, RecordingDrive, RecordingBuzzer>;

    fn rover(meters: f64) -> (TestRover, RecordingDrive) {
        let drive = RecordingDrive::new();
        let rover = Rover::new(
            ScriptedSensor::steady(meters),
            drive.clone(),
            RecordingBuzzer::new(),
            &RoverCfg::default(),
        )
        .unwrap();
        (rover, drive)
    }

    fn replies(out: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(out)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn session(
        rover: &mut TestRover,
        input: &str,
    ) -> (eyre::Result<SessionEnd>, Vec<serde_json::Value>) {
        let mut out = Vec::new();
        let flag = Arc::new(AtomicBool::new(false));
        let res = run_session(rover, Cursor::new(input.to_owned()), &mut out, &flag);
        (res.map(|(end, _)| end), replies(&out))
    }

    #[test]
    fn parses_requests() {
        let r: Request =
            serde_json::from_str(r#"{"op":"control","left":10,"right":-5.5}"#).unwrap();
        assert_eq!(
            r,
            Request::Control {
                left: 10.0,
                right: -5.5
            }
        );
        let r: Request = serde_json::from_str(r#"{"op":"distance"}"#).unwrap();
        assert_eq!(r, Request::Distance);
        assert!(serde_json::from_str::<Request>(r#"{"op":"fly"}"#).is_err());
    }

    #[test]
    fn missing_wheel_defaults_to_zero() {
        let r: Request = serde_json::from_str(r#"{"op":"control","left":500}"#).unwrap();
        assert_eq!(
            r,
            Request::Control {
                left: 500.0,
                right: 0.0
            }
        );
        let r: Request = serde_json::from_str(r#"{"op":"control"}"#).unwrap();
        assert_eq!(
            r,
            Request::Control {
                left: 0.0,
                right: 0.0
            }
        );
        assert!(serde_json::from_str::<Request>(r#"{"op":"control","left":"fast"}"#).is_err());
    }

    #[test]
    fn status_reply_shape() {
        let idle = RoverStatus {
            distance_cm: None,
            applied: MotorCommand::STOP,
            buzzer_on: false,
            stalled_ms: None,
        };
        let json = serde_json::to_string(&Reply::from(idle)).unwrap();
        assert_eq!(
            json,
            r#"{"status":"ok","distance":null,"effective":[0.0,0.0],"buzzer":false}"#
        );
        let sampled = RoverStatus {
            distance_cm: Some(12.3),
            stalled_ms: Some(40),
            ..idle
        };
        let json = serde_json::to_string(&Reply::from(sampled)).unwrap();
        assert!(json.starts_with(r#"{"status":"ok","distance":12.3,"#));
        assert!(json.ends_with(r#""stalled_ms":40}"#));
    }

    #[test]
    fn shutdown_reply_status() {
        let json = serde_json::to_string(&Reply::ShuttingDown).unwrap();
        assert_eq!(json, r#"{"status":"shutting down"}"#);
    }

    #[test]
    fn control_then_eof_halts_motors() {
        let (mut rover, drive) = rover(0.5);
        let (end, replies) = session(
            &mut rover,
            "{\"op\":\"control\",\"left\":1023,\"right\":1023}\n",
        );
        assert_eq!(end.unwrap(), SessionEnd::Eof);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["status"], "ok");
        assert_eq!(replies[0]["effective"], serde_json::json!([1.0, 1.0]));
        assert!(drive.calls().contains(&DriveCall::Set(1.0, 1.0)));
        assert_eq!(drive.last(), Some(DriveCall::Stop));
        assert!(!rover.is_sampling());
    }

    #[test]
    fn malformed_lines_get_error_replies() {
        let (mut rover, _drive) = rover(0.5);
        let input = concat!(
            "not json\n",
            "\n",
            "{\"op\":\"distance\"}\n",
            "{\"op\":\"shutdown\"}\n",
            "{\"op\":\"distance\"}\n",
        );
        let (end, replies) = session(&mut rover, input);
        assert_eq!(end.unwrap(), SessionEnd::ShutdownRequested);
        // Blank line skipped; nothing after shutdown is served.
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["status"], "error");
        assert_eq!(replies[1]["status"], "ok");
        assert_eq!(replies[2]["status"], "shutting down");
    }

    #[test]
    fn actuator_fault_ends_the_session() {
        let (mut rover, drive) = rover(0.5);
        drive.set_failing(true);
        let (end, replies) = session(
            &mut rover,
            "{\"op\":\"control\",\"left\":500,\"right\":500}\n{\"op\":\"distance\"}\n",
        );
        let err = end.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RoverError>(),
            Some(RoverError::Actuator(_))
        ));
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["status"], "error");
    }

    #[cfg(unix)]
    #[test]
    fn shutdown_flag_interrupts_an_idle_session() {
        let (mut rover, drive) = rover(0.5);
        let flag = Arc::new(AtomicBool::new(true));
        let mut out = Vec::new();
        // Reader never reaches EOF on its own.
        let (reader, _writer) = std::os::unix::net::UnixStream::pair().unwrap();
        let res = run_session(&mut rover, std::io::BufReader::new(reader), &mut out, &flag);
        assert_eq!(res.unwrap().0, SessionEnd::Interrupted);
        assert_eq!(drive.last(), Some(DriveCall::Stop));
    }
}
