//! One-shot device commands: `self-check` and `motor-test`.

use rover_core::hw_error::{actuator_fault, map_hw_error};
use rover_traits::clock::Clock;
use rover_traits::{Buzzer, Drive, RangeSensor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Outcome of a self-check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckReport {
    pub distance_cm: f64,
}

/// Take one distance reading, then stop the drive and silence the buzzer.
pub fn self_check<S, D, B>(
    sensor: &mut S,
    drive: &mut D,
    buzzer: &mut B,
    read_timeout: Duration,
) -> eyre::Result<CheckReport>
where
    S: RangeSensor + ?Sized,
    D: Drive + ?Sized,
    B: Buzzer + ?Sized,
{
    let meters = sensor.read(read_timeout).map_err(|e| map_hw_error(&*e))?;
    drive.stop().map_err(|e| actuator_fault(&*e))?;
    buzzer.set(false).map_err(|e| actuator_fault(&*e))?;
    let distance_cm = meters * 100.0;
    tracing::info!(distance_cm, "self-check ok");
    Ok(CheckReport { distance_cm })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Forward,
    Stop,
    Backward,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Forward => "forward",
            Phase::Stop => "stop",
            Phase::Backward => "backward",
        }
    }
}

const SEQUENCE: [Phase; 4] = [Phase::Forward, Phase::Stop, Phase::Backward, Phase::Stop];

/// Run the fixed forward/stop/backward/stop sequence, calling `on_phase`
/// as each phase starts. The drive is stopped on every exit path; a raised
/// `interrupted` flag ends the sequence at the next phase boundary.
pub fn motor_test<D, C>(
    drive: &mut D,
    clock: &C,
    step: Duration,
    interrupted: &AtomicBool,
    mut on_phase: impl FnMut(Phase),
) -> eyre::Result<usize>
where
    D: Drive + ?Sized,
    C: Clock,
{
    let run = run_phases(drive, clock, step, interrupted, &mut on_phase);
    let stopped = drive.stop().map_err(|e| actuator_fault(&*e));
    let completed = run?;
    stopped?;
    Ok(completed)
}

fn run_phases<D, C>(
    drive: &mut D,
    clock: &C,
    step: Duration,
    interrupted: &AtomicBool,
    on_phase: &mut impl FnMut(Phase),
) -> eyre::Result<usize>
where
    D: Drive + ?Sized,
    C: Clock,
{
    for (i, phase) in SEQUENCE.iter().enumerate() {
        if interrupted.load(Ordering::Relaxed) {
            tracing::warn!(phase = phase.name(), "motor test interrupted");
            return Ok(i);
        }
        on_phase(*phase);
        let res = match phase {
            Phase::Forward => drive.set_ratios(1.0, 1.0),
            Phase::Stop => drive.stop(),
            Phase::Backward => drive.set_ratios(-1.0, -1.0),
        };
        res.map_err(|e| actuator_fault(&*e))?;
        // The last stop needs no dwell.
        if i + 1 < SEQUENCE.len() {
            clock.sleep(step);
        }
    }
    Ok(SEQUENCE.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_core::RoverError;
    use rover_core::mocks::{
        DriveCall, NoopSensor, RecordingBuzzer, RecordingDrive, ScriptedSensor,
    };
    use rover_traits::clock::ManualClock;

    #[test]
    fn motor_test_runs_the_full_sequence() {
        let mut drive = RecordingDrive::new();
        let clock = ManualClock::new();
        let epoch = clock.now();
        let mut phases = Vec::new();
        let n = motor_test(
            &mut drive,
            &clock,
            Duration::from_millis(1000),
            &AtomicBool::new(false),
            |p| phases.push(p),
        )
        .unwrap();

        assert_eq!(n, 4);
        assert_eq!(phases, SEQUENCE.to_vec());
        assert_eq!(
            drive.calls(),
            vec![
                DriveCall::Set(1.0, 1.0),
                DriveCall::Stop,
                DriveCall::Set(-1.0, -1.0),
                DriveCall::Stop,
                DriveCall::Stop,
            ]
        );
        assert_eq!(clock.ms_since(epoch), 3000);
    }

    #[test]
    fn interrupted_motor_test_still_stops() {
        let mut drive = RecordingDrive::new();
        let n = motor_test(
            &mut drive,
            &ManualClock::new(),
            Duration::from_millis(10),
            &AtomicBool::new(true),
            |_| {},
        )
        .unwrap();
        assert_eq!(n, 0);
        assert_eq!(drive.calls(), vec![DriveCall::Stop]);
    }

    #[test]
    fn failing_drive_is_an_actuator_fault() {
        let mut drive = RecordingDrive::new();
        drive.set_failing(true);
        let err = motor_test(
            &mut drive,
            &ManualClock::new(),
            Duration::ZERO,
            &AtomicBool::new(false),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RoverError>(),
            Some(RoverError::Actuator(_))
        ));
    }

    #[test]
    fn self_check_reads_and_silences() {
        let mut drive = RecordingDrive::new();
        let mut buzzer = RecordingBuzzer::new();
        let report = self_check(
            &mut ScriptedSensor::steady(0.25),
            &mut drive,
            &mut buzzer,
            Duration::from_millis(25),
        )
        .unwrap();
        assert_eq!(report.distance_cm, 25.0);
        assert_eq!(drive.calls(), vec![DriveCall::Stop]);
        assert_eq!(buzzer.states(), vec![false]);
    }

    #[test]
    fn self_check_surfaces_sensor_faults() {
        let err = self_check(
            &mut NoopSensor,
            &mut RecordingDrive::new(),
            &mut RecordingBuzzer::new(),
            Duration::from_millis(25),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RoverError>(),
            Some(RoverError::Sensor(_))
        ));
    }
}
