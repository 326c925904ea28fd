//! Last-command store and the single lock around decide-and-apply.
//!
//! The lock covers both the stored command and whatever actuator state the
//! caller keeps next to it, so "store command" and "apply a decision derived
//! from it" can never interleave with another evaluation.

use crate::command::MotorCommand;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct Slot<A> {
    command: MotorCommand,
    actuator: A,
}

pub struct CommandStore<A> {
    slot: Mutex<Slot<A>>,
}

impl<A> CommandStore<A> {
    pub fn new(actuator: A) -> Self {
        Self {
            slot: Mutex::new(Slot {
                command: MotorCommand::STOP,
                actuator,
            }),
        }
    }

    /// Store `command`, then run `f` on it without releasing the lock.
    pub fn replace_then<R>(
        &self,
        command: MotorCommand,
        f: impl FnOnce(MotorCommand, &mut A) -> R,
    ) -> R {
        let mut slot = self.lock();
        slot.command = command;
        let Slot { command, actuator } = &mut *slot;
        f(*command, actuator)
    }

    /// Run `f` on the stored command under the lock.
    pub fn with_current<R>(&self, f: impl FnOnce(MotorCommand, &mut A) -> R) -> R {
        let mut slot = self.lock();
        let Slot { command, actuator } = &mut *slot;
        f(*command, actuator)
    }

    pub fn current(&self) -> MotorCommand {
        self.lock().command
    }

    // Slot holds plain values and every writer leaves it consistent, so a
    // panic in an actuator call does not make the data unusable.
    fn lock(&self) -> MutexGuard<'_, Slot<A>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_stopped() {
        let store = CommandStore::new(());
        assert_eq!(store.current(), MotorCommand::STOP);
    }

    #[test]
    fn replace_then_sees_the_new_command() {
        let store = CommandStore::new(Vec::<MotorCommand>::new());
        let seen = store.replace_then(MotorCommand::new(0.3, 0.4), |cmd, log| {
            log.push(cmd);
            cmd
        });
        assert_eq!(seen, MotorCommand::new(0.3, 0.4));
        let replay = store.with_current(|cmd, log| {
            log.push(cmd);
            log.len()
        });
        assert_eq!(replay, 2);
    }

    #[test]
    fn evaluations_never_overlap() {
        // Each evaluation must see the command its own caller stored.
        let store = Arc::new(CommandStore::new(Vec::<(f64, f64)>::new()));
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    for j in 0..200 {
                        let v = f64::from(i * 1000 + j) / 10_000.0;
                        store.replace_then(MotorCommand::new(v, v), |cmd, log| {
                            thread::yield_now();
                            log.push((cmd.left, v));
                        });
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        let total = store.with_current(|_, log| {
            assert!(log.iter().all(|(l, r)| l == r));
            log.len()
        });
        assert_eq!(total, 8 * 200);
    }

    #[test]
    fn survives_a_panicking_holder() {
        let store = Arc::new(CommandStore::new(0u32));
        let s = store.clone();
        let _ = thread::spawn(move || {
            s.replace_then(MotorCommand::new(0.5, 0.5), |_, _| panic!("actuator blew up"));
        })
        .join();
        assert_eq!(store.current(), MotorCommand::new(0.5, 0.5));
    }
}
