//! Time-ordered 64-bit identifiers.
//!
//! Layout, most significant first:
//! - 39 bits: elapsed time since the start time, in 10 ms units
//! - 8 bits: sequence within one time unit
//! - 16 bits: machine id

use parking_lot::Mutex;

use crate::{StorageDatetime, StorageError};

const BITS_TIME: u32 = 39;
const BITS_SEQUENCE: u32 = 8;
const BITS_MACHINE: u32 = 16;

const TIME_UNIT_MILLIS: i64 = 10;
const SEQUENCE_MASK: u16 = (1 << BITS_SEQUENCE) - 1;

/// Why a single generation attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateError {
    /// Every sequence number of the current time unit is used. Transient.
    SequenceExhausted,
    /// The clock reads earlier than the start time.
    BeforeStartTime,
    /// The 39-bit time field cannot represent the elapsed time.
    OverTimeLimit,
}

impl GenerateError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerateError::SequenceExhausted)
    }
}

/// Components of a generated id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParts {
    pub elapsed: u64,
    pub sequence: u16,
    pub machine_id: u16,
}

struct State {
    elapsed: i64,
    sequence: u16,
}

/// Shared id generator. Clone an `Arc` of it across threads.
pub struct IdGenerator {
    start_millis: i64,
    machine_id: u16,
    state: Mutex<State>,
}

impl IdGenerator {
    /// Start time 2022-01-01T00:00:00Z.
    pub fn default_start_time() -> StorageDatetime {
        StorageDatetime::from_ymd_hms(2022, 1, 1, 0, 0, 0)
            .unwrap_or_else(|| StorageDatetime::from(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH))
    }

    pub fn new(start_time: StorageDatetime, machine_id: u16) -> Result<Self, StorageError> {
        if start_time > StorageDatetime::now() {
            return Err(StorageError::IdGeneration(format!(
                "start time {} is in the future",
                start_time
            )));
        }
        Ok(Self {
            start_millis: start_time.timestamp_millis(),
            machine_id,
            state: Mutex::new(State {
                elapsed: 0,
                sequence: SEQUENCE_MASK,
            }),
        })
    }

    pub fn machine_id(&self) -> u16 {
        self.machine_id
    }

    /// One generation attempt.
    pub fn try_next(&self) -> Result<u64, GenerateError> {
        let mut state = self.state.lock();
        let current = self.elapsed_now()?;

        if state.elapsed < current {
            state.elapsed = current;
            state.sequence = 0;
        } else {
            let sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if sequence == 0 {
                return Err(GenerateError::SequenceExhausted);
            }
            state.sequence = sequence;
        }

        if state.elapsed >= 1 << BITS_TIME {
            return Err(GenerateError::OverTimeLimit);
        }

        Ok(((state.elapsed as u64) << (BITS_SEQUENCE + BITS_MACHINE))
            | (u64::from(state.sequence) << BITS_MACHINE)
            | u64::from(self.machine_id))
    }

    /// Next id, retrying transient failures immediately until one succeeds.
    pub fn next(&self) -> Result<u64, StorageError> {
        loop {
            match self.try_next() {
                Ok(id) => return Ok(id),
                Err(e) if e.is_transient() => std::hint::spin_loop(),
                Err(e) => {
                    return Err(StorageError::IdGeneration(format!("{:?}", e)));
                }
            }
        }
    }

    /// [`IdGenerator::next`] as a decimal string.
    pub fn next_string(&self) -> Result<String, StorageError> {
        self.next().map(|id| id.to_string())
    }

    pub fn decompose(id: u64) -> IdParts {
        IdParts {
            elapsed: id >> (BITS_SEQUENCE + BITS_MACHINE),
            sequence: ((id >> BITS_MACHINE) & u64::from(SEQUENCE_MASK)) as u16,
            machine_id: (id & ((1 << BITS_MACHINE) - 1)) as u16,
        }
    }

    fn elapsed_now(&self) -> Result<i64, GenerateError> {
        let elapsed = StorageDatetime::now().timestamp_millis() - self.start_millis;
        if elapsed < 0 {
            return Err(GenerateError::BeforeStartTime);
        }
        Ok(elapsed / TIME_UNIT_MILLIS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn generator() -> IdGenerator {
        IdGenerator::new(IdGenerator::default_start_time(), 1).unwrap()
    }

    #[test]
    fn ids_carry_machine_id() {
        let id = generator().next().unwrap();
        let parts = IdGenerator::decompose(id);
        assert_eq!(parts.machine_id, 1);
        assert!(parts.elapsed > 0);
    }

    #[test]
    fn sequential_ids_strictly_increase() {
        let ids = generator();
        let mut last = 0;
        for _ in 0..2_000 {
            let id = ids.next().unwrap();
            assert!(id > last, "{} <= {}", id, last);
            last = id;
        }
    }

    #[test]
    fn concurrent_ids_are_unique_and_ordered_per_thread() {
        let ids = Arc::new(generator());
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || {
                    (0..1_000)
                        .map(|_| ids.next().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            let generated = handle.join().unwrap();
            assert!(generated.windows(2).all(|w| w[0] < w[1]));
            all.extend(generated);
        }
        assert_eq!(all.len(), 10_000);
    }

    #[test]
    fn future_start_time_is_rejected() {
        let future = StorageDatetime::now() + std::time::Duration::from_secs(3600);
        assert!(IdGenerator::new(future, 1).is_err());
    }

    #[test]
    fn string_form_is_decimal() {
        let id = generator().next_string().unwrap();
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }
}
