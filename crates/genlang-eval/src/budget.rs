//! Execution budget: bounds on steps, wall-clock time and call depth.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult, Resource};

/// Limits for one top-level call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionBudget {
    /// Maximum evaluation steps.
    pub max_instructions: u64,
    /// Maximum wall-clock time, serialized as `max_duration_ms`.
    #[serde(rename = "max_duration_ms", with = "duration_ms")]
    pub max_duration: Duration,
    /// Maximum nesting of function calls.
    pub max_call_depth: u32,
}

impl Default for ExecutionBudget {
    fn default() -> Self {
        Self {
            max_instructions: 1_000_000,
            max_duration: Duration::from_secs(5),
            max_call_depth: 256,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Tracks consumption against an [`ExecutionBudget`].
#[derive(Debug, Clone)]
pub struct Meter {
    budget: ExecutionBudget,
    used: u64,
    depth: u32,
    started: Instant,
    /// `None` when the time limit is too large to represent.
    deadline: Option<Instant>,
}

impl Meter {
    /// A meter whose clock starts now.
    pub fn new(budget: ExecutionBudget) -> Self {
        let started = Instant::now();
        Self {
            budget,
            used: 0,
            depth: 0,
            started,
            deadline: started.checked_add(budget.max_duration),
        }
    }

    pub fn budget(&self) -> &ExecutionBudget {
        &self.budget
    }

    /// Steps consumed so far.
    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Count one step, then check the step and time limits.
    pub fn tick(&mut self) -> EvalResult<()> {
        self.used += 1;
        if self.used > self.budget.max_instructions {
            return Err(EvalError::ResourceExceeded {
                resource: Resource::Instructions,
                limit: self.budget.max_instructions,
                used: self.used,
            });
        }
        if let Some(deadline) = self.deadline {
            let now = Instant::now();
            if now > deadline {
                return Err(EvalError::ResourceExceeded {
                    resource: Resource::Time,
                    limit: millis(self.budget.max_duration),
                    used: millis(now.duration_since(self.started)),
                });
            }
        }
        Ok(())
    }

    /// Enter a function call.
    pub fn enter_call(&mut self) -> EvalResult<()> {
        if self.depth >= self.budget.max_call_depth {
            return Err(EvalError::ResourceExceeded {
                resource: Resource::CallDepth,
                limit: u64::from(self.budget.max_call_depth),
                used: u64::from(self.depth) + 1,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn exit_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_limit_fails_on_first_tick_past_it() {
        let mut meter = Meter::new(ExecutionBudget {
            max_instructions: 3,
            ..ExecutionBudget::default()
        });
        for _ in 0..3 {
            meter.tick().unwrap();
        }
        assert_eq!(
            meter.tick(),
            Err(EvalError::ResourceExceeded {
                resource: Resource::Instructions,
                limit: 3,
                used: 4,
            })
        );
    }

    #[test]
    fn test_zero_duration_times_out() {
        let mut meter = Meter::new(ExecutionBudget {
            max_duration: Duration::ZERO,
            ..ExecutionBudget::default()
        });
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(
            meter.tick(),
            Err(EvalError::ResourceExceeded {
                resource: Resource::Time,
                ..
            })
        ));
    }

    #[test]
    fn test_call_depth() {
        let mut meter = Meter::new(ExecutionBudget {
            max_call_depth: 2,
            ..ExecutionBudget::default()
        });
        meter.enter_call().unwrap();
        meter.enter_call().unwrap();
        assert!(meter.enter_call().is_err());
        meter.exit_call();
        assert!(meter.enter_call().is_ok());
    }

    #[test]
    fn test_budget_json_uses_milliseconds() {
        let budget = ExecutionBudget {
            max_duration: Duration::from_millis(250),
            ..ExecutionBudget::default()
        };
        let json = serde_json::to_string(&budget).unwrap();
        assert!(json.contains("\"max_duration_ms\":250"));
        let back: ExecutionBudget = serde_json::from_str(&json).unwrap();
        assert_eq!(back, budget);

        let partial: ExecutionBudget = serde_json::from_str(r#"{"max_instructions": 10}"#).unwrap();
        assert_eq!(partial.max_instructions, 10);
        assert_eq!(partial.max_call_depth, 256);
    }
}
