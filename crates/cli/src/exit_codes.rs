//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract: the scheduler that runs the
//! daily job decides between "rerun later" and "page someone" on them.
//!
//! | Code | Meaning                                                      |
//! |------|--------------------------------------------------------------|
//! | 0    | Success. A soft_fail gate decision still exits 0.            |
//! | 1    | Exception, fatal setup error, or bad arguments               |
//! | 2    | A gate returned hard_fail                                    |
//!
//! Clap's own usage errors are remapped to 1 so that 2 always means a gate.

use policyfeed_core::Decision;
use policyfeed_pipeline::RunOutcome;

/// Success, including soft_fail gate decisions.
pub const EXIT_SUCCESS: u8 = 0;

/// Pipeline exception, unreadable config, missing env, bad arguments.
pub const EXIT_ERROR: u8 = 1;

/// Quality or monetization gate returned hard_fail. Publishing is blocked.
pub const EXIT_GATE_HARD_FAIL: u8 = 2;

pub fn run_exit_code(outcome: &RunOutcome) -> u8 {
    match outcome {
        RunOutcome::Success { .. } => EXIT_SUCCESS,
        RunOutcome::GateFailed { .. } => EXIT_GATE_HARD_FAIL,
        RunOutcome::Errored { .. } => EXIT_ERROR,
    }
}

pub fn decision_exit_code(decision: Decision) -> u8 {
    if decision.is_hard_fail() {
        EXIT_GATE_HARD_FAIL
    } else {
        EXIT_SUCCESS
    }
}
