//! Terminal output helpers
//!
//! Uses `cliclack` log lines and spinners in an interactive terminal and
//! falls back to bracketed plain lines (`[OK]`, `[INFO]`) in CI or pipes.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{intro, remark, step_info, step_ok, step_ok_detail, step_warn_hint};
pub use progress::TaskSpinner;
