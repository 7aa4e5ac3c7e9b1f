//! Terminal presentation helpers
//!
//! Uses `cliclack` spinners and prompts and `indicatif` bars when attached to
//! a terminal, with plain stderr lines in CI/non-interactive environments.

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    outro_success, outro_warn, remark, step_error_detail, step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::{summary, PopulateProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{status_label, status_style};
