//! Detects whether the terminal can show spinners and prompts

use std::io::IsTerminal;

/// CI systems that set their own marker variable
const CI_VARS: [&str; 7] = [
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
    "PIXSTASH_PLAIN",
];

/// Output behavior for the current run
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
    auto_yes: bool,
}

impl UiContext {
    /// Detect the current environment
    ///
    /// Status output goes to stderr, so that is the stream checked; stdout
    /// may be piped into another tool while progress is still shown.
    pub fn detect() -> Self {
        let interactive = std::io::stderr().is_terminal()
            && std::io::stdin().is_terminal()
            && !CI_VARS.iter().any(|var| std::env::var_os(var).is_some());

        Self {
            interactive,
            auto_yes: false,
        }
    }

    /// Plain output, no prompts (tests, CI)
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            auto_yes: false,
        }
    }

    /// Answer every confirmation with yes
    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    /// Spinners, bars and colors
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}
