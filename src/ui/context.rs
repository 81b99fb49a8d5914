//! Terminal detection for choosing between fancy and plain output

use std::io::IsTerminal;

const CI_VARS: [&str; 8] = [
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TF_BUILD",
];

/// Decides how status lines are rendered
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Inspect stdout/stdin and the environment
    pub fn detect() -> Self {
        let tty = std::io::stdout().is_terminal() && std::io::stdin().is_terminal();
        let ci = CI_VARS.iter().any(|var| std::env::var_os(var).is_some());
        Self {
            interactive: tty && !ci,
        }
    }

    /// Always plain output
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    /// Whether spinners and cliclack log lines are used
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_is_plain() {
        assert!(!UiContext::non_interactive().use_fancy_output());
    }
}
