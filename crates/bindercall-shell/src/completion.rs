/// Result of one command executed by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Correlation id supplied at submission.
    pub id: u64,
    /// Exit status of the command.
    pub exit_code: i32,
    /// Captured stdout, one entry per line, without line terminators.
    pub output: Vec<String>,
}

impl Completion {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// All output lines joined without separators.
    pub fn joined_output(&self) -> String {
        self.output.concat()
    }
}

/// Callback receiving a command's completion on the channel worker thread.
pub type CompletionHandler = Box<dyn FnOnce(Completion) + Send + 'static>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_output_concatenates_lines() {
        let completion = Completion {
            id: 1,
            exit_code: 0,
            output: vec!["AQ".into(), "ID".into()],
        };
        assert!(completion.is_success());
        assert_eq!(completion.joined_output(), "AQID");
    }
}
