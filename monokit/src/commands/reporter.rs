//! Dispatch reporter implementation for CLI.

use monokit_core::{DispatchReporter, Error, InvocationResult};

use crate::formatting::print_error;

pub struct CliDispatchReporter;

impl DispatchReporter for CliDispatchReporter {
    fn config_unresolved(&self, package: &str, error: &Error) {
        print_error(&format!("[{}] {}", package, error));
    }

    fn invocation_failed(&self, package: &str, tool: &str, result: &InvocationResult) {
        match result.error {
            Some(ref message) => {
                let error = Error::ToolExecution {
                    package: package.to_string(),
                    tool: tool.to_string(),
                    message: message.clone(),
                };
                print_error(&error.to_string());
            }
            None => tracing::debug!(package, tool, exit_code = ?result.exit_code, "tool exited unsuccessfully"),
        }
    }
}
