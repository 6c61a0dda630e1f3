//! Human and JSON rendering of command results

use drivecopy_core::domain::{TransferAction, TransferOutcome};
use serde_json::json;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);

    /// Reports the result of one transfer
    fn outcome(&self, action: TransferAction, outcome: &TransferOutcome);
}

/// Human-readable output with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}

    fn outcome(&self, action: TransferAction, outcome: &TransferOutcome) {
        self.success(&outcome_summary(action, outcome));
        if let Some(id) = &outcome.remote_id {
            self.info(&format!("Remote ID: {id}"));
        }
    }
}

/// Machine-readable output, one JSON document per result
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", json!({"success": true, "message": message}));
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }

    fn outcome(&self, action: TransferAction, outcome: &TransferOutcome) {
        self.print_json(&outcome_json(action, outcome));
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

fn outcome_summary(action: TransferAction, outcome: &TransferOutcome) -> String {
    let local = outcome.local_path.display();
    let name = &outcome.entry_name;
    match (action, outcome.transferred) {
        (TransferAction::Download, true) => format!("Downloaded '{name}' to {local}"),
        (TransferAction::Download, false) => {
            format!("{local} already matches '{name}', nothing downloaded")
        }
        (TransferAction::Upload, _) => format!("Uploaded {local} as '{name}'"),
        (TransferAction::Replace, true) => format!("Replaced '{name}' with {local}"),
        (TransferAction::Replace, false) => {
            format!("'{name}' already matches {local}, nothing uploaded")
        }
    }
}

fn outcome_json(action: TransferAction, outcome: &TransferOutcome) -> serde_json::Value {
    json!({
        "success": true,
        "action": action.to_string(),
        "entry": outcome.entry_name,
        "local_path": outcome.local_path.display().to_string(),
        "remote_id": outcome.remote_id.as_ref().map(|id| id.to_string()),
        "transferred": outcome.transferred,
    })
}
