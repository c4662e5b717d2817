use crate::status::{ApiStatus, StatusSnapshot};
use colored::*;

/// One-line rendering of the status monitor.
pub fn render(snapshot: &StatusSnapshot) -> String {
    let badge = match snapshot.status {
        ApiStatus::Online => "● online".green(),
        ApiStatus::Offline => "● offline".red(),
        ApiStatus::InvalidKey => "● invalid key".yellow(),
        ApiStatus::Unknown => "● unknown".dimmed(),
    };

    let mut line = format!("OpenAI API: {}", badge);
    if let Some(error) = &snapshot.error {
        line.push_str(&format!("  {}", error.red()));
    }
    if let Some(at) = snapshot.last_checked {
        line.push_str(&format!("  (checked {})", at.format("%H:%M:%S")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shows_error_next_to_badge() {
        colored::control::set_override(false);
        let snapshot = StatusSnapshot {
            status: ApiStatus::InvalidKey,
            error: Some("Invalid API Key".into()),
            checking: false,
            last_checked: None,
        };
        assert_eq!(render(&snapshot), "OpenAI API: ● invalid key  Invalid API Key");
    }
}
