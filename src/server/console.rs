//! Operator Console
//!
//! Line-oriented commands read by the event loop, and the text rendering of
//! registry snapshots they print.

use crate::registry::{RegistryEntry, RegistryStatsSnapshot};
use std::fmt::Write;

/// Commands understood by the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `end`: shut the node down
    End,
    /// `ls`: list subdomains
    ListSubdomains,
    /// `lh`: list hosts
    ListHosts,
    /// `stats`: registry counters
    Stats,
    /// `help`
    Help,
    /// Blank line
    Empty,
    /// Anything else; accepted and ignored
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Command::Empty,
            "end" => Command::End,
            "ls" => Command::ListSubdomains,
            "lh" => Command::ListHosts,
            "stats" => Command::Stats,
            "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        }
    }
}

pub const HELP_TEXT: &str = "\
commands:
  ls     list registered subdomains
  lh     list registered hosts
  stats  show registry counters
  end    shut the server down
";

/// Render a registry snapshot, one entry per line
pub fn render_entries(entries: &[RegistryEntry]) -> String {
    if entries.is_empty() {
        return "(empty)\n".to_string();
    }

    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "{} => {} (registered {})",
            entry.name,
            entry.endpoint,
            entry.registered_at.to_rfc3339()
        );
    }
    out
}

pub fn render_stats(stats: &RegistryStatsSnapshot) -> String {
    format!(
        "registrations: {}\nconflicts: {}\ninvalid names: {}\nlookups: {} ({} hits)\n",
        stats.registrations, stats.conflicts, stats.invalid_names, stats.lookups, stats.lookup_hits
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ChildKind;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("end"), Command::End);
        assert_eq!(Command::parse("  ls \n"), Command::ListSubdomains);
        assert_eq!(Command::parse("lh"), Command::ListHosts);
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("reboot"), Command::Unknown("reboot".to_string()));
    }

    #[test]
    fn test_render_entries() {
        assert_eq!(render_entries(&[]), "(empty)\n");

        let entry = RegistryEntry::new(
            ChildKind::Subdomain,
            "com".to_string(),
            "127.0.0.1:53100".parse().unwrap(),
        );
        let text = render_entries(&[entry]);
        assert!(text.starts_with("com => 127.0.0.1:53100 (registered "));
        assert_eq!(text.lines().count(), 1);
    }
}
