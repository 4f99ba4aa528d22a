//! Line parsers for the monitored log sources.
//!
//! Each parser is a pure function from one log line to either "no match" or a
//! formatted alert text. Parsers never fail: anything they cannot make sense
//! of is "no match".

use regex::Regex;
use serde::Deserialize;

/// Parser selector used in the config file. Resolved into a [`LineParser`]
/// once at startup, so no string matching happens on the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    SshLogins,
    Fail2banBans,
}

impl ParserKind {
    pub fn build(self) -> LineParser {
        match self {
            ParserKind::SshLogins => LineParser::ssh_logins(),
            ParserKind::Fail2banBans => LineParser::fail2ban_bans(),
        }
    }
}

/// A compiled parser for one log source.
#[derive(Debug, Clone)]
pub enum LineParser {
    /// sshd `Accepted <method> for <user> from <ip>` lines.
    SshLogins(Regex),
    /// fail2ban `[<jail>] Ban <ip>` lines.
    Fail2banBans(Regex),
}

impl LineParser {
    pub fn ssh_logins() -> Self {
        // method is password/publickey/keyboard-interactive/...
        LineParser::SshLogins(
            Regex::new(r"Accepted (\S+) for (\S+) from (\S+)").expect("static regex is valid"),
        )
    }

    pub fn fail2ban_bans() -> Self {
        LineParser::Fail2banBans(
            Regex::new(r"(?:\[([^\]\s]+)\]\s+)?\bBan (\S+)").expect("static regex is valid"),
        )
    }

    /// Run the parser over a single line. Returns the formatted alert text on
    /// a match, `None` otherwise.
    pub fn parse(&self, line: &str) -> Option<String> {
        match self {
            LineParser::SshLogins(re) => {
                let captures = re.captures(line)?;
                let method = captures.get(1)?.as_str();
                let user = captures.get(2)?.as_str();
                let ip = captures.get(3)?.as_str();
                Some(format!("🔐 SSH login: **{user}** from `{ip}` ({method})"))
            }
            LineParser::Fail2banBans(re) => {
                let captures = re.captures(line)?;
                let ip = captures.get(2)?.as_str();
                match captures.get(1) {
                    Some(jail) => Some(format!("⛔ Banned `{ip}` (jail: {})", jail.as_str())),
                    None => Some(format!("⛔ Banned `{ip}`")),
                }
            }
        }
    }
}
