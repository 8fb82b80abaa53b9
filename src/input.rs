//! Plain-text notification input.
//!
//! The expected layout is a header block of `key: value` lines, a blank
//! line, then free-form description text:
//!
//! ```text
//! timestamp: 1452504535
//! service:   some-service
//! event:     some-event
//! action:    some-action
//! host:      some-host
//!
//! multi-line message here...
//! ```

/// Structured view of a notification read from stdin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Input {
    /// Seconds since the epoch, `0` when absent or unparsable.
    pub timestamp: i64,
    pub service: String,
    pub event: String,
    pub action: String,
    pub host: String,
    pub description: String,
    pub url: String,
}

impl Input {
    /// Parse raw stdin bytes.
    ///
    /// Every recognized header line clears the description collected so
    /// far, so stray text before a header key is dropped. Lines without a
    /// colon, unknown keys, and everything after the first blank line are
    /// kept.
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut input = Input::default();
        let mut description = String::new();
        let mut in_description = false;

        for line in text.trim().lines() {
            if !in_description && line.is_empty() {
                in_description = true;
                continue;
            }
            if in_description {
                push_line(&mut description, line);
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                push_line(&mut description, line);
                continue;
            };

            if input.set_field(key.trim(), value.trim()) {
                description.clear();
            } else {
                push_line(&mut description, line);
            }
        }

        input.description = description.trim().to_string();
        input
    }

    /// Assign a header field. Returns `false` for keys that are not part of
    /// the header vocabulary.
    fn set_field(&mut self, key: &str, value: &str) -> bool {
        match key {
            "timestamp" => self.timestamp = value.parse().unwrap_or(0),
            "service" => self.service = value.to_string(),
            "event" => self.event = value.to_string(),
            "action" => self.action = value.to_string(),
            "host" => self.host = value.to_string(),
            "url" => self.url = value.to_string(),
            _ => return false,
        }
        true
    }
}

fn push_line(buf: &mut String, line: &str) {
    buf.push_str(line);
    buf.push('\n');
}
