//! Message payloads for the custom and template send endpoints.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::input::Input;

/// Length budget WeChat enforces across the visible template fields.
pub const DESC_MAX_LENGTH: usize = 200;

/// Color applied to every template slot.
pub const SLOT_COLOR: &str = "#000";

const ELLIPSIS: &str = "...";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outgoing payload. Serializes to exactly the body the matching endpoint
/// expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Text(TextMessage),
    Template(TemplateMessage),
}

impl Message {
    /// Path segment of the send endpoint: `message/<kind>/send`.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Text(_) => "custom",
            Message::Template(_) => "template",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Message::Text(msg) => &msg.touser,
            Message::Template(msg) => &msg.touser,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMessage {
    pub touser: String,
    pub msgtype: &'static str,
    pub text: TextContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateMessage {
    pub touser: String,
    pub template_id: String,
    pub url: String,
    pub data: TemplateData,
}

/// Template slots, keyed by the identifiers the template defines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateData {
    #[serde(rename = "first")]
    pub description: ValueColor,
    #[serde(rename = "time")]
    pub datetime: ValueColor,
    #[serde(rename = "ip_list")]
    pub host: ValueColor,
    #[serde(rename = "sec_type")]
    pub kind: ValueColor,
    pub remark: ValueColor,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValueColor {
    pub value: String,
    pub color: String,
}

impl ValueColor {
    fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            color: SLOT_COLOR.to_string(),
        }
    }
}

/// Settings for building template messages.
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    pub template_id: String,
    /// Viewer page used for auto URLs; `None` disables them.
    pub auto_url_prefix: Option<String>,
}

/// Un-templated message carrying stdin verbatim.
pub fn text_message(openid: &str, raw: &[u8]) -> Message {
    Message::Text(TextMessage {
        touser: openid.to_string(),
        msgtype: "text",
        text: TextContent {
            content: String::from_utf8_lossy(raw).into_owned(),
        },
    })
}

/// Template message built from parsed input.
pub fn template_message(openid: &str, input: &Input, options: &TemplateOptions) -> Message {
    let datetime = format_timestamp(input.timestamp);
    let info_len = char_len(&datetime) + char_len(&input.host) + char_len(&input.action);

    let mut url = input.url.clone();
    let description = match truncate_description(&input.description, info_len) {
        Some(truncated) => {
            if url.is_empty() {
                if let Some(prefix) = options.auto_url_prefix.as_deref() {
                    url = auto_url(prefix, &input.description);
                }
            }
            truncated
        }
        None => input.description.clone(),
    };

    Message::Template(TemplateMessage {
        touser: openid.to_string(),
        template_id: options.template_id.clone(),
        url,
        data: TemplateData {
            description: ValueColor::new(description),
            datetime: ValueColor::new(datetime),
            host: ValueColor::new(input.host.as_str()),
            kind: ValueColor::new(input.action.as_str()),
            remark: ValueColor::new(""),
        },
    })
}

/// Local `YYYY-MM-DD HH:MM:SS`, or empty for non-positive timestamps.
pub fn format_timestamp(timestamp: i64) -> String {
    if timestamp <= 0 {
        return String::new();
    }
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format(DATETIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// Shortened description when it does not fit next to `info_len`
/// characters of other fields, `None` when it fits.
pub fn truncate_description(description: &str, info_len: usize) -> Option<String> {
    if char_len(description) + info_len <= DESC_MAX_LENGTH {
        return None;
    }
    let keep = DESC_MAX_LENGTH
        .saturating_sub(info_len)
        .saturating_sub(ELLIPSIS.len());
    let mut truncated: String = description.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    Some(truncated)
}

/// Viewer link embedding the full description as standard base64.
pub fn auto_url(prefix: &str, description: &str) -> String {
    format!("{}#{}", prefix, STANDARD.encode(description.as_bytes()))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PREFIX: &str = "https://viewer.example.com/auto-url.html";

    fn options(auto_url: bool) -> TemplateOptions {
        TemplateOptions {
            template_id: "tmpl".to_string(),
            auto_url_prefix: auto_url.then(|| PREFIX.to_string()),
        }
    }

    fn template(msg: &Message) -> &TemplateMessage {
        match msg {
            Message::Template(t) => t,
            Message::Text(_) => panic!("expected template message"),
        }
    }

    #[test]
    fn text_message_serializes_to_custom_payload() {
        let msg = text_message("oABC", b"  raw body\n");

        assert_eq!(msg.kind(), "custom");
        assert_eq!(msg.recipient(), "oABC");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "touser": "oABC",
                "msgtype": "text",
                "text": { "content": "  raw body\n" }
            })
        );
    }

    #[test]
    fn template_message_serializes_slots() {
        let input = Input {
            host: "web-1".into(),
            action: "restart".into(),
            description: "nginx is down".into(),
            url: "https://status.example.com".into(),
            ..Default::default()
        };

        let msg = template_message("oABC", &input, &options(true));

        assert_eq!(msg.kind(), "template");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "touser": "oABC",
                "template_id": "tmpl",
                "url": "https://status.example.com",
                "data": {
                    "first":    { "value": "nginx is down", "color": "#000" },
                    "time":     { "value": "",              "color": "#000" },
                    "ip_list":  { "value": "web-1",         "color": "#000" },
                    "sec_type": { "value": "restart",       "color": "#000" },
                    "remark":   { "value": "",              "color": "#000" }
                }
            })
        );
    }

    #[test]
    fn long_description_keeps_197_chars_plus_ellipsis() {
        let description = "x".repeat(250);
        let input = Input {
            description: description.clone(),
            ..Default::default()
        };

        let msg = template_message("o", &input, &options(false));
        let value = &template(&msg).data.description.value;

        assert_eq!(value.len(), 200);
        assert_eq!(&value[..197], &description[..197]);
        assert!(value.ends_with("..."));
        assert!(template(&msg).url.is_empty());
    }

    #[test]
    fn truncation_accounts_for_other_fields() {
        let info_len = "2016-01-11 17:28:55".len() + "web-1".len() + "restart".len();
        let truncated = truncate_description(&"y".repeat(190), info_len).unwrap();
        assert_eq!(truncated.chars().count(), 200 - info_len);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let description = "警".repeat(201);
        let truncated = truncate_description(&description, 0).unwrap();
        assert_eq!(truncated, format!("{}...", "警".repeat(197)));
    }

    #[test]
    fn truncation_saturates_when_other_fields_fill_the_budget() {
        assert_eq!(truncate_description("abc", 250).as_deref(), Some("..."));
    }

    #[test]
    fn short_description_is_untouched_and_no_auto_url() {
        let input = Input {
            description: "short".into(),
            ..Default::default()
        };

        let msg = template_message("o", &input, &options(true));

        assert_eq!(template(&msg).data.description.value, "short");
        assert!(template(&msg).url.is_empty());
    }

    #[test]
    fn description_exactly_at_limit_is_not_truncated() {
        assert!(truncate_description(&"z".repeat(200), 0).is_none());
        assert!(truncate_description(&"z".repeat(190), 10).is_none());
    }

    #[test]
    fn auto_url_encodes_untruncated_description() {
        let description = "line\n".repeat(60);
        let input = Input {
            description: description.clone(),
            ..Default::default()
        };

        let msg = template_message("o", &input, &options(true));

        assert_eq!(
            template(&msg).url,
            format!("{}#{}", PREFIX, STANDARD.encode(description.as_bytes()))
        );
        assert!(template(&msg).data.description.value.ends_with("..."));
    }

    #[test]
    fn auto_url_never_replaces_explicit_url() {
        let input = Input {
            description: "d".repeat(300),
            url: "https://given.example.com".into(),
            ..Default::default()
        };

        let msg = template_message("o", &input, &options(true));

        assert_eq!(template(&msg).url, "https://given.example.com");
    }

    #[test]
    fn auto_url_disabled_leaves_url_empty() {
        let input = Input {
            description: "d".repeat(300),
            ..Default::default()
        };

        let msg = template_message("o", &input, &options(false));

        assert!(template(&msg).url.is_empty());
    }

    #[test]
    fn auto_url_uses_standard_alphabet_with_padding() {
        assert_eq!(auto_url("p", "??>"), "p#Pz8+");
        assert_eq!(auto_url("p", "a"), "p#YQ==");
    }

    #[test]
    fn format_timestamp_matches_local_time() {
        let expected = Local
            .timestamp_opt(1452504535, 0)
            .unwrap()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        assert_eq!(format_timestamp(1452504535), expected);
        assert_eq!(format_timestamp(1452504535).len(), 19);
    }

    #[test]
    fn format_timestamp_empty_for_absent() {
        assert_eq!(format_timestamp(0), "");
        assert_eq!(format_timestamp(-5), "");
    }
}
