//! Decoded protocol records

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PROMPT;
use super::parser::Cursor;

/// Category of a decoded record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Synchronous command result (`^done`, `^running`, `^error`)
    Result,
    /// Asynchronous notification (`*stopped`, `=thread-created`, `+download`)
    Notify,
    /// Console or target output (`~"..."`, `@"..."`)
    Stream,
    /// Debugger log output (`&"..."`)
    Log,
    /// Anything that does not follow the grammar
    Unknown,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordKind::Result => "result",
            RecordKind::Notify => "notify",
            RecordKind::Stream => "stream",
            RecordKind::Log => "log",
            RecordKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// One decoded line of debugger output. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub kind: RecordKind,

    /// Result or async class: `done`, `running`, `stopped`, `error`, ...
    pub message: Option<String>,

    /// Numeric token the command was prefixed with, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<u64>,

    /// Mapping for result/notify records, a string for stream/log/unknown records
    pub payload: Value,

    /// The line as it was received
    pub raw: String,
}

impl Record {
    /// Decode one output line.
    ///
    /// Returns `None` for blank lines and the `(gdb)` prompt. Lines that do not
    /// follow the grammar become `Unknown` records carrying the raw text.
    pub fn decode(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed == PROMPT {
            return None;
        }

        Some(Self::decode_record(line).unwrap_or_else(|| Self::unknown(line)))
    }

    fn decode_record(line: &str) -> Option<Self> {
        let digits = line.bytes().take_while(u8::is_ascii_digit).count();
        let token = if digits > 0 { line[..digits].parse().ok() } else { None };
        let rest = &line[digits..];
        let prefix = rest.chars().next()?;
        let body = &rest[prefix.len_utf8()..];

        match prefix {
            '^' | '*' | '=' | '+' => {
                let kind = if prefix == '^' { RecordKind::Result } else { RecordKind::Notify };
                let mut cur = Cursor::new(body);
                let class = cur.class()?;
                let payload = cur.results()?;
                Some(Self {
                    kind,
                    message: Some(class),
                    token,
                    payload: Value::Object(payload),
                    raw: line.to_string(),
                })
            }
            '~' | '@' | '&' if token.is_none() => {
                let mut cur = Cursor::new(body);
                let text = cur.c_string()?;
                if !cur.is_done() {
                    return None;
                }
                let kind = if prefix == '&' { RecordKind::Log } else { RecordKind::Stream };
                Some(Self {
                    kind,
                    message: None,
                    token: None,
                    payload: Value::String(text),
                    raw: line.to_string(),
                })
            }
            _ => None,
        }
    }

    fn unknown(line: &str) -> Self {
        Self {
            kind: RecordKind::Unknown,
            message: None,
            token: None,
            payload: Value::String(line.to_string()),
            raw: line.to_string(),
        }
    }

    /// Check whether this record has the given kind and message
    pub fn is(&self, kind: RecordKind, message: &str) -> bool {
        self.kind == kind && self.message.as_deref() == Some(message)
    }

    /// Text carried by stream, log and unknown records
    pub fn text(&self) -> Option<&str> {
        match self.kind {
            RecordKind::Stream | RecordKind::Log | RecordKind::Unknown => self.payload.as_str(),
            RecordKind::Result | RecordKind::Notify => None,
        }
    }

    /// The `msg` field of a `^error` record
    pub fn error_message(&self) -> Option<&str> {
        if self.is(RecordKind::Result, "error") {
            self.payload.get("msg").and_then(Value::as_str)
        } else {
            None
        }
    }

    /// Look up a field of a result/notify payload
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.as_object().and_then(|m| m.get(key))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}/{}", self.kind, message),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_result_done() {
        let rec = Record::decode("^done").unwrap();
        assert_eq!(rec.kind, RecordKind::Result);
        assert_eq!(rec.message.as_deref(), Some("done"));
        assert_eq!(rec.payload, json!({}));
        assert_eq!(rec.raw, "^done");
    }

    #[test]
    fn test_decode_token() {
        let rec = Record::decode("42^done,value=\"7\"").unwrap();
        assert_eq!(rec.token, Some(42));
        assert_eq!(rec.field("value"), Some(&json!("7")));
    }

    #[test]
    fn test_decode_stopped() {
        let rec = Record::decode(
            r#"*stopped,reason="signal-received",signal-name="SIGSEGV",frame={func="main",line="12"},thread-id="1""#,
        )
        .unwrap();
        assert!(rec.is(RecordKind::Notify, "stopped"));
        assert_eq!(rec.payload["signal-name"], "SIGSEGV");
        assert_eq!(rec.payload["frame"]["line"], "12");
        assert_eq!(rec.to_string(), "notify/stopped");
    }

    #[test]
    fn test_decode_notify_async() {
        let rec = Record::decode(r#"=thread-group-added,id="i1""#).unwrap();
        assert!(rec.is(RecordKind::Notify, "thread-group-added"));
    }

    #[test]
    fn test_decode_console_stream() {
        let rec = Record::decode(r##"~"#0  main () at x.c:12\n""##).unwrap();
        assert_eq!(rec.kind, RecordKind::Stream);
        assert_eq!(rec.text(), Some("#0  main () at x.c:12\n"));
        assert!(rec.message.is_none());
    }

    #[test]
    fn test_decode_log_stream() {
        let rec = Record::decode(r#"&"bt 128\n""#).unwrap();
        assert_eq!(rec.kind, RecordKind::Log);
        assert_eq!(rec.text(), Some("bt 128\n"));
    }

    #[test]
    fn test_decode_error() {
        let rec = Record::decode(r#"^error,msg="No symbol \"foo\" in current context.""#).unwrap();
        assert_eq!(rec.error_message(), Some("No symbol \"foo\" in current context."));
    }

    #[test]
    fn test_prompt_and_blank_skipped() {
        assert!(Record::decode("(gdb) ").is_none());
        assert!(Record::decode("(gdb)\n").is_none());
        assert!(Record::decode("   ").is_none());
    }

    #[test]
    fn test_malformed_becomes_unknown() {
        for line in ["rr: Saving execution to trace directory", "^done,broken=", "~\"unterminated"] {
            let rec = Record::decode(line).unwrap();
            assert_eq!(rec.kind, RecordKind::Unknown, "line: {}", line);
            assert_eq!(rec.text(), Some(line));
        }
    }

    #[test]
    fn test_result_has_no_text() {
        let rec = Record::decode("^running").unwrap();
        assert!(rec.text().is_none());
        assert!(rec.error_message().is_none());
    }

    #[test]
    fn test_record_serialization() {
        let rec = Record::decode("^done").unwrap();
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["kind"], "result");
        assert_eq!(value["message"], "done");
        assert!(value.get("token").is_none());
    }
}
