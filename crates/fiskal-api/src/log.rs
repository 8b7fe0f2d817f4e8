// Verbosity-gated log records on top of `tracing`.
//
// The client decides what to emit; the installed subscriber decides where it
// goes and may filter further.

use serde_json::Value;

/// Client-side log threshold. Records above the threshold are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Error = 0,
    Warning = 1,
    #[default]
    Info = 2,
}

impl Verbosity {
    /// Map a numeric level (0 = error, 1 = warning, 2 = info). Larger
    /// values clamp to info.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Error,
            1 => Self::Warning,
            _ => Self::Info,
        }
    }
}

/// Emit `label` with a structured `context` if `level` passes `threshold`.
pub(crate) fn emit(threshold: Verbosity, level: Verbosity, label: &str, context: &Value) {
    if level > threshold {
        return;
    }
    match level {
        Verbosity::Error => tracing::error!(%context, "{label}"),
        Verbosity::Warning => tracing::warn!(%context, "{label}"),
        Verbosity::Info => tracing::info!(%context, "{label}"),
    }
}

/// Copy of `value` with secret-bearing fields masked.
pub(crate) fn redact(value: &Value, keys: &[&str]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    if keys.contains(&k.as_str()) {
                        (k.clone(), Value::String("***".into()))
                    } else {
                        (k.clone(), redact(v, keys))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact(v, keys)).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use tracing::Level;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;

    /// Records `(level, message)` for every event it sees.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<(Level, String)>>>);

    impl<S: tracing::Subscriber> Layer<S> for Capture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut message = Message::default();
            event.record(&mut message);
            self.0.lock().unwrap().push((*event.metadata().level(), message.0));
        }
    }

    #[derive(Default)]
    struct Message(String);

    impl Visit for Message {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    fn captured(threshold: Verbosity, records: &[(Verbosity, &str)]) -> Vec<(Level, String)> {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        tracing::subscriber::with_default(subscriber, || {
            for (level, label) in records {
                emit(threshold, *level, label, &json!({ "n": 1 }));
            }
        });
        capture.0.lock().unwrap().clone()
    }

    #[test]
    fn records_above_threshold_are_dropped() {
        let events = captured(
            Verbosity::Warning,
            &[
                (Verbosity::Info, "chatty"),
                (Verbosity::Warning, "Token expired"),
                (Verbosity::Error, "Create TSS error"),
            ],
        );
        assert_eq!(
            events,
            vec![
                (Level::WARN, "Token expired".to_owned()),
                (Level::ERROR, "Create TSS error".to_owned()),
            ]
        );
    }

    #[test]
    fn info_threshold_emits_everything() {
        let events = captured(Verbosity::Info, &[(Verbosity::Info, "TSS API")]);
        assert_eq!(events, vec![(Level::INFO, "TSS API".to_owned())]);
        assert!(captured(Verbosity::Error, &[(Verbosity::Warning, "w")]).is_empty());
    }

    #[test]
    fn level_clamps_to_info() {
        assert_eq!(Verbosity::from_level(0), Verbosity::Error);
        assert_eq!(Verbosity::from_level(1), Verbosity::Warning);
        assert_eq!(Verbosity::from_level(2), Verbosity::Info);
        assert_eq!(Verbosity::from_level(9), Verbosity::Info);
    }

    #[test]
    fn ordering_gates_records() {
        assert!(Verbosity::Info > Verbosity::Warning);
        assert!(Verbosity::Error < Verbosity::Warning);
    }

    #[test]
    fn redacts_nested_keys() {
        let value = json!({"api_key": "k", "api_secret": "s", "nested": [{"api_secret": "x"}]});
        let masked = redact(&value, &["api_secret"]);
        assert_eq!(masked, json!({"api_key": "k", "api_secret": "***", "nested": [{"api_secret": "***"}]}));
    }
}
