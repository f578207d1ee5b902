use anyhow::Result;
use lib_livehub::{EventName, LiveEvent, LiveHubClient};
use serde_json::Value;
use std::io::Write;

/// Renders one event as a single JSON line tagged with the live target and a
/// receive timestamp.
pub fn event_line(target: &str, event: &LiveEvent) -> Result<String> {
    let mut value = serde_json::to_value(event)?;
    if let Value::Object(map) = &mut value {
        map.insert("target".to_string(), Value::String(target.to_string()));
        map.insert("ts".to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
    }
    Ok(serde_json::to_string(&value)?)
}

/// Subscribes a stdout printer for each of `events`.
pub fn attach(client: &LiveHubClient, events: &[EventName]) {
    for &event in events {
        let target = client.target_id().to_string();
        client.on(event, move |payload| {
            let line = event_line(&target, payload)?;
            let mut out = std::io::stdout().lock();
            writeln!(out, "{}", line)?;
            out.flush()?;
            Ok(())
        });
    }
    log::info!("Printing {} event kind(s) for '{}'", events.len(), client.target_id());
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_livehub::proto_handler::ChatMessage;
    use lib_livehub::HubOptions;

    #[test]
    fn test_event_line_shape() {
        let chat = LiveEvent::Chat(ChatMessage { comment: "hello".to_string(), ..Default::default() });
        let line = event_line("room-1", &chat).unwrap();
        assert!(!line.contains('\n'));

        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "chat");
        assert_eq!(value["target"], "room-1");
        assert_eq!(value["data"]["comment"], "hello");
        assert!(value["ts"].is_string());
    }

    #[test]
    fn test_lifecycle_lines() {
        let value: Value = serde_json::from_str(&event_line("r", &LiveEvent::Connected).unwrap()).unwrap();
        assert_eq!(value["event"], "connected");

        let down = LiveEvent::Disconnected { reason: "connection closed (code: 1000, reason: bye)".to_string() };
        let value: Value = serde_json::from_str(&event_line("r", &down).unwrap()).unwrap();
        assert_eq!(value["event"], "disconnected");
        assert_eq!(value["data"]["reason"], "connection closed (code: 1000, reason: bye)");
    }

    #[test]
    fn test_attach_registers_one_printer_per_event() {
        let client = LiveHubClient::new("room", HubOptions::default());
        attach(&client, &[EventName::Chat, EventName::Gift]);
        assert_eq!(client.registry().subscriber_count(EventName::Chat), 1);
        assert_eq!(client.registry().subscriber_count(EventName::Gift), 1);
        assert_eq!(client.registry().subscriber_count(EventName::Like), 0);
    }
}
