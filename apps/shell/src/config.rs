use std::{collections::HashMap, fs};

use shared::domain::Channel;
use state_core::SelectionPolicy;
use tracing::warn;

#[derive(Debug)]
pub struct Settings {
    pub log_filter: String,
    pub debug_events: bool,
    pub channel_order: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "info".into(),
            debug_events: false,
            channel_order: None,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("shell.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            if let Some(v) = file_cfg.get("log_filter").and_then(|v| v.as_str()) {
                settings.log_filter = v.to_string();
            }
            if let Some(v) = file_cfg.get("debug_events").and_then(|v| v.as_bool()) {
                settings.debug_events = v;
            }
            if let Some(order) = file_cfg.get("channel_order").and_then(|v| v.as_array()) {
                settings.channel_order = Some(
                    order
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                );
            }
        }
    }

    if let Ok(v) = std::env::var("SHELL_LOG_FILTER") {
        settings.log_filter = v;
    }
    if let Ok(v) = std::env::var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Ok(v) = std::env::var("SHELL_DEBUG_EVENTS") {
        settings.debug_events = v == "1" || v.eq_ignore_ascii_case("true");
    }

    if let Ok(v) = std::env::var("SHELL_CHANNEL_ORDER") {
        settings.channel_order = Some(v.split(',').map(|s| s.trim().to_string()).collect());
    }

    settings
}

fn parse_channel(name: &str) -> Option<Channel> {
    match name {
        "controls" => Some(Channel::Controls),
        "nav" => Some(Channel::Nav),
        "api" => Some(Channel::Api),
        "ws" => Some(Channel::Ws),
        "errors" => Some(Channel::Errors),
        _ => None,
    }
}

impl Settings {
    /// Fixed order when a complete, valid five-channel order is configured;
    /// round-robin otherwise.
    pub fn selection_policy(&self) -> SelectionPolicy {
        let Some(names) = &self.channel_order else {
            return SelectionPolicy::RoundRobin;
        };
        let parsed: Vec<Channel> = names.iter().filter_map(|n| parse_channel(n)).collect();
        let mut seen: Vec<Channel> = parsed.clone();
        seen.sort_by_key(|c| c.as_str());
        seen.dedup();
        if parsed.len() == Channel::ALL.len() && seen.len() == Channel::ALL.len() {
            let mut order = [Channel::Controls; 5];
            order.copy_from_slice(&parsed);
            SelectionPolicy::Fixed(order)
        } else {
            warn!(?names, "invalid channel_order; using round-robin");
            SelectionPolicy::RoundRobin
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_round_robin() {
        let settings = Settings::default();
        assert_eq!(settings.selection_policy(), SelectionPolicy::RoundRobin);
    }

    #[test]
    fn complete_order_yields_fixed_policy() {
        let settings = Settings {
            channel_order: Some(
                ["nav", "controls", "api", "ws", "errors"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            ),
            ..Settings::default()
        };
        assert_eq!(
            settings.selection_policy(),
            SelectionPolicy::Fixed([
                Channel::Nav,
                Channel::Controls,
                Channel::Api,
                Channel::Ws,
                Channel::Errors,
            ])
        );
    }

    #[test]
    fn incomplete_or_unknown_order_falls_back() {
        let settings = Settings {
            channel_order: Some(vec!["nav".into(), "bogus".into()]),
            ..Settings::default()
        };
        assert_eq!(settings.selection_policy(), SelectionPolicy::RoundRobin);
    }
}
