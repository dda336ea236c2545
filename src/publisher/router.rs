use std::collections::HashMap;

use crate::config::NotifyConfig;

/// Maps a table to the topic its notifications are published on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicRouter {
    default_topic: String,
    routes: HashMap<String, String>,
}

impl TopicRouter {
    pub fn new(default_topic: impl Into<String>) -> Self {
        Self {
            default_topic: default_topic.into(),
            routes: HashMap::new(),
        }
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        let routes = config
            .tables
            .iter()
            .filter_map(|(table, route)| route.topic.clone().map(|topic| (table.clone(), topic)))
            .collect();

        Self {
            default_topic: config.topic.clone(),
            routes,
        }
    }

    /// Send notifications of `table` to `topic` instead of the default.
    pub fn route(mut self, table: impl Into<String>, topic: impl Into<String>) -> Self {
        self.routes.insert(table.into(), topic.into());
        self
    }

    pub fn default_topic(&self) -> &str {
        &self.default_topic
    }

    pub fn topic_for(&self, table: &str) -> &str {
        self.routes
            .get(table)
            .map(String::as_str)
            .unwrap_or(&self.default_topic)
    }
}
