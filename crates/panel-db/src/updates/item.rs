//! Reviewed item update builder.

use panel_core::entities::ItemContent;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ItemContent>,
}

impl ItemUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.subject.is_none() && self.content.is_none()
    }
}

#[derive(Default)]
pub struct ItemUpdateBuilder(ItemUpdate);

impl ItemUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(ItemUpdate::default())
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.0.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: Option<String>) -> Self {
        self.0.subject = Some(subject);
        self
    }

    /// Replace the whole content block.
    #[must_use]
    pub fn content(mut self, content: ItemContent) -> Self {
        self.0.content = Some(content);
        self
    }

    #[must_use]
    pub fn build(self) -> ItemUpdate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_set_fields_serialize() {
        let update = ItemUpdateBuilder::new().title("New title").subject(None).build();
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "title": "New title", "subject": null }));
        assert!(!update.is_empty());
        assert!(ItemUpdateBuilder::new().build().is_empty());
    }
}
