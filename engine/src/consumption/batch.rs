use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::formula::EvaluatedTerms;

/// Partial update for one item, merged by id.
#[derive(Debug, Clone, Serialize)]
pub struct ItemUpdate {
    pub id: String,
    pub fields: IndexMap<String, Value>,
}

/// In-memory accumulator of the mutations one activation proposes. Built up
/// in target order during a resolution pass, discarded wholesale on failure,
/// and handed to the host's [`BatchSink`] as one unit on success.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateBatch {
    /// Dotted-path → new value, merged into actor state.
    pub actor: IndexMap<String, Value>,
    /// One entry per affected item.
    pub items: Vec<ItemUpdate>,
    /// Dotted-path → new value for the activating entity itself.
    pub activity: IndexMap<String, Value>,
    /// Randomized rolls produced while resolving costs, kept for display.
    pub rolls: Vec<EvaluatedTerms>,
}

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_actor(&mut self, path: &str, value: impl Into<Value>) {
        self.actor.insert(path.to_string(), value.into());
    }

    pub fn set_activity(&mut self, path: &str, value: impl Into<Value>) {
        self.activity.insert(path.to_string(), value.into());
    }

    pub fn set_item(&mut self, id: &str, path: &str, value: impl Into<Value>) {
        let entry = match self.items.iter_mut().find(|u| u.id == id) {
            Some(existing) => existing,
            None => {
                self.items.push(ItemUpdate {
                    id: id.to_string(),
                    fields: IndexMap::new(),
                });
                self.items.last_mut().expect("just pushed")
            }
        };
        entry.fields.insert(path.to_string(), value.into());
    }

    pub fn push_roll(&mut self, roll: EvaluatedTerms) {
        self.rolls.push(roll);
    }

    pub fn is_empty(&self) -> bool {
        self.actor.is_empty()
            && self.items.is_empty()
            && self.activity.is_empty()
            && self.rolls.is_empty()
    }
}

/// The sole write boundary: invoked once per successful resolution. Whether
/// the write is atomic across actor, items, and activity is the host's
/// contract to uphold.
pub trait BatchSink {
    fn commit(&mut self, batch: &UpdateBatch) -> anyhow::Result<()>;
}
