use indexmap::IndexMap;
use serde_json_bytes::Value;

/// One field of a client selection, as handed to a federated resolver.
///
/// Arguments are already resolved to wire values, variables included.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionNode {
    pub field_name: String,
    pub arguments: IndexMap<String, Value>,
    pub sub_selections: Vec<SelectionNode>,
}

impl SelectionNode {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ..Default::default()
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    pub fn with_selection(mut self, selection: SelectionNode) -> Self {
        self.sub_selections.push(selection);
        self
    }

    pub fn with_fields<'a>(mut self, field_names: impl IntoIterator<Item = &'a str>) -> Self {
        self.sub_selections
            .extend(field_names.into_iter().map(SelectionNode::new));
        self
    }

    /// Whether one of the immediate children selects `field_name`.
    pub fn selects(&self, field_name: &str) -> bool {
        self.sub_selections
            .iter()
            .any(|selection| selection.field_name == field_name)
    }
}
