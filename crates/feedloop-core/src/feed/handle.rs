/// The feed being consumed plus the resumption cursor ("ack id").
///
/// Replaced wholesale on recreation; only `cursor` changes in place, after
/// each successful read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedHandle {
    pub id: String,
    pub cursor: String,
}

impl FeedHandle {
    /// Handle for `id` with an empty cursor.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cursor: String::new(),
        }
    }

    pub fn advance(&mut self, cursor: String) {
        self.cursor = cursor;
    }
}
