use tracing::info;

/// One failed check, as it appears in the alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub title: String,
    pub content: String,
}

impl FailureRecord {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Failures collected over a run, in the order they were recorded.
#[derive(Debug, Default)]
pub struct FailureAccumulator {
    records: Vec<FailureRecord>,
}

impl FailureAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, title: impl Into<String>, content: impl Into<String>) {
        let record = FailureRecord::new(title, content);
        info!(title = %record.title, content = %record.content, "Recorded failure.");
        self.records.push(record);
    }

    /// Hands back everything recorded so far and starts over empty.
    pub fn drain(&mut self) -> Vec<FailureRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
