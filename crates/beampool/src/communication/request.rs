/// One named input of a [`Payload`], laid out as `factors x positions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEntry {
    pub name: String,
    pub values: Vec<Vec<u32>>,
}

/// The ordered, named inputs for a single sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    entries: Vec<PayloadEntry>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an input, keeping insertion order.
    pub fn with(mut self, name: impl Into<String>, values: Vec<Vec<u32>>) -> Self {
        self.entries.push(PayloadEntry { name: name.into(), values });
        self
    }

    pub fn entries(&self) -> &[PayloadEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&PayloadEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Length of the first factor row of the first input.
    pub fn source_len(&self) -> usize {
        self.entries
            .first()
            .and_then(|entry| entry.values.first())
            .map_or(0, Vec::len)
    }
}

/// # Request
///
/// A sentence queued for decoding. `index` is the sentence's position in the
/// input stream and is the key the collector uses to restore order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub index: usize,
    pub payload: Payload,
}

impl Request {
    pub fn new(index: usize, payload: Payload) -> Self {
        Self { index, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_keeps_entry_order() {
        let payload = Payload::new()
            .with("x", vec![vec![4, 5, 0]])
            .with("x_mask", vec![vec![1, 1, 1]]);

        let names: Vec<_> = payload.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["x", "x_mask"]);
        assert_eq!(payload.source_len(), 3);
        assert_eq!(payload.get("x_mask").map(|e| e.values[0].len()), Some(3));
        assert!(payload.get("y").is_none());
    }

    #[test]
    fn test_empty_payload_has_no_length() {
        assert_eq!(Payload::new().source_len(), 0);
    }
}
