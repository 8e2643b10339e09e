/// A pure text transform applied to every rendered hypothesis.
pub trait TextFilter: Send + Sync {
    fn filter(&self, text: &str) -> String;
}

impl<F> TextFilter for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn filter(&self, text: &str) -> String {
        self(text)
    }
}

/// Filters applied left to right in the order they were added.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn TextFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl TextFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn apply(&self, text: &str) -> String {
        self.filters
            .iter()
            .fold(text.to_string(), |text, filter| filter.filter(&text))
    }
}

/// Joins BPE subword units marked with a trailing `@@`.
pub struct BpeMerge;

impl TextFilter for BpeMerge {
    fn filter(&self, text: &str) -> String {
        let merged = text.replace("@@ ", "");
        match merged.strip_suffix("@@") {
            Some(stripped) => stripped.to_string(),
            None => merged,
        }
    }
}
