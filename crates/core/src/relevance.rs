/// Case-insensitive keyword containment test.
///
/// Used at two independent points: deciding whether a catalog entry enters a
/// generation at all (subject / body) and whether an update is worth
/// announcing (last reply body).  An empty set matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keywords {
    needles: Vec<String>,
}

impl Keywords {
    /// Blank entries are dropped; they would otherwise match every text.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let needles = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { needles }
    }

    pub fn is_empty(&self) -> bool {
        self.needles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.needles.len()
    }

    pub fn matches(&self, text: &str) -> bool {
        if self.needles.is_empty() || text.is_empty() {
            return false;
        }
        let haystack = text.to_lowercase();
        self.needles.iter().any(|needle| haystack.contains(needle.as_str()))
    }

    /// `true` when any of `texts` matches.
    pub fn matches_any(&self, texts: &[&str]) -> bool {
        texts.iter().any(|text| self.matches(text))
    }
}
