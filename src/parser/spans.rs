/// All known section anchors in their fixed page order; `certificates`
/// only serves as a boundary that stops the last category span from
/// running into the certification table.
const ALL_ANCHORS: [&str; 6] = [
    "nudity",
    "violence",
    "profanity",
    "alcohol",
    "frightening",
    "certificates",
];

/// Byte offsets of every anchor present in a document, sorted by position.
/// Two-pass scan: locate anchors first, then slice bounded spans between
/// consecutive offsets instead of lookahead-bounded regexes.
pub struct SectionSpans {
    offsets: Vec<(usize, &'static str)>,
}

impl SectionSpans {
    pub fn locate(html: &str) -> Self {
        let mut offsets: Vec<(usize, &'static str)> = ALL_ANCHORS
            .iter()
            .filter_map(|anchor| {
                let needle = format!("id=\"{anchor}\"");
                html.find(&needle).map(|pos| (pos, *anchor))
            })
            .collect();
        offsets.sort_by_key(|(pos, _)| *pos);
        Self { offsets }
    }

    /// The bounded span for one anchor: from its offset to the next known
    /// anchor or end of document. None when the anchor is absent.
    pub fn section<'a>(&self, html: &'a str, anchor: &str) -> Option<&'a str> {
        let idx = self.offsets.iter().position(|(_, a)| *a == anchor)?;
        let start = self.offsets[idx].0;
        let end = self
            .offsets
            .get(idx + 1)
            .map(|(pos, _)| *pos)
            .unwrap_or(html.len());
        Some(&html[start..end])
    }
}
