//! Advisory Text Parser
//!
//! Splits free-form agronomist text into the five advice sections. A line is
//! a heading when it looks like one (markdown `#`, bold `**`, or a short label
//! before a colon) and its label mentions a section keyword. Text that never
//! produces a heading is returned unstructured.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Labelled part of the advice
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceSection {
    Suitability,
    SowingSeason,
    Fertilizer,
    DiseaseRisks,
    YieldTips,
}

impl AdviceSection {
    pub const ALL: [AdviceSection; 5] = [
        AdviceSection::Suitability,
        AdviceSection::SowingSeason,
        AdviceSection::Fertilizer,
        AdviceSection::DiseaseRisks,
        AdviceSection::YieldTips,
    ];

    /// Heading keywords, checked in section order
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            AdviceSection::Suitability => &["suitability", "suitable for"],
            AdviceSection::SowingSeason => &["sowing", "planting", "season"],
            AdviceSection::Fertilizer => &["fertilizer", "fertiliser", "npk", "nutrient"],
            AdviceSection::DiseaseRisks => &["disease", "pest", "risk"],
            AdviceSection::YieldTips => &["yield", "optimization", "tips", "maximize"],
        }
    }

    fn detect(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|s| s.keywords().iter().any(|k| lower.contains(k)))
    }
}

/// Parsed advisory reply
#[derive(Debug, Clone, PartialEq)]
pub enum Advice {
    /// At least one section heading was recognised
    Structured {
        sections: BTreeMap<AdviceSection, String>,
        full_text: String,
    },
    /// No headings; only the raw reply is available
    Unstructured { full_text: String },
}

impl Advice {
    pub fn full_text(&self) -> &str {
        match self {
            Advice::Structured { full_text, .. } | Advice::Unstructured { full_text } => full_text,
        }
    }

    pub fn section(&self, section: AdviceSection) -> Option<&str> {
        match self {
            Advice::Structured { sections, .. } => sections.get(&section).map(String::as_str),
            Advice::Unstructured { .. } => None,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Advice::Structured { .. })
    }
}

/// Wire shape: every section key present (empty when missing) plus a flag
#[derive(Serialize)]
struct AdviceBody<'a> {
    suitability: &'a str,
    sowing_season: &'a str,
    fertilizer: &'a str,
    disease_risks: &'a str,
    yield_tips: &'a str,
    full_text: &'a str,
    structured: bool,
}

impl Serialize for Advice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let get = |s| self.section(s).unwrap_or("");
        AdviceBody {
            suitability: get(AdviceSection::Suitability),
            sowing_season: get(AdviceSection::SowingSeason),
            fertilizer: get(AdviceSection::Fertilizer),
            disease_risks: get(AdviceSection::DiseaseRisks),
            yield_tips: get(AdviceSection::YieldTips),
            full_text: self.full_text(),
            structured: self.is_structured(),
        }
        .serialize(serializer)
    }
}

/// Parse a reply; `None` when it holds no text at all
pub fn parse_advice(text: &str) -> Option<Advice> {
    if text.trim().is_empty() {
        return None;
    }

    let mut sections: BTreeMap<AdviceSection, String> = BTreeMap::new();
    let mut current: Option<AdviceSection> = None;
    let mut buffer: Vec<String> = Vec::new();

    let mut flush = |section: Option<AdviceSection>, buffer: &mut Vec<String>| {
        if let Some(section) = section {
            let joined = collapse_whitespace(&buffer.join(" "));
            if !joined.is_empty() {
                let entry = sections.entry(section).or_default();
                if !entry.is_empty() {
                    entry.push(' ');
                }
                entry.push_str(&joined);
            }
        }
        buffer.clear();
    };

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let top_level = !raw.starts_with(char::is_whitespace);

        if let Some((section, rest)) = heading(line, top_level) {
            flush(current, &mut buffer);
            // A repeated heading still switches sections so its body is kept
            current = Some(section);
            if !rest.is_empty() {
                buffer.push(rest);
            }
        } else if current.is_some() && !line.starts_with('#') {
            let content = strip_bullet(line);
            if !content.is_empty() {
                buffer.push(content);
            }
        }
    }
    flush(current, &mut buffer);

    let full_text = text.to_string();
    Some(if sections.is_empty() {
        Advice::Unstructured { full_text }
    } else {
        Advice::Structured { sections, full_text }
    })
}

/// Recognise a heading line; returns its section and any same-line content
///
/// List items and indented lines only open a section when they are markdown
/// `#` headings; bold labels inside bullets are body text.
fn heading(line: &str, top_level: bool) -> Option<(AdviceSection, String)> {
    let markdown = line.starts_with('#');
    if !markdown && (!top_level || is_list_item(line)) {
        return None;
    }
    let body = strip_numbering(line.trim_start_matches('#').trim());
    let emphasised = body.starts_with("**") || body.starts_with("__");

    let (label, rest) = match body.split_once(':') {
        Some((label, rest)) => (label, Some(rest)),
        None => (body, None),
    };
    let short_label = rest.is_some() && label.split_whitespace().count() <= 5;

    if !(markdown || emphasised || short_label) {
        return None;
    }
    // Bold body text such as "**Note** that ..." is not a heading
    if emphasised && !markdown && rest.is_none() && !body.trim_end().ends_with("**") {
        return None;
    }

    let section = AdviceSection::detect(label.trim_matches(|c: char| c == '*' || c == '_'))?;
    let rest = rest
        .map(|r| strip_bullet(r.trim_start_matches(['*', '_'])))
        .unwrap_or_default();
    Some((section, rest))
}

/// `* item`, `- item`, `+ item` or `• item`; `**bold**` is not a marker
fn is_list_item(line: &str) -> bool {
    line.starts_with('•')
        || ["* ", "- ", "+ ", "*\t", "-\t"]
            .iter()
            .any(|marker| line.starts_with(marker))
}

/// Drop list markers and emphasis from a content line
fn strip_bullet(line: &str) -> String {
    let trimmed = line.trim_start_matches(['*', '-', '•']).trim_start();
    strip_numbering(trimmed).replace("**", "").trim().to_string()
}

/// "1. text" / "2) text" → "text"; leaves "1.5 t/ha" alone
fn strip_numbering(s: &str) -> &str {
    let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return s;
    }
    let after = &s[digits..];
    match after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => s,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = "\
Here is my advice for rice.

1. **Suitability Assessment**: Rice is well suited to these conditions.
High humidity helps.

2. **Best Sowing Season**:
* Sow at the onset of the monsoon (June–July).

3. **Fertilizer Recommendations**:
- Split nitrogen into 3 doses.
- Apply   1.5 t/ha of compost.

### Disease & Pest Risks
Watch for blast and stem borer.

5. **Yield Optimization Tips**:
1. Maintain 5 cm standing water.
2. Transplant 21-day-old seedlings.
";

    #[test]
    fn test_numbered_bold_headings() {
        let advice = parse_advice(REPLY).unwrap();
        assert!(advice.is_structured());
        assert_eq!(
            advice.section(AdviceSection::Suitability),
            Some("Rice is well suited to these conditions. High humidity helps.")
        );
        assert_eq!(
            advice.section(AdviceSection::SowingSeason),
            Some("Sow at the onset of the monsoon (June–July).")
        );
        assert_eq!(
            advice.section(AdviceSection::Fertilizer),
            Some("Split nitrogen into 3 doses. Apply 1.5 t/ha of compost.")
        );
        assert_eq!(
            advice.section(AdviceSection::DiseaseRisks),
            Some("Watch for blast and stem borer.")
        );
        assert_eq!(
            advice.section(AdviceSection::YieldTips),
            Some("Maintain 5 cm standing water. Transplant 21-day-old seedlings.")
        );
        assert_eq!(advice.full_text(), REPLY);
    }

    #[test]
    fn test_bold_bullet_labels_stay_in_their_section() {
        let text = "\
**4. Disease & Pest Risks:** Blast is common in humid weather.

**5. Yield Optimization Tips:**
* **Nutrient management:** top-dress urea at tillering.
* **Timely planting:** transplant 21-day seedlings.
- **Weed control:** hand weed twice.
  1. **Sowing depth:** keep it shallow.";
        let advice = parse_advice(text).unwrap();
        assert_eq!(
            advice.section(AdviceSection::YieldTips),
            Some(
                "Nutrient management: top-dress urea at tillering. \
                 Timely planting: transplant 21-day seedlings. \
                 Weed control: hand weed twice. \
                 Sowing depth: keep it shallow."
            )
        );
        assert_eq!(
            advice.section(AdviceSection::DiseaseRisks),
            Some("Blast is common in humid weather.")
        );
        assert_eq!(advice.section(AdviceSection::Fertilizer), None);
        assert_eq!(advice.section(AdviceSection::SowingSeason), None);
    }

    #[test]
    fn test_list_item_detection() {
        assert!(is_list_item("* **Nutrient management:** urea"));
        assert!(is_list_item("- item"));
        assert!(is_list_item("• item"));
        assert!(!is_list_item("**Fertilizer**: urea"));
        assert!(!is_list_item("1. **Suitability**: good"));
    }

    #[test]
    fn test_keywords_inside_body_are_not_headings() {
        let text = "Suitability: Good.\nThe main risk this season is drought stress.";
        let advice = parse_advice(text).unwrap();
        assert_eq!(
            advice.section(AdviceSection::Suitability),
            Some("Good. The main risk this season is drought stress.")
        );
        assert_eq!(advice.section(AdviceSection::DiseaseRisks), None);
    }

    #[test]
    fn test_plain_prose_is_unstructured() {
        let text = "Rice will do well here. Keep the fields flooded.";
        let advice = parse_advice(text).unwrap();
        assert_eq!(advice, Advice::Unstructured { full_text: text.to_string() });
    }

    #[test]
    fn test_markdown_lines_without_keywords_are_skipped() {
        let text = "## Suitability\nGood fit.\n# Summary\nStill good.";
        let advice = parse_advice(text).unwrap();
        assert_eq!(advice.section(AdviceSection::Suitability), Some("Good fit. Still good."));
    }

    #[test]
    fn test_empty_reply() {
        assert_eq!(parse_advice("  \n\t"), None);
    }

    #[test]
    fn test_wire_shape() {
        let advice = parse_advice("**Fertilizer**: Add urea.").unwrap();
        let json = serde_json::to_value(&advice).unwrap();
        assert_eq!(json["fertilizer"], "Add urea.");
        assert_eq!(json["suitability"], "");
        assert_eq!(json["structured"], true);
        assert_eq!(json["full_text"], "**Fertilizer**: Add urea.");
    }

    #[test]
    fn test_strip_numbering() {
        assert_eq!(strip_numbering("1. Sow early"), "Sow early");
        assert_eq!(strip_numbering("2) Sow early"), "Sow early");
        assert_eq!(strip_numbering("1.5 t/ha"), "1.5 t/ha");
        assert_eq!(strip_numbering("21-day-old"), "21-day-old");
    }
}
