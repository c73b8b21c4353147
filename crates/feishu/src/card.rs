//! Interactive card rendering for answers.

use {
    ferry_common::Citation,
    serde_json::{Value, json},
};

pub const SOURCES_HEADING: &str = "📚 Sources:";

fn plain_div(content: &str) -> Value {
    json!({
        "tag": "div",
        "text": {
            "content": content,
            "tag": "plain_text",
        },
    })
}

/// One citation line, e.g. `📄 Handbook.pdf (page 12)`.
pub fn citation_line(citation: &Citation) -> String {
    format!("📄 {} (page {})", citation.file, citation.page)
}

/// Build the card JSON: a blue header, the answer body, and, when there are
/// citations, a divider followed by one line per source.
pub fn answer_card(title: &str, body: &str, citations: &[Citation]) -> Value {
    let mut elements = vec![plain_div(body)];

    if !citations.is_empty() {
        elements.push(json!({ "tag": "hr" }));
        elements.push(plain_div(SOURCES_HEADING));
        elements.extend(citations.iter().map(|c| plain_div(&citation_line(c))));
    }

    json!({
        "config": {
            "wide_screen_mode": true,
        },
        "header": {
            "title": {
                "content": format!("🤖 {title}"),
                "tag": "plain_text",
            },
            "template": "blue",
        },
        "elements": elements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_without_citations_has_only_body() {
        let card = answer_card("Assistant answer", "Nine to six.", &[]);
        let elements = card["elements"].as_array().unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0]["text"]["content"], "Nine to six.");
        assert_eq!(card["header"]["title"]["content"], "🤖 Assistant answer");
        assert_eq!(card["header"]["template"], "blue");
        assert_eq!(card["config"]["wide_screen_mode"], true);
    }

    #[test]
    fn citations_follow_a_divider() {
        let citations = vec![
            Citation::new("Handbook.pdf", "12"),
            Citation::new("Leave policy.docx", "?"),
        ];
        let card = answer_card("Answer", "body", &citations);
        let elements = card["elements"].as_array().unwrap();
        assert_eq!(elements.len(), 5);
        assert_eq!(elements[1]["tag"], "hr");
        assert_eq!(elements[2]["text"]["content"], SOURCES_HEADING);
        assert_eq!(elements[3]["text"]["content"], "📄 Handbook.pdf (page 12)");
        assert_eq!(elements[4]["text"]["content"], "📄 Leave policy.docx (page ?)");
    }
}
