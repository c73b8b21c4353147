use {
    ferry_common::Citation,
    serde::{Deserialize, Serialize, Serializer},
    serde_json::Value,
};

/// Error text when the backend answered but produced no usable choice.
pub const NO_ANSWER: &str = "no relevant answer found";

const UNKNOWN_FILE: &str = "unknown document";
const UNKNOWN_PAGE: &str = "?";

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

impl<'a> ChatCompletionRequest<'a> {
    /// Single user turn, non-streaming.
    pub fn single_turn(model: &'a str, question: &'a str) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: question,
            }],
            stream: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatCompletionResponse {
    pub choices: Option<Vec<Choice>>,
    /// Source documents. Shape unconfirmed against the live API, so it is
    /// kept untyped and mapped leniently by [`extract_citations`].
    pub references: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Choice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    fn first_answer(&self) -> Option<&str> {
        self.choices
            .as_ref()?
            .first()?
            .message
            .as_ref()?
            .content
            .as_deref()
    }
}

/// Outcome of one knowledge-base query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Answer {
        answer: String,
        sources: Vec<Citation>,
    },
    Failure {
        error: String,
    },
}

impl QueryResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Answer { .. })
    }

    /// Interpret a decoded completions response.
    pub fn from_response(response: &ChatCompletionResponse) -> Self {
        match response.first_answer() {
            Some(answer) => Self::Answer {
                answer: answer.to_string(),
                sources: extract_citations(response.references.as_ref()),
            },
            None => Self::failure(NO_ANSWER),
        }
    }
}

/// `{"success": true, "answer": ..., "sources": [...]}` or
/// `{"success": false, "error": ...}`.
impl Serialize for QueryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            success: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            answer: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            sources: Option<&'a [Citation]>,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<&'a str>,
        }

        let wire = match self {
            Self::Answer { answer, sources } => Wire {
                success: true,
                answer: Some(answer.as_str()),
                sources: Some(sources.as_slice()),
                error: None,
            },
            Self::Failure { error } => Wire {
                success: false,
                answer: None,
                sources: None,
                error: Some(error.as_str()),
            },
        };
        wire.serialize(serializer)
    }
}

/// Map `references` entries to citations. Anything that is not an array of
/// objects yields no citations.
pub fn extract_citations(references: Option<&Value>) -> Vec<Citation> {
    let Some(entries) = references.and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| {
            let file = entry
                .get("file_name")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_FILE);
            let page = match entry.get("page_number") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => UNKNOWN_PAGE.to_string(),
            };
            Citation::new(file, page)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use {rstest::rstest, serde_json::json};

    use super::*;

    fn parse(value: Value) -> QueryResult {
        let resp: ChatCompletionResponse = serde_json::from_value(value).unwrap();
        QueryResult::from_response(&resp)
    }

    #[test]
    fn single_choice_without_references() {
        let result = parse(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Nine to six." } }]
        }));
        assert_eq!(result, QueryResult::Answer {
            answer: "Nine to six.".into(),
            sources: vec![],
        });
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({ "choices": [] }))]
    #[case(json!({ "choices": [{ "message": {} }] }))]
    #[case(json!({ "code": 102, "message": "Authentication error" }))]
    fn missing_answer_is_failure(#[case] body: Value) {
        assert_eq!(parse(body), QueryResult::failure(NO_ANSWER));
    }

    #[test]
    fn references_become_citations() {
        let result = parse(json!({
            "choices": [{ "message": { "content": "See handbook." } }],
            "references": [
                { "file_name": "Handbook.pdf", "page_number": 12 },
                { "file_name": "Leave.docx", "page_number": "3-4" },
                { "page_number": null },
                "not an object"
            ]
        }));
        let QueryResult::Answer { sources, .. } = result else {
            panic!("expected answer");
        };
        assert_eq!(sources, vec![
            Citation::new("Handbook.pdf", "12"),
            Citation::new("Leave.docx", "3-4"),
            Citation::new(UNKNOWN_FILE, UNKNOWN_PAGE),
        ]);
    }

    #[test]
    fn non_array_references_are_ignored() {
        assert!(extract_citations(Some(&json!({ "chunks": [] }))).is_empty());
        assert!(extract_citations(None).is_empty());
    }

    #[test]
    fn wire_shape() {
        let ok = QueryResult::Answer {
            answer: "yes".into(),
            sources: vec![Citation::new("a.pdf", "1")],
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({ "success": true, "answer": "yes", "sources": [{ "file": "a.pdf", "page": "1" }] })
        );
        assert_eq!(
            serde_json::to_value(QueryResult::failure("boom")).unwrap(),
            json!({ "success": false, "error": "boom" })
        );
    }

    #[test]
    fn request_body_is_single_turn() {
        let body = serde_json::to_value(ChatCompletionRequest::single_turn("model", "hi")).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "model",
                "messages": [{ "role": "user", "content": "hi" }],
                "stream": false
            })
        );
    }
}
