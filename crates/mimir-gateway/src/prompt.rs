use mimir_core::ChatCompletionRequest;

/// Text embedded to key a request in the cache.
///
/// The model name comes first, then one `role: text` line per message.
/// Structured content contributes only its text parts.
pub fn prompt_text(request: &ChatCompletionRequest) -> String {
    let mut lines = Vec::with_capacity(request.messages.len() + 1);
    lines.push(format!("model: {}", request.model));
    lines.extend(
        request
            .messages
            .iter()
            .map(|message| format!("{}: {}", message.role, message.text())),
    );
    lines.join("\n")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test code is allowed to use unwrap and has different conventions"
)]
mod tests {
    use super::*;
    use mimir_core::{ContentPart, ImageUrl, Message, MessageContent};

    #[test]
    fn test_plain_messages() {
        let request = ChatCompletionRequest::new(
            "gpt-4o",
            vec![
                Message::system("Be brief."),
                Message::user("What is the capital of France?"),
            ],
        );
        assert_eq!(
            prompt_text(&request),
            "model: gpt-4o\nsystem: Be brief.\nuser: What is the capital of France?"
        );
    }

    #[test]
    fn test_structured_content_keeps_text_only() {
        let mut message = Message::user("");
        message.content = Some(MessageContent::Parts(vec![
            ContentPart::Text {
                text: "Describe".to_owned(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,AAAA".to_owned(),
                    detail: None,
                },
            },
            ContentPart::Text {
                text: "this image".to_owned(),
            },
        ]));
        let request = ChatCompletionRequest::new("gpt-4o", vec![message]);
        assert_eq!(prompt_text(&request), "model: gpt-4o\nuser: Describe this image");
    }
}
