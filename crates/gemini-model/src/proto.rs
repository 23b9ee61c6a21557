use binnai_model::{
    ContentPart, ErrorKind, GenerateRequest, GeneratedContent, InlineData,
    ModelFinishReason, ModelMessage, ModelRequest,
};
use serde::{Deserialize, Serialize};

use crate::Error;

// -----------------------------
// Types shared in both directions
// -----------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    // Thought summaries are never shown to the user.
    #[serde(default, skip_serializing)]
    pub thought: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ErrorBody {
    pub code: Option<u16>,
    pub message: Option<String>,
    pub status: Option<String>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_stream_request(req: &ModelRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: req.messages.iter().map(create_content).collect(),
        system_instruction: req.system_instruction.as_ref().map(|text| {
            Content {
                role: None,
                parts: vec![text_part(text)],
            }
        }),
        generation_config: req.temperature.map(|temperature| {
            GenerationConfig {
                temperature: Some(temperature),
            }
        }),
    }
}

#[inline]
pub fn create_generate_request(req: &GenerateRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: None,
            parts: vec![text_part(&req.prompt)],
        }],
        system_instruction: None,
        generation_config: None,
    }
}

#[inline]
fn create_content(msg: &ModelMessage) -> Content {
    let role = match msg {
        ModelMessage::User(_) => "user",
        ModelMessage::Model(_) => "model",
    };
    Content {
        role: Some(role.to_owned()),
        parts: vec![text_part(msg.text())],
    }
}

#[inline]
fn text_part(text: &str) -> Part {
    Part {
        text: Some(text.to_owned()),
        ..Default::default()
    }
}

/// Fails with a moderation error when the prompt itself was blocked.
pub fn check_prompt_feedback(
    resp: &GenerateContentResponse,
) -> Result<(), Error> {
    let block_reason = resp
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref());
    match block_reason {
        Some(reason) => Err(Error::new(
            format!("Permintaan diblokir oleh filter keamanan ({reason})."),
            ErrorKind::Moderated,
        )),
        None => Ok(()),
    }
}

/// Visible parts of the first candidate, thoughts skipped.
pub fn first_candidate_parts(
    resp: GenerateContentResponse,
) -> impl Iterator<Item = Part> {
    resp.candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|part| !part.thought)
}

pub fn into_generated_content(
    resp: GenerateContentResponse,
) -> Result<GeneratedContent, Error> {
    check_prompt_feedback(&resp)?;
    let parts = first_candidate_parts(resp)
        .filter_map(|part| match part {
            Part {
                inline_data: Some(blob),
                ..
            } => Some(ContentPart::InlineData(InlineData {
                mime_type: blob.mime_type,
                data: blob.data,
            })),
            Part {
                text: Some(text), ..
            } => Some(ContentPart::Text(text)),
            _ => None,
        })
        .collect();
    Ok(GeneratedContent { parts })
}

pub fn finish_reason(reason: &str) -> ModelFinishReason {
    match reason {
        "STOP" => ModelFinishReason::Stop,
        "MAX_TOKENS" => ModelFinishReason::MaxTokens,
        "SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII"
        | "RECITATION" | "IMAGE_SAFETY" => ModelFinishReason::Safety,
        _ => ModelFinishReason::Other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_create_stream_request() {
        let request = ModelRequest {
            system_instruction: Some("Anda adalah BinnAI.".to_owned()),
            temperature: Some(0.5),
            messages: vec![
                ModelMessage::User("Halo".to_owned()),
                ModelMessage::Model("Halo juga!".to_owned()),
                ModelMessage::User("Apa kabar?".to_owned()),
            ],
        };
        let expected = json!({
            "contents": [
                { "role": "user", "parts": [{ "text": "Halo" }] },
                { "role": "model", "parts": [{ "text": "Halo juga!" }] },
                { "role": "user", "parts": [{ "text": "Apa kabar?" }] },
            ],
            "systemInstruction": { "parts": [{ "text": "Anda adalah BinnAI." }] },
            "generationConfig": { "temperature": 0.5 },
        });
        let actual =
            serde_json::to_value(create_stream_request(&request)).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_create_generate_request() {
        let request = GenerateRequest {
            prompt: "buatkan gambar kucing".to_owned(),
        };
        let expected = json!({
            "contents": [{ "parts": [{ "text": "buatkan gambar kucing" }] }],
        });
        let actual =
            serde_json::to_value(create_generate_request(&request)).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_into_generated_content() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "menimbang komposisi", "thought": true },
                        { "text": "Ini kucingnya." },
                        { "inlineData": { "mimeType": "image/png", "data": "AAAA" } },
                    ]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        let content = into_generated_content(resp).unwrap();
        assert_eq!(
            content.parts,
            vec![
                ContentPart::Text("Ini kucingnya.".to_owned()),
                ContentPart::InlineData(InlineData {
                    mime_type: "image/png".to_owned(),
                    data: "AAAA".to_owned(),
                }),
            ]
        );
    }

    #[test]
    fn test_empty_and_blocked_responses() {
        let resp: GenerateContentResponse =
            serde_json::from_value(json!({})).unwrap();
        assert_eq!(into_generated_content(resp).unwrap().parts, vec![]);

        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        let err = into_generated_content(resp).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Moderated);
    }
}
