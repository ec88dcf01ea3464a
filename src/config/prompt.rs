use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use log::info;

pub const SYSTEM_INSTRUCTION: &str = r#"
You are a helpful, intelligent assistant that speaks ONLY in Mon and English.

RULES:
1. If the user inputs text in Mon (Burmese script/Mon language), you MUST respond in Mon.
2. If the user inputs text in English, you MUST respond in English.
3. If the user inputs text in a mixed language, respond in the language that is most dominant or ask for clarification in both languages.
4. If the user inputs text in a language other than Mon or English (e.g., Spanish, French, Burmese, Thai), you must politely refuse to answer in that language. You should reply with a standard message in both English and Mon stating that you only support Mon and English.
5. Keep your responses helpful, polite, and culturally appropriate.
6. For Mon language, ensure you use proper grammar and vocabulary suitable for a general audience.

CONTEXT:
The user is using a specialized app designed to bridge communication between English and Mon speakers or to assist native Mon speakers.
"#;

pub const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to read system prompt file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("System prompt file '{0}' is empty")]
    Empty(String),
}

/// Returns the system instruction sent with every generation call: the file at
/// `path` when one is configured, the built-in bilingual rules otherwise.
pub fn load_system_instruction<P: AsRef<Path>>(path: Option<P>) -> Result<Arc<str>, PromptError> {
    let Some(path) = path else {
        return Ok(Arc::from(SYSTEM_INSTRUCTION));
    };
    let display = path.as_ref().display().to_string();

    let content = fs::read_to_string(path.as_ref()).map_err(|source| PromptError::Io {
        path: display.clone(),
        source,
    })?;
    if content.trim().is_empty() {
        return Err(PromptError::Empty(display));
    }

    info!("Loaded system prompt from '{}' ({} bytes)", display, content.len());
    Ok(Arc::from(content))
}
