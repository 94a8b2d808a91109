use dialoguer::{Input, Password};

use crate::error::FetchError;

/// Source of answers for values missing from the dataset descriptor.
pub trait InputSource {
    fn prompt(&self, text: &str) -> Result<String, FetchError>;
    /// Like [`InputSource::prompt`] but without echoing what is typed.
    fn prompt_secret(&self, text: &str) -> Result<String, FetchError>;
}

impl<T: InputSource + ?Sized> InputSource for &T {
    fn prompt(&self, text: &str) -> Result<String, FetchError> {
        (**self).prompt(text)
    }

    fn prompt_secret(&self, text: &str) -> Result<String, FetchError> {
        (**self).prompt_secret(text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TerminalInput;

impl InputSource for TerminalInput {
    fn prompt(&self, text: &str) -> Result<String, FetchError> {
        Input::<String>::new()
            .with_prompt(prompt_label(text))
            .interact_text()
            .map(|value| value.trim().to_string())
            .map_err(|err| FetchError::Prompt(err.to_string()))
    }

    fn prompt_secret(&self, text: &str) -> Result<String, FetchError> {
        Password::new()
            .with_prompt(prompt_label(text))
            .interact()
            .map_err(|err| FetchError::Prompt(err.to_string()))
    }
}

/// Refuses every prompt. Used when stdin is not an operator.
#[derive(Debug, Clone, Default)]
pub struct NonInteractiveInput;

impl InputSource for NonInteractiveInput {
    fn prompt(&self, text: &str) -> Result<String, FetchError> {
        Err(FetchError::MissingInput(prompt_label(text).to_string()))
    }

    fn prompt_secret(&self, text: &str) -> Result<String, FetchError> {
        Err(FetchError::MissingInput(prompt_label(text).to_string()))
    }
}

// dialoguer appends its own ": " separator.
fn prompt_label(text: &str) -> &str {
    text.trim_end().trim_end_matches(':')
}
