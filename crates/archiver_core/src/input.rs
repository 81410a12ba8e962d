use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("expected a tag number or a url with tags=<number>, got {0:?}")]
    NotATag(String),
    #[error("expected a thread url containing /thread/<number>/, got {0:?}")]
    NotAThread(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRef {
    pub url: String,
    pub id: String,
}

/// Tag id from either a bare number or any url carrying `tags=<number>`.
pub fn parse_tag_input(raw: &str) -> Result<u64, InputError> {
    let trimmed = raw.trim();
    if let Ok(id) = trimmed.parse::<u64>() {
        return Ok(id);
    }

    let from_query = Url::parse(trimmed).ok().and_then(|url| {
        url.query_pairs()
            .find(|(key, _)| key == "tags")
            .and_then(|(_, value)| value.trim().parse::<u64>().ok())
    });
    if let Some(id) = from_query {
        return Ok(id);
    }

    // Fragments like `/?tags=123` that do not parse as absolute urls.
    trimmed
        .split(['?', '&'])
        .find_map(|pair| pair.strip_prefix("tags="))
        .map(|value| value.chars().take_while(char::is_ascii_digit).collect::<String>())
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| InputError::NotATag(trimmed.to_string()))
}

pub fn parse_thread_input(raw: &str) -> Result<ThreadRef, InputError> {
    let trimmed = raw.trim();
    let id: String = trimmed
        .split_once("/thread/")
        .map(|(_, rest)| rest.chars().take_while(char::is_ascii_digit).collect())
        .unwrap_or_default();
    if id.is_empty() {
        return Err(InputError::NotAThread(trimmed.to_string()));
    }
    Ok(ThreadRef {
        url: trimmed.to_string(),
        id,
    })
}
