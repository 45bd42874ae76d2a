//! Text tokenization for search indexing.

/// Minimum token length. Single characters carry no relevance signal.
const MIN_TOKEN_LENGTH: usize = 2;

/// Common English stop words filtered out of indexing. Domain vocabulary
/// ("function", "parameter", CAPL type names) is deliberately not listed:
/// those words are meaningful in reference text.
pub(crate) const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with",
];

/// Tokenizes text into normalized search terms.
///
/// Lowercases and splits on non-alphanumeric boundaries, which strips
/// markdown markers and punctuation along the way. Compound identifiers are
/// additionally split on case boundaries, emitting both the parts and the
/// whole: `UdpSend` yields `udp`, `send`, and `udpsend`, so the function is
/// findable from prose queries as well as by its exact name.
///
/// Pure and deterministic; always returns a sequence, possibly empty.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut subwords: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_was_lower = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && prev_was_lower && !current.is_empty() {
                subwords.push(std::mem::take(&mut current));
            }
            current.push(c);
            word.push(c);
            prev_was_lower = c.is_lowercase() || c.is_numeric();
        } else {
            flush_word(&mut word, &mut subwords, &mut current, &mut tokens);
            prev_was_lower = false;
        }
    }
    flush_word(&mut word, &mut subwords, &mut current, &mut tokens);

    tokens
}

fn flush_word(
    word: &mut String,
    subwords: &mut Vec<String>,
    current: &mut String,
    tokens: &mut Vec<String>,
) {
    if !current.is_empty() {
        subwords.push(std::mem::take(current));
    }
    let compound = subwords.len() > 1;
    for subword in subwords.drain(..) {
        push_token(&subword, tokens);
    }
    if compound {
        push_token(word, tokens);
    }
    word.clear();
}

fn push_token(raw: &str, tokens: &mut Vec<String>) {
    let token = raw.to_lowercase();
    if token.chars().count() < MIN_TOKEN_LENGTH {
        return;
    }
    if STOP_WORDS.contains(&token.as_str()) {
        return;
    }
    tokens.push(token);
}
