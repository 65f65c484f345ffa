const SENTENCE_END: &[char] = &['.', '!', '؟'];
const SPACED_PUNCTUATION: &[char] = &['.', ',', '!', '?', '؟'];
const SENTENCES_PER_PARAGRAPH: usize = 3;

/// Reflow a post for the destination feed: one paragraph per three sentences,
/// with a space forced after punctuation that was glued to the next word.
pub fn reformat_text(text: &str) -> String {
    let sentences: Vec<String> = split_sentences(text)
        .into_iter()
        .map(|s| space_after_punctuation(s.trim()))
        .filter(|s| !s.is_empty())
        .collect();

    sentences
        .chunks(SENTENCES_PER_PARAGRAPH)
        .map(|chunk| chunk.join(" "))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if !SENTENCE_END.contains(&ch) {
            continue;
        }
        let end = idx + ch.len_utf8();
        let mut next_start = end;
        while let Some(&(ws_idx, ws)) = chars.peek() {
            if !ws.is_whitespace() {
                break;
            }
            next_start = ws_idx + ws.len_utf8();
            chars.next();
        }
        if next_start > end {
            sentences.push(&text[start..end]);
            start = next_start;
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

fn space_after_punctuation(sentence: &str) -> String {
    let chars: Vec<char> = sentence.chars().collect();
    let mut out = String::with_capacity(sentence.len() + 8);
    for (i, &ch) in chars.iter().enumerate() {
        out.push(ch);
        if !SPACED_PUNCTUATION.contains(&ch) {
            continue;
        }
        let Some(&next) = chars.get(i + 1) else {
            continue;
        };
        if next.is_whitespace() || SPACED_PUNCTUATION.contains(&next) {
            continue;
        }
        // URLs and decimals: leave `t.me` and `3.5` alone.
        let prev_alnum = i > 0 && chars[i - 1].is_ascii_alphanumeric();
        if prev_alnum && next.is_ascii_alphanumeric() {
            continue;
        }
        out.push(' ');
    }
    out
}
