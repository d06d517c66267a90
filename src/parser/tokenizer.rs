//! Access log tokenizer.
//!
//! Splits a line into bare words, `"quoted"` strings and `[bracketed]` strings.
//! Never fails: an unterminated quote or bracket runs to the end of the line,
//! which is how truncated lines show up.

/// One lexical unit of an access log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Whitespace-delimited word
    Bare(&'a str),
    /// Contents of a double-quoted string, escapes resolved
    Quoted(String),
    /// Contents of a `[...]` group, brackets stripped
    Bracketed(&'a str),
}

impl Token<'_> {
    /// Text of a bare token.
    pub fn as_bare(&self) -> Option<&str> {
        match self {
            Token::Bare(s) => Some(s),
            _ => None,
        }
    }

    /// Unescaped contents of a quoted token.
    pub fn as_quoted(&self) -> Option<&str> {
        match self {
            Token::Quoted(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Contents of a bracketed token.
    pub fn as_bracketed(&self) -> Option<&str> {
        match self {
            Token::Bracketed(s) => Some(s),
            _ => None,
        }
    }

    /// Text of the token, whatever its kind.
    pub fn text(&self) -> &str {
        match self {
            Token::Bare(s) | Token::Bracketed(s) => s,
            Token::Quoted(s) => s.as_str(),
        }
    }
}

/// Tokenizes an access log line.
pub fn tokenize(line: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let bytes = line.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b if b.is_ascii_whitespace() => pos += 1,
            b'"' => {
                let (value, next) = read_quoted(line, pos + 1);
                tokens.push(Token::Quoted(value));
                pos = next;
            }
            b'[' => {
                let start = pos + 1;
                let end = line[start..]
                    .find(']')
                    .map(|i| start + i)
                    .unwrap_or(line.len());
                tokens.push(Token::Bracketed(&line[start..end]));
                pos = (end + 1).min(line.len());
            }
            _ => {
                let start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                tokens.push(Token::Bare(&line[start..pos]));
            }
        }
    }

    tokens
}

/// Reads a quoted string starting after the opening quote.
///
/// Returns the unescaped contents and the byte offset after the closing quote.
fn read_quoted(line: &str, start: usize) -> (String, usize) {
    let mut value = String::new();
    let mut chars = line[start..].char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return (value, start + i + 1),
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => value.push('\\'),
            },
            _ => value.push(c),
        }
    }

    (value, line.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_mixed_tokens() {
        let tokens = tokenize(r#"1.2.3.4 - - [10/Oct/2000:13:55:36 -0700] "GET / HTTP/1.0" 200"#);
        assert_eq!(
            tokens,
            vec![
                Token::Bare("1.2.3.4"),
                Token::Bare("-"),
                Token::Bare("-"),
                Token::Bracketed("10/Oct/2000:13:55:36 -0700"),
                Token::Quoted("GET / HTTP/1.0".to_string()),
                Token::Bare("200"),
            ]
        );
    }

    #[test]
    fn test_tokenize_escaped_quote() {
        let tokens = tokenize(r#""Mozilla \"quoted\" agent""#);
        assert_eq!(
            tokens,
            vec![Token::Quoted(r#"Mozilla "quoted" agent"#.to_string())]
        );
    }

    #[test]
    fn test_tokenize_unterminated_quote_runs_to_end() {
        let tokens = tokenize(r#"200 "GET /truncat"#);
        assert_eq!(
            tokens,
            vec![Token::Bare("200"), Token::Quoted("GET /truncat".to_string())]
        );
    }

    #[test]
    fn test_tokenize_unterminated_bracket_runs_to_end() {
        let tokens = tokenize("1.2.3.4 [10/Oct/2000:13:55");
        assert_eq!(
            tokens,
            vec![Token::Bare("1.2.3.4"), Token::Bracketed("10/Oct/2000:13:55")]
        );
    }

    #[test]
    fn test_tokenize_empty_and_whitespace() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \t \n").is_empty());
    }

    #[test]
    fn test_tokenize_empty_quoted() {
        assert_eq!(tokenize(r#""""#), vec![Token::Quoted(String::new())]);
    }

    #[test]
    fn test_tokenize_multibyte_text() {
        let tokens = tokenize(r#""Zürich ☃" naïve"#);
        assert_eq!(
            tokens,
            vec![Token::Quoted("Zürich ☃".to_string()), Token::Bare("naïve")]
        );
    }

    #[test]
    fn test_trailing_backslash_kept() {
        let tokens = tokenize("\"abc\\");
        assert_eq!(tokens, vec![Token::Quoted("abc\\".to_string())]);
    }

    #[test]
    fn test_token_text_covers_every_kind() {
        let tokens = tokenize(r#"200 "GET / HTTP/1.1" [21/Apr/2021:09:01:02 -0700]"#);
        let texts: Vec<&str> = tokens.iter().map(Token::text).collect();
        assert_eq!(
            texts,
            vec!["200", "GET / HTTP/1.1", "21/Apr/2021:09:01:02 -0700"]
        );
        assert!(tokens[2].as_quoted().is_none());
        assert_eq!(tokens[2].as_bracketed(), Some("21/Apr/2021:09:01:02 -0700"));
    }
}
