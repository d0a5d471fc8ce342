//! Shell-style tokenization of `copts`, `linkopts`, and `defines` entries.
//!
//! Words are separated by unquoted whitespace. Single quotes preserve their
//! contents literally; double quotes allow `\"` and `\\` escapes; a backslash
//! outside quotes escapes the next character.

use thiserror::Error;

/// Tokenization failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("unterminated quotation in `{0}`")]
    UnterminatedQuote(String),

    #[error("trailing backslash in `{0}`")]
    TrailingBackslash(String),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Split one attribute value into words.
pub fn tokenize(input: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // Quoted empty strings still produce a token.
    let mut in_token = false;
    let mut quote = Quote::None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match quote {
            Quote::Single => {
                if c == '\'' {
                    quote = Quote::None;
                } else {
                    current.push(c);
                }
            }
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => match chars.next() {
                    Some(next @ ('"' | '\\')) => current.push(next),
                    Some(next) => {
                        current.push('\\');
                        current.push(next);
                    }
                    None => return Err(TokenizeError::UnterminatedQuote(input.to_string())),
                },
                _ => current.push(c),
            },
            Quote::None => match c {
                '\'' => {
                    quote = Quote::Single;
                    in_token = true;
                }
                '"' => {
                    quote = Quote::Double;
                    in_token = true;
                }
                '\\' => match chars.next() {
                    Some(next) => {
                        current.push(next);
                        in_token = true;
                    }
                    None => return Err(TokenizeError::TrailingBackslash(input.to_string())),
                },
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if quote != Quote::None {
        return Err(TokenizeError::UnterminatedQuote(input.to_string()));
    }
    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        assert_eq!(tokenize("-O2  -Wall\t-g").unwrap(), vec!["-O2", "-Wall", "-g"]);
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn test_quotes() {
        assert_eq!(
            tokenize(r#"-DNAME="hello world" '-DX=a b'"#).unwrap(),
            vec!["-DNAME=hello world", "-DX=a b"]
        );
        assert_eq!(tokenize("''").unwrap(), vec![""]);
        assert_eq!(tokenize(r#""a\"b\\c\d""#).unwrap(), vec![r#"a"b\c\d"#]);
    }

    #[test]
    fn test_backslash_outside_quotes() {
        assert_eq!(tokenize(r"a\ b").unwrap(), vec!["a b"]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            tokenize("'open").unwrap_err(),
            TokenizeError::UnterminatedQuote("'open".to_string())
        );
        assert_eq!(
            tokenize(r"end\").unwrap_err(),
            TokenizeError::TrailingBackslash(r"end\".to_string())
        );
    }
}
