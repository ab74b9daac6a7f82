/// One lexical element of a command string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Number(u64),
    Dot,
    Plus,
    Minus,
    Dollar,
    Comma,
    Hashtag,
    /// A `/` payload delimiter.
    Slash,
    /// A command letter (`a`, `c`, `d`, ..., `=`).
    Command(char),
    /// The word following `e`, `r`, `w` or `l`.
    Filename(String),
    /// The body of a `/.../` payload, escapes already applied.
    Text(String),
    /// An external-process marker (`!`, `<`, `>`, `|`) with the rest of
    /// the line as the command to run.
    External(char, String),
    /// A character no token can start with. Only the parser treats this
    /// as an error, keeping `tokenize` total.
    Bad(char),
}

/// Splits a raw command string into a flat token stream. Never fails.
pub fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
            }
            '0'..='9' => {
                tokens.push(Token::Number(scan_number(&chars, &mut i)));
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '$' => {
                tokens.push(Token::Dollar);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '#' => {
                tokens.push(Token::Hashtag);
                i += 1;
            }
            '/' => {
                i += 1;
                tokens.push(Token::Slash);
                scan_text(&chars, &mut i, &mut tokens);
            }
            '!' | '<' | '>' | '|' => {
                let rest: String = chars[i + 1..].iter().collect();
                tokens.push(Token::External(c, rest.trim().to_string()));
                i = chars.len();
            }
            's' => {
                // Substitute carries two payloads around a shared middle
                // delimiter: s/pattern/replacement/
                tokens.push(Token::Command('s'));
                i += 1;
                skip_blanks(&chars, &mut i);
                if i < chars.len() && chars[i] == '/' {
                    i += 1;
                    tokens.push(Token::Slash);
                    scan_text(&chars, &mut i, &mut tokens);
                    scan_text(&chars, &mut i, &mut tokens);
                }
            }
            'e' | 'r' | 'w' | 'l' => {
                tokens.push(Token::Command(c));
                i += 1;
                skip_blanks(&chars, &mut i);
                let mut name = String::new();
                while i < chars.len() && !chars[i].is_whitespace() {
                    name.push(chars[i]);
                    i += 1;
                }
                if !name.is_empty() {
                    tokens.push(Token::Filename(name));
                }
            }
            'a' | 'b' | 'c' | 'd' | 'g' | 'i' | 'm' | 'p' | 'q' | 't' | 'u' | 'v' | 'x' | 'A'
            | 'R' | 'U' | '=' => {
                tokens.push(Token::Command(c));
                i += 1;
            }
            other => {
                tokens.push(Token::Bad(other));
                i += 1;
            }
        }
    }

    tokens
}

fn scan_number(chars: &[char], i: &mut usize) -> u64 {
    let mut value: u64 = 0;
    while *i < chars.len() {
        let Some(d) = chars[*i].to_digit(10) else {
            break;
        };
        value = value.saturating_mul(10).saturating_add(d as u64);
        *i += 1;
    }
    value
}

fn skip_blanks(chars: &[char], i: &mut usize) {
    while *i < chars.len() && (chars[*i] == ' ' || chars[*i] == '\t') {
        *i += 1;
    }
}

/// Scans a payload body up to the next unescaped `/` (or end of input,
/// treated as an implicit close) and emits `Text` plus the closing `Slash`.
///
/// Escapes: `\/`, `\\`, `\n`, `\t`, `\r`. Anything else after a backslash
/// is kept verbatim so regex classes like `\w` pass through untouched.
fn scan_text(chars: &[char], i: &mut usize, tokens: &mut Vec<Token>) {
    let mut text = String::new();
    while *i < chars.len() {
        let c = chars[*i];
        if c == '\\' && *i + 1 < chars.len() {
            match chars[*i + 1] {
                '/' => text.push('/'),
                '\\' => text.push('\\'),
                'n' => text.push('\n'),
                't' => text.push('\t'),
                'r' => text.push('\r'),
                other => {
                    text.push('\\');
                    text.push(other);
                }
            }
            *i += 2;
        } else if c == '/' {
            *i += 1;
            break;
        } else {
            text.push(c);
            *i += 1;
        }
    }
    tokens.push(Token::Text(text));
    tokens.push(Token::Slash);
}
