//! A small reader for the old-style ASCII property lists Glyphs writes.
//!
//! Only reading is supported. Sections that are irrelevant to the caller can be
//! stepped over with [`Tokenizer::skip_value`], which validates the syntax without
//! building any values.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Debug;

use ordered_float::OrderedFloat;

/// A plist dictionary
pub type Dictionary = BTreeMap<String, Plist>;

/// A parsed property list value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Plist {
    Dictionary(Dictionary),
    Array(Vec<Plist>),
    String(String),
    Integer(i64),
    Float(OrderedFloat<f64>),
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unexpected character '{0}' at {1}")]
    UnexpectedChar(char, usize),
    #[error("Unterminated string")]
    UnclosedString,
    #[error("Unterminated data block")]
    UnclosedData,
    #[error("Unknown escape code")]
    UnknownEscape,
    #[error("Expected string, found {0}")]
    NotAString(&'static str),
    #[error("Expected '{0}' at {1}")]
    ExpectedChar(char, usize),
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Trailing content at {0}")]
    TrailingContent(usize),
    #[error("Expected {expected}, found {found}")]
    UnexpectedDataType {
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug)]
enum Token<'a> {
    Eof,
    OpenBrace,
    OpenParen,
    String(Cow<'a, str>),
    Atom(&'a str),
}

impl Token<'_> {
    fn name(&self) -> &'static str {
        match self {
            Token::Eof => "end of input",
            Token::OpenBrace => "'{'",
            Token::OpenParen => "'('",
            Token::String(..) => "string",
            Token::Atom(..) => "atom",
        }
    }
}

fn is_atom_byte(b: u8) -> bool {
    // https://github.com/opensource-apple/CF/blob/3cc41a76b1491f50813e28a4ec09954ffa359e6f/CFOldStylePList.c#L79
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'/' | b':' | b'.' | b'-')
}

fn looks_numeric(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(|b| b.is_ascii_digit() || *b == b'.' || *b == b'-') {
        return false;
    }
    // 0123 is a name, not a number
    !(bytes.len() > 1 && bytes[0] == b'0' && bytes.iter().all(u8::is_ascii_digit))
}

impl Plist {
    /// Parse a complete document.
    pub fn parse(s: &str) -> Result<Plist, Error> {
        let mut tokenizer = Tokenizer::new(s);
        let plist = tokenizer.parse_value()?;
        tokenizer.expect_eof()?;
        Ok(plist)
    }

    fn atom(s: &str) -> Plist {
        if looks_numeric(s) {
            if let Ok(i) = s.parse() {
                return Plist::Integer(i);
            }
            if let Ok(f) = s.parse::<f64>() {
                return Plist::Float(f.into());
            }
        }
        Plist::String(s.to_string())
    }

    fn kind(&self) -> &'static str {
        match self {
            Plist::Dictionary(..) => "dictionary",
            Plist::Array(..) => "array",
            Plist::String(..) => "string",
            Plist::Integer(..) => "integer",
            Plist::Float(..) => "float",
        }
    }

    pub fn get(&self, key: &str) -> Option<&Plist> {
        self.as_dict().and_then(|d| d.get(key))
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Plist::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Plist]> {
        match self {
            Plist::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Strings, and numbers-that-were-probably-names, as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Plist::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Plist::Integer(i) => Some(*i),
            Plist::Float(f) => Some(f.into_inner() as i64),
            _ => None,
        }
    }

    pub fn expect_array(&self) -> Result<&[Plist], Error> {
        self.as_array().ok_or(Error::UnexpectedDataType {
            expected: "array",
            found: self.kind(),
        })
    }

    pub fn expect_dict(&self) -> Result<&Dictionary, Error> {
        self.as_dict().ok_or(Error::UnexpectedDataType {
            expected: "dictionary",
            found: self.kind(),
        })
    }
}

/// Walks a plist document token by token.
pub struct Tokenizer<'a> {
    content: &'a str,
    idx: usize,
}

impl Debug for Tokenizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end = (self.idx + 16).min(self.content.len());
        f.debug_struct("Tokenizer")
            .field("content", &self.content.get(self.idx..end))
            .field("idx", &self.idx)
            .finish()
    }
}

impl<'a> Tokenizer<'a> {
    pub fn new(content: &'a str) -> Tokenizer<'a> {
        Tokenizer { content, idx: 0 }
    }

    fn skip_ws(&mut self) {
        let bytes = self.content.as_bytes();
        while self.idx < bytes.len() {
            match bytes[self.idx] {
                b' ' | b'\t' | b'\r' | b'\n' => self.idx += 1,
                b'/' if bytes.get(self.idx + 1) == Some(&b'/') => {
                    while self.idx < bytes.len() && bytes[self.idx] != b'\n' {
                        self.idx += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn lex(&mut self) -> Result<Token<'a>, Error> {
        self.skip_ws();
        let bytes = self.content.as_bytes();
        let Some(&b) = bytes.get(self.idx) else {
            return Ok(Token::Eof);
        };
        match b {
            b'{' => {
                self.idx += 1;
                Ok(Token::OpenBrace)
            }
            b'(' => {
                self.idx += 1;
                Ok(Token::OpenParen)
            }
            b'"' => self.lex_quoted(),
            b'<' => {
                let start = self.idx;
                let Some(len) = self.content[start..].find('>') else {
                    return Err(Error::UnclosedData);
                };
                self.idx = start + len + 1;
                Ok(Token::Atom(&self.content[start..self.idx]))
            }
            b if is_atom_byte(b) => {
                let start = self.idx;
                while self.idx < bytes.len() && is_atom_byte(bytes[self.idx]) {
                    self.idx += 1;
                }
                Ok(Token::Atom(&self.content[start..self.idx]))
            }
            _ => {
                let c = self.content[self.idx..].chars().next().unwrap_or('\0');
                Err(Error::UnexpectedChar(c, self.idx))
            }
        }
    }

    fn lex_quoted(&mut self) -> Result<Token<'a>, Error> {
        let bytes = self.content.as_bytes();
        let mut ix = self.idx + 1;
        let mut run_start = ix;
        let mut buf: Option<String> = None;
        while ix < bytes.len() {
            match bytes[ix] {
                b'"' => {
                    let text = match buf {
                        Some(mut owned) => {
                            owned.push_str(&self.content[run_start..ix]);
                            Cow::Owned(owned)
                        }
                        None => Cow::Borrowed(&self.content[run_start..ix]),
                    };
                    self.idx = ix + 1;
                    return Ok(Token::String(text));
                }
                b'\\' => {
                    let owned = buf.get_or_insert_with(String::new);
                    owned.push_str(&self.content[run_start..ix]);
                    let Some(&escaped) = bytes.get(ix + 1) else {
                        return Err(Error::UnclosedString);
                    };
                    match escaped {
                        b'"' | b'\\' => owned.push(escaped as char),
                        b'n' => owned.push('\n'),
                        b'r' => owned.push('\r'),
                        b't' => owned.push('\t'),
                        b'0'..=b'3' => {
                            // octal, \012
                            let digits = bytes.get(ix + 1..ix + 4).ok_or(Error::UnknownEscape)?;
                            if !digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                                return Err(Error::UnknownEscape);
                            }
                            let value = digits.iter().fold(0u32, |acc, d| acc * 8 + (d - b'0') as u32);
                            owned.push(char::from_u32(value).ok_or(Error::UnknownEscape)?);
                            ix += 2;
                        }
                        _ => return Err(Error::UnknownEscape),
                    }
                    ix += 2;
                    run_start = ix;
                }
                _ => ix += 1,
            }
        }
        Err(Error::UnclosedString)
    }

    /// Consume `delim` if it is the next non-whitespace byte.
    fn eat(&mut self, delim: u8) -> bool {
        self.skip_ws();
        if self.content.as_bytes().get(self.idx) == Some(&delim) {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, delim: u8) -> Result<(), Error> {
        if self.eat(delim) {
            Ok(())
        } else {
            Err(Error::ExpectedChar(delim as char, self.idx))
        }
    }

    pub fn expect_eof(&mut self) -> Result<(), Error> {
        self.skip_ws();
        if self.idx == self.content.len() {
            Ok(())
        } else {
            Err(Error::TrailingContent(self.idx))
        }
    }

    fn key(&mut self) -> Result<Cow<'a, str>, Error> {
        match self.lex()? {
            Token::Atom(s) => Ok(Cow::Borrowed(s)),
            Token::String(s) => Ok(s),
            other => Err(Error::NotAString(other.name())),
        }
    }

    /// Parse the next value, however deeply nested.
    pub fn parse_value(&mut self) -> Result<Plist, Error> {
        match self.lex()? {
            Token::Atom(s) => Ok(Plist::atom(s)),
            Token::String(s) => Ok(Plist::String(s.into_owned())),
            Token::OpenBrace => {
                let mut dict = Dictionary::new();
                while !self.eat(b'}') {
                    let key = self.key()?;
                    self.expect(b'=')?;
                    let value = self.parse_value()?;
                    self.expect(b';')?;
                    dict.insert(key.into_owned(), value);
                }
                Ok(Plist::Dictionary(dict))
            }
            Token::OpenParen => {
                let mut list = Vec::new();
                if self.eat(b')') {
                    return Ok(Plist::Array(list));
                }
                loop {
                    list.push(self.parse_value()?);
                    if self.eat(b')') {
                        return Ok(Plist::Array(list));
                    }
                    self.expect(b',')?;
                }
            }
            Token::Eof => Err(Error::UnexpectedEof),
        }
    }

    /// Jump over the next value, simple or nested, without building it.
    pub fn skip_value(&mut self) -> Result<(), Error> {
        match self.lex()? {
            Token::Atom(..) | Token::String(..) => Ok(()),
            Token::OpenBrace => {
                while !self.eat(b'}') {
                    self.key()?;
                    self.expect(b'=')?;
                    self.skip_value()?;
                    self.expect(b';')?;
                }
                Ok(())
            }
            Token::OpenParen => {
                if self.eat(b')') {
                    return Ok(());
                }
                loop {
                    self.skip_value()?;
                    if self.eat(b')') {
                        return Ok(());
                    }
                    self.expect(b',')?;
                }
            }
            Token::Eof => Err(Error::UnexpectedEof),
        }
    }

    /// Visit the entries of a top level dictionary one key at a time.
    ///
    /// The callback must consume exactly one value, either by parsing or skipping it.
    pub fn for_each_entry(
        &mut self,
        mut visit: impl FnMut(&str, &mut Tokenizer<'a>) -> Result<(), Error>,
    ) -> Result<(), Error> {
        self.expect(b'{')?;
        while !self.eat(b'}') {
            let key = self.key()?;
            self.expect(b'=')?;
            visit(&key, self)?;
            self.expect(b';')?;
        }
        self.expect_eof()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_unquoted_strings() {
        let contents = r#"
        {
            name = "UFO Filename";
            value1 = ../../build/instance_ufos/Testing_Rg.ufo;
            value2 = _;
            value3 = $;
            value4 = /;
        }
        "#;

        let plist = Plist::parse(contents).unwrap();
        let expected = Plist::Dictionary(Dictionary::from_iter([
            ("name".into(), Plist::String("UFO Filename".into())),
            (
                "value1".into(),
                Plist::String("../../build/instance_ufos/Testing_Rg.ufo".into()),
            ),
            ("value2".into(), Plist::String("_".into())),
            ("value3".into(), Plist::String("$".into())),
            ("value4".into(), Plist::String("/".into())),
        ]));
        assert_eq!(expected, plist);
    }

    #[test]
    fn numbers_and_names() {
        let plist = Plist::parse("(1, -2.5, 0123, wght)").unwrap();
        assert_eq!(
            vec![
                Plist::Integer(1),
                Plist::Float(OrderedFloat(-2.5)),
                Plist::String("0123".into()),
                Plist::String("wght".into()),
            ],
            plist.expect_array().unwrap()
        );
    }

    #[test]
    fn escapes() {
        let plist = Plist::parse(r#""a\"b\\c\012d""#).unwrap();
        assert_eq!(Plist::String("a\"b\\c\nd".into()), plist);
    }

    #[test]
    fn skip_nested_without_parsing() {
        let mut tokenizer = Tokenizer::new("{a = ({b = (1,2);}, <00ff>); c = 3;}");
        tokenizer.skip_value().unwrap();
        tokenizer.expect_eof().unwrap();
    }

    #[test]
    fn skip_still_rejects_bad_syntax() {
        let mut tokenizer = Tokenizer::new("{a = (1 2);}");
        assert!(tokenizer.skip_value().is_err());
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(Err(Error::UnclosedString), Plist::parse("\"abc"));
    }

    #[test]
    fn visit_top_level_entries() {
        let mut keys = Vec::new();
        let mut tokenizer = Tokenizer::new("{x = 1; glyphs = (a, b); y = {z = 2;};}");
        tokenizer
            .for_each_entry(|key, t| {
                keys.push(key.to_string());
                t.skip_value()
            })
            .unwrap();
        assert_eq!(vec!["x", "glyphs", "y"], keys);
    }
}
