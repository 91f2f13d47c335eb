//! The nested `"key" "value"` block format consumed and produced by the
//! serializers.
//!
//! A block is a name followed by a brace-delimited body holding quoted
//! key/value pairs and nested blocks:
//!
//! ```text
//! blockname
//! {
//!     "key" "value"
//!     subblockname
//!     {
//!     }
//! }
//! ```

use std::{
    io::{BufRead, Error as IoError, Write},
    sync::LazyLock,
};

use regex::Regex;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum KeyValuesError {
    #[error("IO Error: {0}")]
    Io(#[from] IoError),
    #[error("Found Unknown Token: {0} Line: {1}")]
    UnknownToken(char, usize),
    #[error("Found Unknown Escape Character: {0} Line: {1}")]
    UnknownEscapeCharacter(char, usize),
    #[error("Invalid Token On Line: {0}")]
    InvalidToken(usize),
    #[error("Unclosed Block: {0}")]
    UnclosedBlock(String),
}

static INTEGER_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-+]?[0-9]+$").unwrap());
static FLOAT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-+]?([0-9]+\.[0-9]*|\.[0-9]+)([eE][-+]?[0-9]+)?$").unwrap());

/// The lexical shape of a field's raw text.
///
/// Values are stored untyped; this classification is what typed importers use
/// to decide how to coerce a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KvDataType {
    Int,
    Float,
    Str,
}

impl KvDataType {
    /// Classifies raw field text. Anything that is not integer-looking or
    /// float-looking (including the empty string) is a plain string.
    pub fn of(text: &str) -> Self {
        if INTEGER_PATTERN.is_match(text) {
            return KvDataType::Int;
        }
        if FLOAT_PATTERN.is_match(text) {
            return KvDataType::Float;
        }
        KvDataType::Str
    }
}

/// One entry in a block body: a scalar field or a nested block.
#[derive(Clone, Debug)]
pub enum KeyValuesEntry {
    Value { key: String, value: String },
    Block(KeyValues),
}

/// A single named block, holding fields and nested blocks in file order.
#[derive(Clone, Debug, Default)]
pub struct KeyValues {
    name: String,
    entries: Vec<KeyValuesEntry>,
}

impl KeyValues {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push(KeyValuesEntry::Value {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn add_block(&mut self, block: KeyValues) {
        self.entries.push(KeyValuesEntry::Block(block));
    }

    /// Iterates the scalar fields of the block in file order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|entry| match entry {
            KeyValuesEntry::Value { key, value } => Some((key.as_str(), value.as_str())),
            KeyValuesEntry::Block(_) => None,
        })
    }

    /// Iterates the nested blocks in file order.
    pub fn blocks(&self) -> impl Iterator<Item = &KeyValues> {
        self.entries.iter().filter_map(|entry| match entry {
            KeyValuesEntry::Value { .. } => None,
            KeyValuesEntry::Block(block) => Some(block),
        })
    }

    /// Returns the first field with the given key, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values().find(|(field_key, _)| field_key.eq_ignore_ascii_case(key)).map(|(_, value)| value)
    }

    /// Returns the first field with the given key, or the default if absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Parses a sequence of top-level blocks until the end of input.
    pub fn parse_blocks(buffer: &mut impl BufRead) -> Result<Vec<KeyValues>, KeyValuesError> {
        let mut reader = TokenReader::new(buffer);
        let mut blocks = Vec::new();

        while let Some(token) = reader.next_token()? {
            match token {
                Token::Text(name) => match reader.next_token()? {
                    Some(Token::OpenBrace) => blocks.push(read_block(&mut reader, name)?),
                    _ => return Err(KeyValuesError::InvalidToken(reader.line_count)),
                },
                _ => return Err(KeyValuesError::InvalidToken(reader.line_count)),
            }
        }

        Ok(blocks)
    }
}

fn read_block<B: BufRead>(reader: &mut TokenReader<B>, name: String) -> Result<KeyValues, KeyValuesError> {
    let mut block = KeyValues::new(name);

    loop {
        match reader.next_token()? {
            Some(Token::CloseBrace) => return Ok(block),
            Some(Token::Text(key)) => match reader.next_token()? {
                Some(Token::Text(value)) => block.add_value(key, value),
                Some(Token::OpenBrace) => block.add_block(read_block(reader, key)?),
                Some(Token::CloseBrace) => return Err(KeyValuesError::InvalidToken(reader.line_count)),
                None => return Err(KeyValuesError::UnclosedBlock(block.name)),
            },
            Some(Token::OpenBrace) => return Err(KeyValuesError::InvalidToken(reader.line_count)),
            None => return Err(KeyValuesError::UnclosedBlock(block.name)),
        }
    }
}

enum Token {
    Text(String),
    OpenBrace,
    CloseBrace,
}

struct TokenReader<B: BufRead> {
    buffer: B,
    line_count: usize,
    current_line: Vec<char>,
    cursor_position: usize,
}

impl<B: BufRead> TokenReader<B> {
    fn new(buffer: B) -> Self {
        Self {
            buffer,
            line_count: 0,
            current_line: Vec::new(),
            cursor_position: 0,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, KeyValuesError> {
        loop {
            let character = match self.peek_char()? {
                Some(character) => character,
                None => return Ok(None),
            };

            match character {
                character if character.is_whitespace() => {
                    self.cursor_position += 1;
                }
                '{' => {
                    self.cursor_position += 1;
                    return Ok(Some(Token::OpenBrace));
                }
                '}' => {
                    self.cursor_position += 1;
                    return Ok(Some(Token::CloseBrace));
                }
                '"' => {
                    self.cursor_position += 1;
                    return self.read_quoted().map(Some);
                }
                '/' => {
                    self.cursor_position += 1;
                    match self.peek_char()? {
                        Some('/') => {
                            // Line comment, skip the rest of the line.
                            self.cursor_position = self.current_line.len();
                        }
                        _ => return Err(KeyValuesError::UnknownToken('/', self.line_count)),
                    }
                }
                _ => return self.read_bare().map(Some),
            }
        }
    }

    /// Reads a quoted string token. The opening quote has been consumed;
    /// quoted strings may span lines.
    fn read_quoted(&mut self) -> Result<Token, KeyValuesError> {
        let mut text = String::new();

        loop {
            let character = match self.peek_char()? {
                Some(character) => character,
                None => return Err(KeyValuesError::InvalidToken(self.line_count)),
            };
            self.cursor_position += 1;

            match character {
                '"' => return Ok(Token::Text(text)),
                '\\' => {
                    let escaped = match self.peek_char()? {
                        Some(escaped) => escaped,
                        None => return Err(KeyValuesError::InvalidToken(self.line_count)),
                    };
                    self.cursor_position += 1;

                    match escaped {
                        '"' => text.push('"'),
                        '\\' => text.push('\\'),
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        _ => return Err(KeyValuesError::UnknownEscapeCharacter(escaped, self.line_count)),
                    }
                }
                _ => text.push(character),
            }
        }
    }

    /// Reads an unquoted word token, terminated by whitespace, a quote, or a
    /// brace.
    fn read_bare(&mut self) -> Result<Token, KeyValuesError> {
        let mut text = String::new();

        while let Some(character) = self.peek_char()? {
            if character.is_whitespace() || matches!(character, '{' | '}' | '"') {
                break;
            }
            text.push(character);
            self.cursor_position += 1;
        }

        Ok(Token::Text(text))
    }

    fn peek_char(&mut self) -> Result<Option<char>, KeyValuesError> {
        while self.cursor_position == self.current_line.len() {
            let mut line = String::new();
            let byte_count = self.buffer.read_line(&mut line)?;
            if byte_count == 0 {
                return Ok(None);
            }
            self.current_line = line.chars().collect();
            self.cursor_position = 0;
            self.line_count += 1;
        }

        Ok(self.current_line.get(self.cursor_position).copied())
    }
}

/// Tab-indented writer for the block format.
pub struct KeyValuesWriter<T: Write> {
    buffer: T,
    tab_index: usize,
}

impl<T: Write> KeyValuesWriter<T> {
    pub fn new(buffer: T) -> Self {
        Self { buffer, tab_index: 0 }
    }

    fn write_tabs(&mut self) -> Result<(), IoError> {
        if self.tab_index == 0 {
            return Ok(());
        }
        self.buffer.write_all(&vec![b'\t'; self.tab_index])
    }

    /// Writes one indented line.
    pub fn line(&mut self, string: &str) -> Result<(), IoError> {
        self.write_tabs()?;
        self.buffer.write_all(string.as_bytes())?;
        self.buffer.write_all(b"\n")
    }

    /// Writes one `"key" "value"` line.
    pub fn keyvalue(&mut self, key: &str, value: &str) -> Result<(), IoError> {
        self.line(&format!("\"{}\" \"{}\"", key, value))
    }

    /// Writes the block name and opening brace, increasing the indent.
    pub fn begin_block(&mut self, name: &str) -> Result<(), IoError> {
        self.line(name)?;
        self.write_tabs()?;
        self.buffer.write_all(b"{\n")?;
        self.tab_index += 1;
        Ok(())
    }

    /// Writes the closing brace, decreasing the indent.
    pub fn end_block(&mut self) -> Result<(), IoError> {
        self.tab_index -= 1;
        self.write_tabs()?;
        self.buffer.write_all(b"}\n")
    }
}
