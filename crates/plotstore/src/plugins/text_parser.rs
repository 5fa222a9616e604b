//! Row tokenizer shared by the producers
//!
//! A row is a whitespace separated list of tokens. Tokens of the form
//! `key:value` become fields, anything else is a bare word:
//!
//! ```text
//! time:4 op:exec_msg id:1000 src:1 dest:2 exec_id:read exec_duration:2
//! lifeline 3
//! Time:12 Value:4
//! ```

use chumsky::prelude::*;

/// One whitespace separated token of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Field { key: &'a str, value: &'a str },
    Word(&'a str),
}

fn separator<'src>() -> impl Parser<'src, &'src str, ()> + Clone {
    any()
        .filter(|c: &char| c.is_whitespace())
        .repeated()
        .at_least(1)
        .ignored()
}

fn key<'src>() -> impl Parser<'src, &'src str, &'src str> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
        .repeated()
        .at_least(1)
        .to_slice()
}

fn non_blank<'src>() -> impl Parser<'src, &'src str, &'src str> + Clone {
    any()
        .filter(|c: &char| !c.is_whitespace())
        .repeated()
        .at_least(1)
        .to_slice()
}

fn token<'src>() -> impl Parser<'src, &'src str, Token<'src>> + Clone {
    let field = key()
        .then_ignore(just(':'))
        .then(non_blank())
        .map(|(key, value)| Token::Field { key, value });

    field.or(non_blank().map(Token::Word))
}

fn row<'src>() -> impl Parser<'src, &'src str, Vec<Token<'src>>> + Clone {
    separator()
        .or_not()
        .ignore_then(
            token()
                .then_ignore(separator().or_not())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then_ignore(end())
}

/// Tokenize a row; `None` only for input the grammar cannot split
pub fn tokenize(text: &str) -> Option<Vec<Token<'_>>> {
    row().parse(text).into_result().ok()
}

/// Fields of a tokenized row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFields<'a> {
    tokens: Vec<Token<'a>>,
}

impl<'a> RowFields<'a> {
    pub fn parse(text: &'a str) -> Self {
        Self {
            tokens: tokenize(text).unwrap_or_default(),
        }
    }

    pub fn tokens(&self) -> &[Token<'a>] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Value of the first field named `key`; keys are case sensitive
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.tokens.iter().find_map(|token| match token {
            Token::Field { key: k, value } if *k == key => Some(*value),
            _ => None,
        })
    }

    pub fn int(&self, key: &str) -> Option<i32> {
        self.get(key)?.parse().ok()
    }

    /// `N` of a `lifeline N` declaration
    pub fn lifeline(&self) -> Option<i32> {
        let position = self
            .tokens
            .iter()
            .position(|token| *token == Token::Word("lifeline"))?;
        match self.tokens.get(position + 1)? {
            Token::Word(index) => index.parse().ok(),
            Token::Field { .. } => None,
        }
    }
}
