//! A reusable pushdown byte-dispatch machine.
//!
//! `Parser<T>` holds a bounded stack of 129-entry dispatch tables (one slot per
//! byte value `0..=127` plus a slot for everything outside that range) and drives
//! a vector of finalized tokens plus a "current token" buffer. Handlers are plain
//! function pointers, not trait objects or closures, mirroring the function-table
//! design of the C implementation this is ported from.

use std::fmt;

/// Maximum nesting depth of the dispatch-table stack. Exceeding this is a fatal
/// configuration error, never a runtime input error.
pub const MAX_DEPTH: usize = 8;

const TABLE_LEN: usize = 129;
const NON_ASCII_SLOT: usize = 0;

/// A dispatch-table handler. Receives the parser (for pushing/popping/appending),
/// the raw byte that triggered the call, and the caller-supplied state value.
pub type HandlerFn<T> = fn(&mut Parser<T>, u8, &mut T);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("parser dispatch stack exceeded max depth {MAX_DEPTH}")]
    DepthExceeded,
}

type Table<T> = [Option<HandlerFn<T>>; TABLE_LEN];

fn blank_table<T>() -> Table<T> {
    [None; TABLE_LEN]
}

fn slot_for(byte: u8) -> usize {
    if byte <= 127 { byte as usize + 1 } else { NON_ASCII_SLOT }
}

pub struct Parser<T> {
    stack: Vec<Table<T>>,
    tokens: Vec<Vec<u8>>,
    current: Option<Vec<u8>>,
    eof_handler: Option<HandlerFn<T>>,
}

impl<T> fmt::Debug for Parser<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("depth", &self.stack.len())
            .field("tokens", &self.tokens)
            .field("current", &self.current)
            .finish()
    }
}

impl<T> Default for Parser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Parser<T> {
    pub fn new() -> Self {
        Parser {
            stack: vec![blank_table()],
            tokens: Vec::new(),
            current: None,
            eof_handler: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn set_eof_handler(&mut self, f: HandlerFn<T>) {
        self.eof_handler = Some(f);
    }

    /// Push a fresh, blank dispatch table. Fatal if it would exceed [`MAX_DEPTH`].
    pub fn push(&mut self) {
        if let Err(e) = self.try_push() {
            tracing::error!("{e}");
            std::process::abort();
        }
    }

    /// Non-aborting variant of [`Parser::push`], for testing the boundary.
    pub fn try_push(&mut self) -> Result<(), ParserError> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(ParserError::DepthExceeded);
        }
        self.stack.push(blank_table());
        Ok(())
    }

    /// Restore the previous dispatch table. Panics if called at the base table;
    /// that would indicate a handler configuration bug, not bad input.
    pub fn pop(&mut self) {
        assert!(self.stack.len() > 1, "pop called at base dispatch table");
        self.stack.pop();
    }

    fn top_mut(&mut self) -> &mut Table<T> {
        self.stack.last_mut().expect("dispatch stack is never empty")
    }

    pub fn configure(&mut self, byte: u8, handler: Option<HandlerFn<T>>) {
        let slot = slot_for(byte);
        self.top_mut()[slot] = handler;
    }

    pub fn configure_range(&mut self, lo: u8, hi: u8, handler: Option<HandlerFn<T>>) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        for b in lo..=hi {
            self.configure(b, handler);
        }
    }

    pub fn configure_all(&mut self, bytes: &[u8], handler: Option<HandlerFn<T>>) {
        for &b in bytes {
            self.configure(b, handler);
        }
    }

    /// Install `handler` (or clear with `None`) across every slot of the current
    /// table, including the non-ASCII bucket.
    pub fn configure_default(&mut self, handler: Option<HandlerFn<T>>) {
        let table = self.top_mut();
        for slot in table.iter_mut() {
            *slot = handler;
        }
    }

    /// Feed one byte through the current top-of-stack table.
    pub fn feed(&mut self, byte: u8, state: &mut T) {
        let slot = slot_for(byte);
        let handler = self.stack.last().expect("dispatch stack is never empty")[slot];
        if let Some(f) = handler {
            f(self, byte, state);
        }
    }

    pub fn feed_eof(&mut self, state: &mut T) {
        if let Some(f) = self.eof_handler {
            f(self, 0, state);
        }
    }

    pub fn append_byte(&mut self, byte: u8) {
        self.current.get_or_insert_with(Vec::new).push(byte);
    }

    pub fn cut_token(&mut self) {
        if let Some(cur) = self.current.take() {
            self.tokens.push(cur);
        }
    }

    pub fn clear_tokens(&mut self) {
        self.tokens.clear();
    }

    pub fn tokens(&self) -> &[Vec<u8>] {
        &self.tokens
    }

    pub fn take_tokens(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.tokens)
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Install the default shell-like handler set: double/single-quoted regions,
    /// `#` comments to end-of-line, and bare-backslash escapes.
    pub fn enable_defaults(&mut self) {
        self.configure(b'"', Some(dquote_begin::<T>));
        self.configure(b'\'', Some(squote_begin::<T>));
        self.configure(b'#', Some(comment_begin::<T>));
        self.configure(b'\\', Some(escape_begin::<T>));
    }
}

fn token_append<T>(parser: &mut Parser<T>, c: u8, _state: &mut T) {
    parser.append_byte(c);
}

fn pop_handler<T>(parser: &mut Parser<T>, _c: u8, _state: &mut T) {
    parser.pop();
}

fn dquote_begin<T>(parser: &mut Parser<T>, _c: u8, _state: &mut T) {
    parser.push();
    parser.configure_default(Some(token_append::<T>));
    parser.configure(b'"', Some(pop_handler::<T>));
    parser.configure(b'\\', Some(escape_begin::<T>));
}

fn squote_begin<T>(parser: &mut Parser<T>, _c: u8, _state: &mut T) {
    parser.push();
    parser.configure_default(Some(token_append::<T>));
    parser.configure(b'\'', Some(pop_handler::<T>));
    parser.configure(b'\\', Some(strict_escape_begin::<T>));
}

fn comment_begin<T>(parser: &mut Parser<T>, _c: u8, _state: &mut T) {
    parser.push();
    parser.configure(b'\n', Some(comment_end::<T>));
}

fn comment_end<T>(parser: &mut Parser<T>, _c: u8, state: &mut T) {
    parser.pop();
    parser.feed(b'\n', state);
}

fn escape_begin<T>(parser: &mut Parser<T>, _c: u8, _state: &mut T) {
    parser.push();
    parser.configure_default(Some(escape_end::<T>));
}

fn escape_end<T>(parser: &mut Parser<T>, c: u8, _state: &mut T) {
    match c {
        b'"' | b'\'' => parser.append_byte(c),
        _ => {
            parser.append_byte(b'\\');
            parser.append_byte(c);
        }
    }
    parser.pop();
}

fn strict_escape_begin<T>(parser: &mut Parser<T>, _c: u8, _state: &mut T) {
    parser.push();
    parser.configure_default(Some(strict_escape_end::<T>));
}

fn strict_escape_end<T>(parser: &mut Parser<T>, c: u8, _state: &mut T) {
    match c {
        b'"' | b'\'' => parser.append_byte(c),
        _ => {
            parser.append_byte(b'\\');
            parser.append_byte(b'\\');
            parser.append_byte(c);
        }
    }
    parser.pop();
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
