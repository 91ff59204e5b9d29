//! Instantiates the generic byte-stream parser with the application command
//! grammar (§4.2). Grounded on `mk_app_parser_new()` in `mkapp_parser.c`: a
//! default "append byte" handler, the parser's own default handler set
//! (quotes/comments/escapes), `;` cutting and dispatching a command, and
//! whitespace cutting tokens.

use cpsh_parser::Parser;

/// State threaded through every byte fed to the [`Parser`]. `feed` is purely
/// synchronous (plain `fn` pointers, §4.1), so command *dispatch* — which
/// needs to `.await` spawning/writing/waiting — cannot happen inline inside a
/// handler. Instead `;` only finalizes a completed command into `ready`; the
/// caller (`compshell`'s `Engine`) drains `ready` after each fed chunk and
/// dispatches each command in order, preserving "commands parsed from the
/// command input are dispatched in source order" (§5) without requiring
/// handlers to be async.
#[derive(Default)]
pub struct ParserState {
    pub ready: Vec<Vec<Vec<u8>>>,
    pub eof: bool,
}

fn token_append(parser: &mut Parser<ParserState>, c: u8, _state: &mut ParserState) {
    parser.append_byte(c);
}

fn cut_on_whitespace(parser: &mut Parser<ParserState>, _c: u8, _state: &mut ParserState) {
    parser.cut_token();
}

fn command_end(parser: &mut Parser<ParserState>, _c: u8, state: &mut ParserState) {
    parser.cut_token();
    if parser.token_count() > 0 {
        state.ready.push(parser.take_tokens());
    }
}

fn on_eof(_parser: &mut Parser<ParserState>, _c: u8, state: &mut ParserState) {
    state.eof = true;
}

/// Build a freshly wired command parser. `configure_default` must run before
/// `enable_defaults`/`;`/whitespace, since it overwrites every slot of the
/// top-of-stack table.
pub fn build_parser() -> Parser<ParserState> {
    let mut parser = Parser::new();
    parser.configure_default(Some(token_append));
    parser.enable_defaults();
    parser.configure(b';', Some(command_end));
    parser.configure_all(b" \t\n", Some(cut_on_whitespace));
    parser.set_eof_handler(on_eof);
    parser
}
