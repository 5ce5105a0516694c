use crate::frontend::lexer::Spanned;
use crate::frontend::token::Token;

/// Prints a token stream one token per line as `line:col<TAB>kind<TAB>text`.
pub struct TokenDumper {
    pub color: bool,
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self { color: true }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const BLU: &'static str = "\x1b[34m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Spanned]) -> String {
        let mut out = String::new();
        for s in tokens {
            let (colr, reset) = if self.color {
                (self.color(&s.token), Self::RESET)
            } else {
                ("", "")
            };
            out.push_str(&format!(
                "{}\t{}{}\t{}{}\n",
                s.span,
                colr,
                self.kind(&s.token),
                self.text(&s.token),
                reset
            ));
        }
        out
    }

    fn kind(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            Number(_) => "NUMBER",
            Ident(_) => "IDENT",
            Eof => "EOF",
            Plus | Minus | Star | Slash | Assign => "OP",
            Eq | NotEq | Lt | LtEq | Gt | GtEq => "CMP",
            LParen | RParen | Semicolon | Period | Comma => "PUNCT",
            _ => "KEYWORD",
        }
    }

    fn text(&self, t: &Token) -> String {
        match t {
            Token::Eof => String::new(),
            other => other.to_string(),
        }
    }

    fn color(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            Eof => Self::DIM,
            Number(_) => Self::CYN,
            Ident(_) => Self::YEL,
            Plus | Minus | Star | Slash | Assign => Self::MAG,
            Eq | NotEq | Lt | LtEq | Gt | GtEq => Self::MAG,
            LParen | RParen | Semicolon | Period | Comma => Self::DIM,
            _ => Self::BLU,
        }
    }
}
