#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(i64),

    // Identifier (variable, constant or procedure name)
    Ident(std::string::String),

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,

    // Assignment
    Assign,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Delimiters
    LParen,
    RParen,
    Semicolon,
    Period,
    Comma,

    // Keywords
    Begin,
    Call,
    Const,
    Do,
    Else,
    End,
    If,
    Odd,
    Procedure,
    Read,
    Return,
    Then,
    Var,
    While,
    Write,

    // End of source
    Eof,
}

impl Token {
    /// Maps a scanned word to its keyword token, if it is one.
    pub fn keyword(word: &str) -> Option<Token> {
        let token = match word {
            "begin" => Token::Begin,
            "call" => Token::Call,
            "const" => Token::Const,
            "do" => Token::Do,
            "else" => Token::Else,
            "end" => Token::End,
            "if" => Token::If,
            "odd" => Token::Odd,
            "procedure" => Token::Procedure,
            "read" => Token::Read,
            "return" => Token::Return,
            "then" => Token::Then,
            "var" => Token::Var,
            "while" => Token::While,
            "write" => Token::Write,
            _ => return None,
        };
        Some(token)
    }

    /// Source spelling of the token kind, as used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Token::Number(_) => "number",
            Token::Ident(_) => "identifier",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Assign => ":=",
            Token::Eq => "=",
            Token::NotEq => "#",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Semicolon => ";",
            Token::Period => ".",
            Token::Comma => ",",
            Token::Begin => "begin",
            Token::Call => "call",
            Token::Const => "const",
            Token::Do => "do",
            Token::Else => "else",
            Token::End => "end",
            Token::If => "if",
            Token::Odd => "odd",
            Token::Procedure => "procedure",
            Token::Read => "read",
            Token::Return => "return",
            Token::Then => "then",
            Token::Var => "var",
            Token::While => "while",
            Token::Write => "write",
            Token::Eof => "end of source",
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Token::Eq | Token::NotEq | Token::Lt | Token::LtEq | Token::Gt | Token::GtEq
        )
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => write!(f, "{}", name),
            other => write!(f, "{}", other.describe()),
        }
    }
}
