//! Glue between the phases: source text in, bytecode or program output out.

use std::io::{BufRead, Write};

use log::debug;

use crate::bytecode::Bytecode;
use crate::bytecode::compile::Compiler;
use crate::bytecode::compile_error::CompileError;
use crate::frontend::lexer::{Lexer, LexerError};
use crate::frontend::parser::Parser;
use crate::frontend::parser_error::ParserError;
use crate::runtime::runtime_error::RuntimeError;
use crate::runtime::vm_bc::{Vm, VmConfig};

#[derive(Debug)]
pub enum Error {
    Lexer(LexerError),
    Parser(ParserError),
    Compile(CompileError),
    Runtime(RuntimeError),
    /// A bytecode image that could not be encoded or decoded
    Image(postcard::Error),
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Lexer(e) => write!(f, "lexer error: {}", e),
            Error::Parser(e) => write!(f, "parse error: {}", e),
            Error::Compile(e) => write!(f, "{}", e),
            Error::Runtime(e) => write!(f, "{}", e),
            Error::Image(e) => write!(f, "invalid bytecode image: {}", e),
            Error::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Lexer(e) => Some(e),
            Error::Parser(e) => Some(e),
            Error::Compile(e) => Some(e),
            Error::Runtime(e) => Some(e),
            Error::Image(e) => Some(e),
            Error::Io(e) => Some(e),
        }
    }
}

impl From<LexerError> for Error {
    fn from(e: LexerError) -> Self {
        Error::Lexer(e)
    }
}

impl From<ParserError> for Error {
    fn from(e: ParserError) -> Self {
        Error::Parser(e)
    }
}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Self {
        Error::Compile(e)
    }
}

impl From<RuntimeError> for Error {
    fn from(e: RuntimeError) -> Self {
        Error::Runtime(e)
    }
}

impl From<postcard::Error> for Error {
    fn from(e: postcard::Error) -> Self {
        Error::Image(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub fn compile_source(source: &str) -> Result<Bytecode, Error> {
    let tokens = Lexer::new(source).tokenize()?;
    debug!("lexed {} tokens", tokens.len());

    let program = Parser::new(tokens).parse()?;
    let bc = Compiler::new().compile_program(&program)?;
    debug!("compiled {} instructions", bc.len());

    Ok(bc)
}

pub fn run_source(
    source: &str,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
    config: VmConfig,
) -> Result<(), Error> {
    let bc = compile_source(source)?;
    Vm::with_config(config).run(&bc, input, output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::op::Opcode;
    use std::io::Cursor;

    fn run_with_input(source: &str, input: &str) -> Result<String, Error> {
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut output = Vec::new();
        run_source(source, &mut input, &mut output, VmConfig::default())?;
        Ok(String::from_utf8(output).unwrap())
    }

    fn run(source: &str) -> String {
        run_with_input(source, "").expect("program should run")
    }

    #[test]
    fn test_assign_and_write() {
        assert_eq!(run("var x; begin x := 1 + 2; write x end."), "3\n");
    }

    #[test]
    fn test_literal_round_trip() {
        assert_eq!(run("var x; begin x := 12345; write x end."), "12345\n");
        assert_eq!(run("var x; begin x := -42; write x end."), "-42\n");
    }

    #[test]
    fn test_recursion_reads_outer_variable() {
        let source = "
            var n, calls;
            procedure p;
            begin
                calls := calls + 1;
                write n;
                n := n - 1;
                if n > 0 then call p
            end;
            begin
                n := 3;
                calls := 0;
                call p;
                write calls
            end.";

        assert_eq!(run(source), "3\n2\n1\n3\n");
    }

    #[test]
    fn test_nested_procedure_reaches_through_recursion() {
        // q is nested in p; every activation of q reads p's local and the
        // program's global, whatever the recursion depth of p
        let source = "
            var depth;
            procedure p;
                var mine;
                procedure q;
                begin
                    write mine * 10 + depth
                end;
            begin
                depth := depth + 1;
                mine := depth;
                if depth < 3 then call p;
                call q
            end;
            begin
                depth := 0;
                call p
            end.";

        assert_eq!(run(source), "33\n23\n13\n");
    }

    #[test]
    fn test_if_else() {
        assert_eq!(run("begin if 1 < 2 then write 1 else write 2 end."), "1\n");
        assert_eq!(run("begin if 2 < 1 then write 1 else write 2 end."), "2\n");
    }

    #[test]
    fn test_while_sum() {
        let source = "
            var i, sum;
            begin
                i := 1;
                sum := 0;
                while i <= 3 do
                begin
                    sum := sum + i;
                    i := i + 1
                end;
                write sum
            end.";

        assert_eq!(run(source), "6\n");
    }

    #[test]
    fn test_constant_not_assignable() {
        let err = compile_source("const k = 1; begin k := 2 end.").unwrap_err();

        assert!(matches!(
            err,
            Error::Compile(CompileError::NotAssignable { .. })
        ));
        assert!(err.to_string().contains("not assignable"));
    }

    #[test]
    fn test_compile_error_never_runs() {
        let mut output = Vec::new();
        let result = run_source(
            "const k = 1; begin write 7; k := 2 end.",
            &mut Cursor::new(Vec::new()),
            &mut output,
            VmConfig::default(),
        );

        assert!(result.is_err());
        assert!(output.is_empty());
    }

    #[test]
    fn test_read_input() {
        let source = "var a, b; begin read a, b; write a * b end.";
        assert_eq!(run_with_input(source, "6 7\n").unwrap(), "42\n");
    }

    #[test]
    fn test_return_leaves_procedure_early() {
        let source = "
            procedure p;
            begin
                write 1;
                return;
                write 2
            end;
            begin call p; write 3 end.";

        assert_eq!(run(source), "1\n3\n");
    }

    #[test]
    fn test_odd_and_constants() {
        let source = "
            const limit = 5;
            var i;
            begin
                i := 0;
                while i < limit do
                begin
                    if odd i then write i;
                    i := i + 1
                end
            end.";

        assert_eq!(run(source), "1\n3\n");
    }

    #[test]
    fn test_calls_fully_patched() {
        let bc = compile_source(
            "
            procedure a; begin end;
            procedure b; begin call a end;
            begin call b; call a end.",
        )
        .unwrap();

        assert!(bc.dangling_targets().is_empty());

        let calls: Vec<_> = bc
            .code
            .iter()
            .filter(|ins| ins.opcode == Opcode::Call)
            .collect();
        assert_eq!(calls.len(), 3);
        for ins in &calls {
            assert!(ins.level >= 0);
            assert_eq!(bc.code[ins.address as usize].opcode, Opcode::Enter);
        }
        // main calls b and a from level 0; b calls a one level down
        let levels: Vec<i64> = calls.iter().map(|ins| ins.level).collect();
        assert_eq!(levels, vec![0, 0, 1]);
    }

    #[test]
    fn test_image_round_trip_runs() {
        let bc = compile_source("var x; begin x := 9; write x end.").unwrap();
        let restored = Bytecode::from_bytes(&bc.to_bytes().unwrap()).unwrap();

        let mut output = Vec::new();
        Vm::new()
            .run(&restored, &mut Cursor::new(Vec::new()), &mut output)
            .unwrap();
        assert_eq!(output, b"9\n");
    }

    #[test]
    fn test_phase_errors_convert() {
        assert!(matches!(compile_source("var x; x := 1 $"), Err(Error::Lexer(_))));
        assert!(matches!(
            compile_source("begin y := 1 end."),
            Err(Error::Parser(_))
        ));
        assert!(matches!(
            run_with_input("var x; begin x := 1 / 0 end.", ""),
            Err(Error::Runtime(_))
        ));
        assert!(matches!(
            run_with_input("var x; begin read x end.", ""),
            Err(Error::Runtime(_))
        ));
    }
}
