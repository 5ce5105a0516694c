use clap::Parser as ClapParser;
use log::{info, warn};
use std::{
    fs,
    io,
    path::Path,
    process,
};

use pl0::bytecode::Bytecode;
use pl0::bytecode::disasm::{disassemble_to_string, print_bc, print_bc_stats};
use pl0::driver::{self, compile_source};
use pl0::frontend::lexer::Lexer;
use pl0::frontend::parser::Parser;
use pl0::frontend::token_dumper::TokenDumper;
use pl0::lang::printer::TreePrinter;
use pl0::runtime::vm_bc::{Vm, VmConfig};

#[derive(ClapParser, Debug)]
#[command(author, version, about = "PL/0 compiler and stack machine", long_about = None)]
struct Cli {
    /// Source file (or bytecode image with --image)
    file: String,

    /// Print the token stream instead of running
    #[arg(long)]
    tokens: bool,

    /// Disable colored token output
    #[arg(long)]
    no_color: bool,

    /// Print the resolved tree instead of running
    #[arg(long)]
    ast: bool,

    /// Print the tab-separated instruction dump instead of running
    #[arg(long)]
    bc: bool,

    /// Print an annotated listing instead of running
    #[arg(long)]
    listing: bool,

    /// Print opcode statistics instead of running
    #[arg(long)]
    stats: bool,

    /// Write the compiled program to a bytecode image
    #[arg(long, value_name = "OUT")]
    emit: Option<String>,

    /// Treat the input file as a bytecode image
    #[arg(long)]
    image: bool,

    /// Abort after this many instructions
    #[arg(long)]
    max_steps: Option<usize>,

    /// Maximum procedure nesting at run time
    #[arg(long, default_value_t = VmConfig::default().max_call_depth)]
    max_depth: usize,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// What to print instead of running the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dump {
    Instructions,
    Listing,
    Stats,
}

impl Cli {
    fn dump(&self) -> Option<Dump> {
        if self.bc {
            Some(Dump::Instructions)
        } else if self.listing {
            Some(Dump::Listing)
        } else if self.stats {
            Some(Dump::Stats)
        } else {
            None
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let bc = if cli.image {
        load_image(&cli.file)
    } else {
        match compile_file(&cli) {
            Some(bc) => bc,
            None => return,
        }
    };

    if let Some(out) = &cli.emit {
        write_image(&bc, out);
        return;
    }

    match cli.dump() {
        Some(Dump::Instructions) => print!("{}", disassemble_to_string(&bc)),
        Some(Dump::Listing) => print_bc(&bc),
        Some(Dump::Stats) => print_bc_stats(&bc),
        None => execute(&bc, &cli),
    }
}

/// Compiles the source file, or returns `None` after a front-end dump.
fn compile_file(cli: &Cli) -> Option<Bytecode> {
    check_extension(&cli.file);
    let source = match fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", cli.file, e);
            process::exit(1);
        }
    };

    if cli.tokens {
        dump_tokens(&source, cli.no_color);
        return None;
    }

    if cli.ast {
        dump_tree(&source);
        return None;
    }

    match compile_source(&source) {
        Ok(bc) => Some(bc),
        Err(e) => fail(e),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn check_extension(filename: &str) {
    let path = Path::new(filename);
    if path.extension().and_then(|e| e.to_str()) != Some("pl0") {
        warn!("expected a .pl0 file, got {}", filename);
    }
}

fn fail(e: driver::Error) -> ! {
    eprintln!("{}", e);
    process::exit(1);
}

fn dump_tokens(source: &str, no_color: bool) {
    match Lexer::new(source).tokenize() {
        Ok(tokens) => {
            let mut dumper = TokenDumper::new();
            if no_color {
                dumper = dumper.no_color();
            }
            dumper.dump(&tokens);
        }
        Err(e) => fail(e.into()),
    }
}

fn dump_tree(source: &str) {
    let tokens = match Lexer::new(source).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => fail(e.into()),
    };
    match Parser::new(tokens).parse() {
        Ok(program) => print!("{}", TreePrinter::new().print(&program)),
        Err(e) => fail(e.into()),
    }
}

fn load_image(path: &str) -> Bytecode {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => fail(e.into()),
    };
    let bc = match Bytecode::from_bytes(&bytes) {
        Ok(bc) => bc,
        Err(e) => fail(e.into()),
    };

    let dangling = bc.dangling_targets();
    if !dangling.is_empty() {
        warn!("image has branches with invalid targets at {:?}", dangling);
    }
    info!("loaded {} instructions from {}", bc.len(), path);
    bc
}

fn write_image(bc: &Bytecode, out: &str) {
    let bytes = match bc.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => fail(e.into()),
    };
    if let Err(e) = fs::write(out, &bytes) {
        fail(e.into());
    }
    info!("wrote {} instructions ({} bytes) to {}", bc.len(), bytes.len(), out);
}

fn execute(bc: &Bytecode, cli: &Cli) {
    let config = VmConfig {
        max_call_depth: cli.max_depth,
        max_steps: cli.max_steps,
        ..VmConfig::default()
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout().lock();

    if let Err(e) = Vm::with_config(config).run(bc, &mut input, &mut output) {
        fail(e.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("pl0").chain(args.iter().copied()))
    }

    #[test]
    fn test_image_can_be_dumped() {
        assert_eq!(cli(&["--image", "--bc", "prog.img"]).dump(), Some(Dump::Instructions));
        assert_eq!(cli(&["--image", "--listing", "prog.img"]).dump(), Some(Dump::Listing));
        assert_eq!(cli(&["--image", "--stats", "prog.img"]).dump(), Some(Dump::Stats));
    }

    #[test]
    fn test_runs_without_dump_flags() {
        assert_eq!(cli(&["prog.pl0"]).dump(), None);
        assert_eq!(cli(&["--image", "prog.img"]).dump(), None);
    }

    #[test]
    fn test_vm_limits_from_flags() {
        let cli = cli(&["--max-steps", "50", "--max-depth", "8", "prog.pl0"]);
        assert_eq!(cli.max_steps, Some(50));
        assert_eq!(cli.max_depth, 8);
        assert_eq!(cli.verbose, 0);
    }
}
