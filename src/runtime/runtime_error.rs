/// One live activation at the time of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// First instruction of the frame's code (0 for the program frame).
    pub entry: usize,
    pub return_address: usize,
}

#[derive(Debug)]
pub struct RuntimeError {
    pub message: String,
    /// Index of the instruction that failed, when known.
    pub pc: Option<usize>,
    /// Live frames, outermost first.
    pub call_stack: Vec<CallSite>,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runtime error: {}", self.message)?;

        if let Some(pc) = self.pc {
            write!(f, " (at instruction {})", pc)?;
        }

        if !self.call_stack.is_empty() {
            write!(f, "\n  call stack:")?;

            for (i, site) in self.call_stack.iter().rev().enumerate() {
                write!(
                    f,
                    "\n    {}: @{:04} returns to {}",
                    i, site.entry, site.return_address
                )?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn new(msg: &str) -> Self {
        RuntimeError {
            message: msg.to_string(),
            pc: None,
            call_stack: Vec::new(),
        }
    }

    pub fn at(mut self, pc: usize) -> Self {
        self.pc.get_or_insert(pc);
        self
    }

    pub fn with_call_stack(mut self, call_stack: Vec<CallSite>) -> Self {
        if self.call_stack.is_empty() {
            self.call_stack = call_stack;
        }
        self
    }
}

pub fn stack_underflow() -> RuntimeError {
    RuntimeError::new("stack underflow: evaluation stack is empty")
}

pub fn frame_chain_overrun(distance: i64) -> RuntimeError {
    RuntimeError::new(&format!(
        "frame chain overrun: cannot follow {} static link(s)",
        distance
    ))
}

pub fn division_by_zero() -> RuntimeError {
    RuntimeError::new("division by zero")
}

pub fn invalid_operator(code: i64) -> RuntimeError {
    RuntimeError::new(&format!("invalid operator {}", code))
}

pub fn invalid_target(address: i64) -> RuntimeError {
    RuntimeError::new(&format!("invalid jump target {}", address))
}

pub fn input_error(detail: &str) -> RuntimeError {
    RuntimeError::new(&format!("input error: {}", detail))
}

pub fn output_error(err: std::io::Error) -> RuntimeError {
    RuntimeError::new(&format!("output error: {}", err))
}
