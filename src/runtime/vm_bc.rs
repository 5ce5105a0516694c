use crate::bytecode::Bytecode;
use crate::bytecode::assembler::RESERVED_SLOTS;
use crate::bytecode::op::{Instruction, Opcode, Operator};
use crate::runtime::frame::FrameStack;
use crate::runtime::runtime_error::{
    CallSite, RuntimeError, division_by_zero, input_error, invalid_operator, invalid_target,
    output_error,
};
use log::{debug, trace};
use std::io::{BufRead, Write};

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum number of nested procedure activations.
    pub max_call_depth: usize,
    pub max_steps: Option<usize>,
    /// Maximum depth of a single frame's evaluation stack.
    pub max_stack_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_call_depth: 10_000,
            max_steps: None,
            max_stack_size: 10_000,
        }
    }
}

/// Executes a [`Bytecode`] program.
///
/// Execution starts at instruction 0 in a program frame whose return address
/// is one past the last instruction, so the program's final `RET` halts the
/// machine.
pub struct Vm {
    frames: FrameStack,
    config: VmConfig,
    pc: usize,
    halt: usize,
    steps: usize,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            frames: FrameStack::new(),
            config,
            pc: 0,
            halt: 0,
            steps: 0,
        }
    }

    pub fn frames(&self) -> &FrameStack {
        &self.frames
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn reset_execution_state(&mut self, halt: usize) {
        self.frames.reset(halt);
        self.pc = 0;
        self.halt = halt;
        self.steps = 0;
    }

    pub fn run(
        &mut self,
        bc: &Bytecode,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> Result<(), RuntimeError> {
        self.reset_execution_state(bc.len());
        debug!("vm: running {} instructions", bc.len());

        while self.pc < self.halt {
            let at = self.pc;
            let ins = *bc.get(at).ok_or_else(|| invalid_target(at as i64))?;

            self.step(ins, input, output)
                .map_err(|e| e.at(at).with_call_stack(self.call_sites()))?;
        }

        output.flush().map_err(output_error)?;
        debug!("vm: halted after {} steps", self.steps);
        Ok(())
    }

    // Execution

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RuntimeError::new(&format!(
                    "execution step limit exceeded ({})",
                    max
                )));
            }
        }

        Ok(())
    }

    fn step(
        &mut self,
        ins: Instruction,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> Result<(), RuntimeError> {
        self.check_limits()?;
        trace!(
            "{:04} {:<14} {:>3} {:>6}  depth={}",
            self.pc,
            ins.opcode.name(),
            ins.level,
            ins.address,
            self.frames.depth()
        );

        self.pc += 1;

        match ins.opcode {
            Opcode::LoadConst => self.push(ins.address)?,

            Opcode::LoadVar => {
                let value = self.frames.load(ins.level, ins.address)?;
                self.push(value)?;
            }

            Opcode::StoreVar => {
                let value = self.pop()?;
                self.frames.store(ins.level, ins.address, value)?;
            }

            Opcode::Call => {
                // the program frame is not a call
                if self.frames.depth() > self.config.max_call_depth {
                    return Err(RuntimeError::new(&format!(
                        "call depth limit exceeded ({}) - possible infinite recursion",
                        self.config.max_call_depth
                    )));
                }

                let entry = self.target(ins.address)?;
                self.frames.call(self.pc, entry, ins.level)?;
                self.pc = entry;
            }

            Opcode::Enter => {
                let count = usize::try_from(ins.address)
                    .ok()
                    .and_then(|size| size.checked_sub(RESERVED_SLOTS))
                    .ok_or_else(|| {
                        RuntimeError::new(&format!("invalid frame size {}", ins.address))
                    })?;
                self.frames.current_mut()?.allocate(count);
            }

            Opcode::Jump => self.pc = self.target(ins.address)?,

            Opcode::JumpIfFalse => {
                if self.pop()? == 0 {
                    self.pc = self.target(ins.address)?;
                }
            }

            Opcode::Operate => self.operate(ins.address, input, output)?,
        }

        Ok(())
    }

    fn operate(
        &mut self,
        code: i64,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> Result<(), RuntimeError> {
        let op = Operator::from_code(code).ok_or_else(|| invalid_operator(code))?;

        match op {
            Operator::Return => {
                self.pc = self.frames.leave()?;
                trace!("return to {:04}", self.pc);
            }

            Operator::Read => {
                let value = read_int(input)?;
                self.push(value)?;
            }

            Operator::Write => {
                let value = self.pop()?;
                writeln!(output, "{}", value).map_err(output_error)?;
            }

            Operator::Odd => {
                let value = self.pop()?;
                self.push(value % 2)?;
            }

            _ => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.push(binary(op, lhs, rhs)?)?;
            }
        }

        Ok(())
    }

    fn target(&self, address: i64) -> Result<usize, RuntimeError> {
        usize::try_from(address)
            .ok()
            .filter(|&target| target <= self.halt)
            .ok_or_else(|| invalid_target(address))
    }

    fn call_sites(&self) -> Vec<CallSite> {
        self.frames
            .frames()
            .iter()
            .map(|frame| CallSite {
                entry: frame.entry,
                return_address: frame.return_address,
            })
            .collect()
    }

    // Stack helpers

    fn push(&mut self, value: i64) -> Result<(), RuntimeError> {
        let max = self.config.max_stack_size;
        let frame = self.frames.current_mut()?;

        if frame.stack.len() >= max {
            return Err(RuntimeError::new(&format!(
                "stack size limit exceeded ({})",
                max
            )));
        }

        frame.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<i64, RuntimeError> {
        self.frames.current_mut()?.pop()
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

fn binary(op: Operator, lhs: i64, rhs: i64) -> Result<i64, RuntimeError> {
    let value = match op {
        Operator::Add => lhs.wrapping_add(rhs),
        Operator::Sub => lhs.wrapping_sub(rhs),
        Operator::Mul => lhs.wrapping_mul(rhs),
        Operator::Div => {
            if rhs == 0 {
                return Err(division_by_zero());
            }
            lhs.wrapping_div(rhs)
        }
        Operator::Lt => (lhs < rhs) as i64,
        Operator::Le => (lhs <= rhs) as i64,
        Operator::Gt => (lhs > rhs) as i64,
        Operator::Ge => (lhs >= rhs) as i64,
        Operator::Eq => (lhs == rhs) as i64,
        Operator::Ne => (lhs != rhs) as i64,
        Operator::Return | Operator::Read | Operator::Write | Operator::Odd => {
            return Err(invalid_operator(op.code()));
        }
    };
    Ok(value)
}

/// Reads the next whitespace-separated integer.
fn read_int(input: &mut dyn BufRead) -> Result<i64, RuntimeError> {
    let mut token = Vec::new();

    loop {
        let buf = input
            .fill_buf()
            .map_err(|e| input_error(&e.to_string()))?;
        if buf.is_empty() {
            break;
        }

        let mut used = 0;
        let mut complete = false;
        for &byte in buf {
            used += 1;
            if byte.is_ascii_whitespace() {
                if !token.is_empty() {
                    complete = true;
                    break;
                }
            } else {
                token.push(byte);
            }
        }

        input.consume(used);
        if complete {
            break;
        }
    }

    if token.is_empty() {
        return Err(input_error("unexpected end of input"));
    }

    let text = String::from_utf8_lossy(&token);
    text.parse::<i64>()
        .map_err(|_| input_error(&format!("'{}' is not an integer", text)))
}
