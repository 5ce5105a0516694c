use crate::runtime::runtime_error::{RuntimeError, frame_chain_overrun, stack_underflow};

/// One activation record.
///
/// Links are indices into the owning [`FrameStack`]: `dynamic_link` is the
/// caller, restored on return; `static_link` is the frame of the lexically
/// enclosing block, used only for variable lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub return_address: usize,
    /// Address the frame's code starts at (0 for the program frame).
    pub entry: usize,
    pub dynamic_link: Option<usize>,
    pub static_link: Option<usize>,
    pub stack: Vec<i64>,
    pub locals: Vec<i64>,
}

impl Frame {
    pub fn new(
        return_address: usize,
        entry: usize,
        dynamic_link: Option<usize>,
        static_link: Option<usize>,
    ) -> Self {
        Self {
            return_address,
            entry,
            dynamic_link,
            static_link,
            stack: Vec::new(),
            locals: Vec::new(),
        }
    }

    pub fn push(&mut self, value: i64) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<i64, RuntimeError> {
        self.stack.pop().ok_or_else(stack_underflow)
    }

    /// Adds `count` zero-initialized local slots.
    pub fn allocate(&mut self, count: usize) {
        self.locals.resize(self.locals.len() + count, 0);
    }
}

/// The live chain of activation records.
///
/// Frames are created by calls and destroyed by returns in strict LIFO order,
/// so the chain is a stack and the current frame is always the last one. A
/// frame's static link always points further down the stack: a block's
/// lexical ancestors are still active while it runs.
#[derive(Debug, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Discards every frame and installs the program frame, whose return
    /// address is `halt`.
    pub fn reset(&mut self, halt: usize) {
        self.frames.clear();
        self.frames.push(Frame::new(halt, 0, None, None));
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    fn current_index(&self) -> Result<usize, RuntimeError> {
        self.frames
            .len()
            .checked_sub(1)
            .ok_or_else(|| RuntimeError::new("no active frame"))
    }

    pub fn current(&self) -> Result<&Frame, RuntimeError> {
        let index = self.current_index()?;
        Ok(&self.frames[index])
    }

    pub fn current_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        let index = self.current_index()?;
        Ok(&mut self.frames[index])
    }

    /// Follows the current frame's static link `distance` times.
    pub fn resolve(&self, distance: i64) -> Result<usize, RuntimeError> {
        if distance < 0 {
            return Err(frame_chain_overrun(distance));
        }

        let mut index = self.current_index()?;
        for _ in 0..distance {
            index = self.frames[index]
                .static_link
                .ok_or_else(|| frame_chain_overrun(distance))?;
        }
        Ok(index)
    }

    /// Creates a frame for a call from the current frame and makes it current.
    pub fn call(
        &mut self,
        return_address: usize,
        entry: usize,
        distance: i64,
    ) -> Result<(), RuntimeError> {
        let caller = self.current_index()?;
        let enclosing = self.resolve(distance)?;
        self.frames.push(Frame::new(
            return_address,
            entry,
            Some(caller),
            Some(enclosing),
        ));
        Ok(())
    }

    /// Destroys the current frame, making its caller current, and returns
    /// the address to continue at.
    pub fn leave(&mut self) -> Result<usize, RuntimeError> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| RuntimeError::new("return with no active frame"))?;
        debug_assert_eq!(frame.dynamic_link, self.frames.len().checked_sub(1));
        Ok(frame.return_address)
    }

    pub fn load(&self, distance: i64, index: i64) -> Result<i64, RuntimeError> {
        let frame = &self.frames[self.resolve(distance)?];
        usize::try_from(index)
            .ok()
            .and_then(|i| frame.locals.get(i).copied())
            .ok_or_else(|| bad_slot(index))
    }

    pub fn store(&mut self, distance: i64, index: i64, value: i64) -> Result<(), RuntimeError> {
        let target = self.resolve(distance)?;
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| self.frames[target].locals.get_mut(i))
            .ok_or_else(|| bad_slot(index))?;
        *slot = value;
        Ok(())
    }
}

fn bad_slot(index: i64) -> RuntimeError {
    RuntimeError::new(&format!("local slot {} out of range", index))
}
