use super::abi::Convention;
use super::assembly::Memory;
use crate::error::{CodegenError, CodegenResult};
use crate::symbols::{FunctionSymbol, SymbolKind};

pub const WORD: usize = 8;

/// Where every parameter and local of a function lives, relative to `%rbp`.
///
/// ```text
///  16+8k(%rbp)  stack-passed parameter 6+k
///   8(%rbp)     return address
///   0(%rbp)     caller's frame pointer
///  -8(%rbp)     parameter 0 (captured from its register)
///   ...         parameters 1..5, one padding word if their amount is odd
///   ...         locals, rounded up to an even amount of words
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout<'code> {
    /// parameters pushed from registers in the prologue
    pub captured: usize,
    /// whether one word of padding follows the captured parameters
    pub padding: bool,
    /// words reserved for locals (always even)
    pub local_words: usize,
    slots: Vec<Memory<'code>>,
}

impl<'code> FrameLayout<'code> {
    pub fn new(function: &FunctionSymbol, convention: Convention) -> CodegenResult<Self> {
        let captured = function
            .nparms
            .min(convention.argument_registers().len());
        let padding = captured % 2 != 0;
        let below_parameters = captured + usize::from(padding);

        let used_local_words = function
            .locals
            .iter()
            .filter(|local| local.kind == SymbolKind::LocalVar)
            .map(|local| local.seq + 1)
            .max()
            .unwrap_or(0);
        let local_words = used_local_words + used_local_words % 2;

        let slots = function
            .locals
            .iter()
            .map(|local| match local.kind {
                SymbolKind::Parameter if local.seq >= function.nparms => {
                    Err(CodegenError::ParameterOutOfRange {
                        name: local.name.clone(),
                        seq: local.seq,
                        nparms: function.nparms,
                    }
                    .into())
                }
                SymbolKind::Parameter if local.seq < captured => {
                    Ok(Memory::frame(-word_offset(local.seq + 1)))
                }
                SymbolKind::Parameter => Ok(Memory::frame(
                    convention.incoming_stack_offset(local.seq - captured),
                )),
                SymbolKind::LocalVar => {
                    Ok(Memory::frame(-word_offset(below_parameters + local.seq + 1)))
                }
                SymbolKind::GlobalVar | SymbolKind::Function => {
                    Err(CodegenError::InconsistentSymbol {
                        name: local.name.clone(),
                        found: local.kind,
                        expected: "parameter or local variable",
                    }
                    .into())
                }
            })
            .collect::<CodegenResult<_>>()?;

        Ok(Self {
            captured,
            padding,
            local_words,
            slots,
        })
    }

    /// Storage of the `index`th entry of the function's locals
    pub fn slot(&self, index: usize) -> Option<Memory<'code>> {
        self.slots.get(index).copied()
    }
}

const fn word_offset(words: usize) -> i64 {
    (words * WORD) as i64
}

/// Keeps count of the words pushed on top of a 16 byte aligned frame while
/// evaluating, so calls can be aligned.
#[derive(Debug, Default)]
pub struct StackTracker {
    depth: usize,
}

impl StackTracker {
    pub const fn new() -> Self {
        Self { depth: 0 }
    }
    #[inline]
    pub const fn depth(&self) -> usize {
        self.depth
    }
    pub fn pushed(&mut self, words: usize) {
        self.depth += words;
    }
    pub fn popped(&mut self, words: usize) {
        assert!(
            words <= self.depth,
            "popped {words} words from a stack holding {}",
            self.depth
        );
        self.depth -= words;
    }
    /// Whether one padding word is needed so that after pushing `extra` more
    /// words the stack pointer is 16 byte aligned again.
    pub const fn needs_padding(&self, extra: usize) -> bool {
        (self.depth + extra) % 2 != 0
    }
}

/// Rounds a byte amount up to the stack alignment.
pub const fn align_to_stack(amount: usize) -> usize {
    let rem = amount % 16;
    if rem == 0 {
        amount
    } else {
        16 * (amount / 16 + 1)
    }
}
