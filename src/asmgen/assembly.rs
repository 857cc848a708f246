use crate::strings::StringLabel;
use crate::write_instruction;
use std::fmt;

// NOTE: everything is AT&T syntax, so operands are written `source, target`.

#[derive(Debug, Clone)]
pub enum Assembly<'code> {
    Directive(Directive<'code>),
    Label(Label<'code>),
    Instruction(Instruction<'code>),
    Comment(String),
}

impl fmt::Display for Assembly<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Directive(direct) => write!(f, "\t.{}", direct),
            Self::Instruction(instr) => write!(f, "\t{}", instr),
            Self::Label(name) => write!(f, "{}:", name),
            Self::Comment(comment) => write!(f, "\t# {}", comment),
        }
    }
}

impl<'code> From<Instruction<'code>> for Assembly<'code> {
    fn from(instr: Instruction<'code>) -> Self {
        Self::Instruction(instr)
    }
}

impl<'code> From<Branch<'code>> for Assembly<'code> {
    fn from(branch: Branch<'code>) -> Self {
        Self::Instruction(Instruction::Branch(branch))
    }
}

impl<'code> From<Directive<'code>> for Assembly<'code> {
    fn from(d: Directive<'code>) -> Self {
        Self::Directive(d)
    }
}

impl<'code> From<Label<'code>> for Assembly<'code> {
    fn from(label: Label<'code>) -> Self {
        Self::Label(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    ReadOnlyData,
    Bss,
    Text,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::ReadOnlyData => ".rodata",
            Self::Bss => ".bss",
            Self::Text => ".text",
        })
    }
}

#[derive(Debug, Clone)]
pub enum Directive<'code> {
    Section(Section),
    Global(Label<'code>),
    Align(usize),
    /// Null terminated string; the text is already quoted and escaped
    Asciz(String),
    /// Reserve zeroed bytes
    Zero(usize),
}

impl fmt::Display for Directive<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Section(section) => write!(f, "section {}", section),
            Self::Global(label) => write!(f, "globl {}", label),
            Self::Align(bytes) => write!(f, "align {}", bytes),
            Self::Asciz(text) => write!(f, "asciz {}", text),
            Self::Zero(bytes) => write!(f, "zero {}", bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label<'code> {
    /// A function of the source program
    Function(&'code str),
    /// A global variable of the source program
    Global(&'code str),
    /// Local jump target
    Numbered(usize),
    /// A string table entry
    Str(StringLabel),
    /// Fixed strings used by the generated runtime support code
    Runtime(&'static str),
    /// Symbols provided by the C library, plus the process entry itself
    External(&'static str),
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // source level names share one namespace, prefixed so that they never clash with
            // `main` or with libc.
            Label::Function(name) | Label::Global(name) => write!(f, "_{name}"),
            Label::Numbered(n) => write!(f, ".L{n}"),
            Label::Str(StringLabel(n)) => write!(f, "STR{n}"),
            Label::Runtime(name) | Label::External(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Instruction<'code> {
    Push(Data<'code>),
    Pop(Register),
    Mov {
        source: Data<'code>,
        target: Data<'code>,
    },
    /// Immediates that don't fit in 32 bits
    MovAbs {
        value: i64,
        target: Register,
    },
    /// Load effective address
    Lea {
        address: Memory<'code>,
        target: Register,
    },
    Add {
        source: Data<'code>,
        target: Data<'code>,
    },
    Sub {
        source: Data<'code>,
        target: Data<'code>,
    },
    /// Signed multiply, the target has to be a register
    Imul {
        source: Data<'code>,
        target: Register,
    },
    /// Sign extend `%rax` into `%rdx:%rax`
    Cqto,
    /// Signed divide of `%rdx:%rax`, quotient in `%rax`, remainder in `%rdx`
    Idiv(Data<'code>),
    Neg(Data<'code>),
    Not(Data<'code>),
    And {
        source: Data<'code>,
        target: Data<'code>,
    },
    Or {
        source: Data<'code>,
        target: Data<'code>,
    },
    Xor {
        source: Data<'code>,
        target: Data<'code>,
    },
    /// Shift left by `%cl`
    Sal(Data<'code>),
    /// Arithmetic shift right by `%cl`
    Sar(Data<'code>),
    /// Sets flags from `target - source`
    Cmp {
        source: Data<'code>,
        target: Data<'code>,
    },
    /// Sets a byte register to 1 or 0 depending on condition
    Set {
        condition: Condition,
        target: Register,
    },
    /// Zero extends a byte register
    Movzb {
        source: Register,
        target: Register,
    },
    /// Sign extends a 32-bit register
    Movsl {
        source: Register,
        target: Register,
    },
    /// Tear down the current frame
    Leave,
    Ret,
    Branch(Branch<'code>),
}

#[derive(Debug, Clone, Copy)]
pub enum Branch<'code> {
    /// normal (unconditional) jump, always executed
    Unconditional { label: Label<'code> },
    /// Conditional jump
    Conditional {
        condition: Condition,
        label: Label<'code>,
    },
    Call { label: Label<'code> },
}

impl fmt::Display for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Push(source) => write_instruction!(f, "pushq", source),
            Self::Pop(target) => write_instruction!(f, "popq", target),
            Self::Mov { source, target } => write_instruction!(f, "movq", source, target),
            Self::MovAbs { value, target } => {
                write_instruction!(f, "movabsq", Data::Immediate(*value), target)
            }
            Self::Lea { address, target } => write_instruction!(f, "leaq", address, target),
            Self::Add { source, target } => write_instruction!(f, "addq", source, target),
            Self::Sub { source, target } => write_instruction!(f, "subq", source, target),
            Self::Imul { source, target } => write_instruction!(f, "imulq", source, target),
            Self::Cqto => write_instruction!(f, "cqto"),
            Self::Idiv(divisor) => write_instruction!(f, "idivq", divisor),
            Self::Neg(target) => write_instruction!(f, "negq", target),
            Self::Not(target) => write_instruction!(f, "notq", target),
            Self::And { source, target } => write_instruction!(f, "andq", source, target),
            Self::Or { source, target } => write_instruction!(f, "orq", source, target),
            Self::Xor { source, target } => write_instruction!(f, "xorq", source, target),
            Self::Sal(target) => {
                write_instruction!(f, "salq", Register::byte(RegisterID::Rcx), target)
            }
            Self::Sar(target) => {
                write_instruction!(f, "sarq", Register::byte(RegisterID::Rcx), target)
            }
            Self::Cmp { source, target } => write_instruction!(f, "cmpq", source, target),
            Self::Set { condition, target } => {
                write_instruction!(f, format!("set{}", condition), target)
            }
            Self::Movzb { source, target } => write_instruction!(f, "movzbq", source, target),
            Self::Movsl { source, target } => write_instruction!(f, "movslq", source, target),
            Self::Leave => write_instruction!(f, "leave"),
            Self::Ret => write_instruction!(f, "ret"),
            Self::Branch(branch) => branch.fmt(f),
        }
    }
}

impl fmt::Display for Branch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Conditional { condition, label } => {
                write_instruction!(f, format!("j{}", condition), label)
            }
            Self::Unconditional { label } => write_instruction!(f, "jmp", label),
            Self::Call { label } => write_instruction!(f, "call", label),
        }
    }
}

#[macro_export]
macro_rules! format_instr_args {
    () => { "" };
    ($arg:expr) => { "{}" };
    ($first:expr, $($rest:expr),+) => {
        concat!("{}, ", $crate::format_instr_args!($($rest),+))
    }
}

#[macro_export]
macro_rules! format_instr {
    ($name:expr) => { format_args!("{}", $name) };
    ($name:expr, $($args:expr),+) => {
        format_args!(concat!("{:7} ", $crate::format_instr_args!($($args),+)), $name, $($args),+)
    };
}

#[macro_export]
macro_rules! write_instruction {
    ($formatter:expr, $name:expr) => {
        $formatter.write_fmt($crate::format_instr!($name))
    };
    ($formatter:expr, $name:expr, $($args:expr),+) => {
        $formatter.write_fmt($crate::format_instr!($name, $($args),+))
    };
}

/// Operand of an instruction
#[derive(Debug, Clone, Copy)]
pub enum Data<'code> {
    Register(Register),
    Immediate(i64),
    Memory(Memory<'code>),
}

impl fmt::Display for Data<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Immediate(value) => write!(f, "${}", value),
            Self::Register(reg) => write!(f, "{}", reg),
            Self::Memory(mem) => write!(f, "{}", mem),
        }
    }
}

impl<'code> From<Register> for Data<'code> {
    fn from(register: Register) -> Self {
        Self::Register(register)
    }
}

impl<'code> From<RegisterID> for Data<'code> {
    fn from(id: RegisterID) -> Self {
        Self::Register(Register::quad(id))
    }
}

impl<'code> From<Memory<'code>> for Data<'code> {
    fn from(mem: Memory<'code>) -> Self {
        Self::Memory(mem)
    }
}

impl<'code> From<i64> for Data<'code> {
    fn from(immediate: i64) -> Self {
        Self::Immediate(immediate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Previous comparison resulted in equal
    Equals,
    /// Previous comparison resulted in not equal
    NotEquals,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Equals => write!(f, "e"),
            Self::NotEquals => write!(f, "ne"),
            Self::LessEqual => write!(f, "le"),
            Self::LessThan => write!(f, "l"),
            Self::GreaterThan => write!(f, "g"),
            Self::GreaterEqual => write!(f, "ge"),
        }
    }
}

impl Condition {
    pub fn opposite(self) -> Self {
        match self {
            Self::Equals => Self::NotEquals,
            Self::NotEquals => Self::Equals,
            Self::GreaterThan => Self::LessEqual,
            Self::GreaterEqual => Self::LessThan,
            Self::LessThan => Self::GreaterEqual,
            Self::LessEqual => Self::GreaterThan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegisterID {
    Rax,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
}

/// how much of the register is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BitSize {
    Bit8,
    Bit32,
    Bit64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub id: RegisterID,
    pub bit_size: BitSize,
}

impl Register {
    pub const fn from_id(id: RegisterID, bit_size: BitSize) -> Self {
        Self { id, bit_size }
    }
    pub const fn quad(id: RegisterID) -> Self {
        Self::from_id(id, BitSize::Bit64)
    }
    pub const fn long(id: RegisterID) -> Self {
        Self::from_id(id, BitSize::Bit32)
    }
    pub const fn byte(id: RegisterID) -> Self {
        Self::from_id(id, BitSize::Bit8)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use RegisterID::*;
        let name = match (self.bit_size, self.id) {
            (BitSize::Bit64, Rax) => "rax",
            (BitSize::Bit64, Rcx) => "rcx",
            (BitSize::Bit64, Rdx) => "rdx",
            (BitSize::Bit64, Rsi) => "rsi",
            (BitSize::Bit64, Rdi) => "rdi",
            (BitSize::Bit64, Rbp) => "rbp",
            (BitSize::Bit64, Rsp) => "rsp",
            (BitSize::Bit64, R8) => "r8",
            (BitSize::Bit64, R9) => "r9",
            (BitSize::Bit64, R10) => "r10",
            (BitSize::Bit32, Rax) => "eax",
            (BitSize::Bit32, Rcx) => "ecx",
            (BitSize::Bit32, Rdx) => "edx",
            (BitSize::Bit32, Rsi) => "esi",
            (BitSize::Bit32, Rdi) => "edi",
            (BitSize::Bit32, Rbp) => "ebp",
            (BitSize::Bit32, Rsp) => "esp",
            (BitSize::Bit32, R8) => "r8d",
            (BitSize::Bit32, R9) => "r9d",
            (BitSize::Bit32, R10) => "r10d",
            (BitSize::Bit8, Rax) => "al",
            (BitSize::Bit8, Rcx) => "cl",
            (BitSize::Bit8, Rdx) => "dl",
            (BitSize::Bit8, Rsi) => "sil",
            (BitSize::Bit8, Rdi) => "dil",
            (BitSize::Bit8, Rbp) => "bpl",
            (BitSize::Bit8, Rsp) => "spl",
            (BitSize::Bit8, R8) => "r8b",
            (BitSize::Bit8, R9) => "r9b",
            (BitSize::Bit8, R10) => "r10b",
        };
        write!(f, "%{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base<'code> {
    Register(RegisterID),
    /// Relative to the instruction pointer, addressing a label
    Rip(Label<'code>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Memory<'code> {
    pub base: Base<'code>,
    pub offset: i64,
}

impl fmt::Display for Memory<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.base {
            Base::Register(id) if self.offset == 0 => write!(f, "({})", Register::quad(id)),
            Base::Register(id) => write!(f, "{}({})", self.offset, Register::quad(id)),
            Base::Rip(label) if self.offset == 0 => write!(f, "{}(%rip)", label),
            Base::Rip(label) => write!(f, "{}{:+}(%rip)", label, self.offset),
        }
    }
}

impl<'code> Memory<'code> {
    pub const fn frame(offset: i64) -> Self {
        Self {
            base: Base::Register(RegisterID::Rbp),
            offset,
        }
    }
    pub const fn stack(offset: i64) -> Self {
        Self {
            base: Base::Register(RegisterID::Rsp),
            offset,
        }
    }
    pub const fn at(register: RegisterID, offset: i64) -> Self {
        Self {
            base: Base::Register(register),
            offset,
        }
    }
    pub const fn label(label: Label<'code>) -> Self {
        Self {
            base: Base::Rip(label),
            offset: 0,
        }
    }
}
