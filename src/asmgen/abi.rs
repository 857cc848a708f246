//! Where arguments travel between caller and callee.
use super::assembly::RegisterID;

/// Integer calling conventions the generator can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Convention {
    /// x86-64 System V: six argument registers, the rest on the stack
    #[default]
    SystemV,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentSlot {
    Register(RegisterID),
    /// Index among the stack-passed arguments, 0 being the lowest address
    Stack(usize),
}

const SYSTEM_V_ARGUMENTS: [RegisterID; 6] = [
    RegisterID::Rdi,
    RegisterID::Rsi,
    RegisterID::Rdx,
    RegisterID::Rcx,
    RegisterID::R8,
    RegisterID::R9,
];

impl Convention {
    pub const fn argument_registers(self) -> &'static [RegisterID] {
        match self {
            Self::SystemV => &SYSTEM_V_ARGUMENTS,
        }
    }

    pub const fn return_register(self) -> RegisterID {
        match self {
            Self::SystemV => RegisterID::Rax,
        }
    }

    /// Where the argument at `position` (0 based) is passed.
    pub const fn argument_slot(self, position: usize) -> ArgumentSlot {
        let registers = self.argument_registers();
        if position < registers.len() {
            ArgumentSlot::Register(registers[position])
        } else {
            ArgumentSlot::Stack(position - registers.len())
        }
    }

    /// Amount of arguments that go on the stack for a call with `count` arguments
    pub const fn stack_argument_count(self, count: usize) -> usize {
        count.saturating_sub(self.argument_registers().len())
    }

    /// Offset from the callee's frame pointer of the `index`th stack-passed argument.
    /// The saved frame pointer and the return address sit in between.
    pub const fn incoming_stack_offset(self, index: usize) -> i64 {
        match self {
            Self::SystemV => 16 + 8 * index as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_six_go_in_registers() {
        let abi = Convention::SystemV;
        let slots: Vec<_> = (0..6).map(|i| abi.argument_slot(i)).collect();
        assert_eq!(
            slots,
            [
                ArgumentSlot::Register(RegisterID::Rdi),
                ArgumentSlot::Register(RegisterID::Rsi),
                ArgumentSlot::Register(RegisterID::Rdx),
                ArgumentSlot::Register(RegisterID::Rcx),
                ArgumentSlot::Register(RegisterID::R8),
                ArgumentSlot::Register(RegisterID::R9),
            ]
        );
    }

    #[test]
    fn the_rest_go_on_the_stack() {
        let abi = Convention::SystemV;
        assert_eq!(abi.argument_slot(6), ArgumentSlot::Stack(0));
        assert_eq!(abi.argument_slot(9), ArgumentSlot::Stack(3));
        assert_eq!(abi.stack_argument_count(4), 0);
        assert_eq!(abi.stack_argument_count(8), 2);
        assert_eq!(abi.incoming_stack_offset(0), 16);
        assert_eq!(abi.incoming_stack_offset(2), 32);
        assert_eq!(abi.return_register(), RegisterID::Rax);
    }
}
