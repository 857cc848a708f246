//! The process entry point: turns the command line into the arguments of the
//! designated function and its result into the exit status.
use super::abi::ArgumentSlot;
use super::assembly::{
    Branch, Condition, Data, Directive, Instruction, Label, Memory, Register, RegisterID,
};
use super::output::AssemblyOutput;
use super::sections::WRONG_ARGUMENTS;
use super::stack::{align_to_stack, WORD};
use super::Generator;
use crate::symbols::FunctionSymbol;

/// Exit status when the amount of command line arguments is wrong
pub const ABORT_STATUS: i64 = 1;
pub const WRONG_ARGUMENTS_MESSAGE: &str = "Wrong number of arguments";

const ENTRY: Label<'static> = Label::External("main");

/// `argv` is kept at `-8(%rbp)`, parsed argument `i` right below it.
const fn argv_slot<'code>() -> Memory<'code> {
    Memory::frame(-(WORD as i64))
}

const fn parsed_slot<'code>(index: usize) -> Memory<'code> {
    Memory::frame(-(((index + 2) * WORD) as i64))
}

impl<'code> Generator<'code> {
    pub(super) fn generate_entry(&mut self, entry: &'code FunctionSymbol) -> AssemblyOutput<'code> {
        let count = entry.nparms;
        let abort = self.labels.new_label();
        tracing::debug!(
            target: "asmgen::entry",
            "entry point calls `{}` with {count} arguments",
            entry.name()
        );

        let mut output = AssemblyOutput::from(Directive::Global(ENTRY));
        output
            .push_back(ENTRY)
            .push_back(Instruction::Push(RegisterID::Rbp.into()))
            .push_back(Instruction::Mov {
                source: RegisterID::Rsp.into(),
                target: RegisterID::Rbp.into(),
            })
            .push_back(Instruction::Sub {
                source: Data::Immediate(align_to_stack((count + 1) * WORD) as i64),
                target: RegisterID::Rsp.into(),
            })
            .push_back(Instruction::Mov {
                source: RegisterID::Rsi.into(),
                target: argv_slot().into(),
            });

        output
            .comment("validate: argc - 1 must match the parameter count")
            .push_back(Instruction::Movsl {
                source: Register::long(RegisterID::Rdi),
                target: Register::quad(RegisterID::Rdi),
            })
            .push_back(Instruction::Sub {
                source: Data::Immediate(1),
                target: RegisterID::Rdi.into(),
            })
            .push_back(Instruction::Cmp {
                source: Data::Immediate(count as i64),
                target: RegisterID::Rdi.into(),
            })
            .push_back(Branch::Conditional {
                condition: Condition::NotEquals,
                label: abort,
            });

        output.comment("parse: strtol(argv[i], NULL, 10)");
        for i in 0..count {
            output
                .push_back(Instruction::Mov {
                    source: argv_slot().into(),
                    target: RegisterID::Rax.into(),
                })
                .push_back(Instruction::Mov {
                    source: Memory::at(RegisterID::Rax, ((i + 1) * WORD) as i64).into(),
                    target: RegisterID::Rdi.into(),
                })
                .push_back(Instruction::Mov {
                    source: Data::Immediate(0),
                    target: RegisterID::Rsi.into(),
                })
                .push_back(Instruction::Mov {
                    source: Data::Immediate(10),
                    target: RegisterID::Rdx.into(),
                })
                .push_back(Branch::Call {
                    label: Label::External("strtol"),
                })
                .push_back(Instruction::Mov {
                    source: RegisterID::Rax.into(),
                    target: parsed_slot(i).into(),
                });
        }

        output.comment("dispatch");
        let on_stack = self.convention.stack_argument_count(count);
        if on_stack % 2 != 0 {
            output.push_back(Instruction::Sub {
                source: Data::Immediate(WORD as i64),
                target: RegisterID::Rsp.into(),
            });
        }
        for i in (0..count).rev() {
            if let ArgumentSlot::Stack(_) = self.convention.argument_slot(i) {
                output.push_back(Instruction::Push(parsed_slot(i).into()));
            }
        }
        for i in 0..count {
            if let ArgumentSlot::Register(register) = self.convention.argument_slot(i) {
                output.push_back(Instruction::Mov {
                    source: parsed_slot(i).into(),
                    target: register.into(),
                });
            }
        }
        output.push_back(Branch::Call {
            label: Label::Function(entry.name()),
        });

        output
            .comment("finish: the result is the exit status")
            .push_back(Instruction::Mov {
                source: self.convention.return_register().into(),
                target: RegisterID::Rdi.into(),
            })
            .push_back(Branch::Call {
                label: Label::External("exit"),
            });

        output
            .push_back(abort)
            .comment("abort")
            .push_back(Instruction::Lea {
                address: Memory::label(WRONG_ARGUMENTS),
                target: Register::quad(RegisterID::Rdi),
            })
            .push_back(Branch::Call {
                label: Label::External("puts"),
            })
            .push_back(Instruction::Mov {
                source: Data::Immediate(ABORT_STATUS),
                target: RegisterID::Rdi.into(),
            })
            .push_back(Branch::Call {
                label: Label::External("exit"),
            });
        output
    }
}
