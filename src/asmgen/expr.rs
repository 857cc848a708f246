use super::abi::ArgumentSlot;
use super::assembly::{Branch, Condition, Data, Instruction, Label, Memory, Register, RegisterID};
use super::output::AssemblyOutput;
use super::stack::WORD;
use super::{FunctionContext, Generator};
use crate::ast::{ArithmeticOp, BinaryOp, BitOp, LogicOp, Node, Relation, UnaryOp};
use crate::error::{CodegenError, CodegenResult, Error};
use crate::symbols::SymbolRef;

/// Where the value of an expression ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// `%rax`
    Accumulator,
    /// pushed on top of the stack
    Stack,
}

const ACCUMULATOR: RegisterID = RegisterID::Rax;
/// holds the right hand side of binary operators
const SCRATCH: RegisterID = RegisterID::R10;

impl<'code> Generator<'code> {
    pub(super) fn generate_expr(
        &mut self,
        ctx: &mut FunctionContext<'code>,
        node: &'code Node,
        target: Target,
    ) -> CodegenResult<AssemblyOutput<'code>> {
        let output = self
            .generate_value(ctx, node)
            .map_err(|e| e.with_backup_node(node))?;
        Ok(match target {
            Target::Accumulator => output,
            Target::Stack => {
                ctx.stack.pushed(1);
                output.chain_one(Instruction::Push(ACCUMULATOR.into()))
            }
        })
    }

    /// Value of `node` in `%rax`
    fn generate_value(
        &mut self,
        ctx: &mut FunctionContext<'code>,
        node: &'code Node,
    ) -> CodegenResult<AssemblyOutput<'code>> {
        match node {
            Node::Number { value } => Ok(load_immediate(*value)),
            Node::Text { value } => {
                let label = self.strings.push(value);
                Ok(AssemblyOutput::from(Instruction::Lea {
                    address: Memory::label(Label::Str(label)),
                    target: Register::quad(ACCUMULATOR),
                }))
            }
            Node::Identifier { symbol } => {
                let storage = self.storage(ctx, *symbol)?;
                Ok(AssemblyOutput::from(Instruction::Mov {
                    source: storage.into(),
                    target: ACCUMULATOR.into(),
                }))
            }
            Node::Binary {
                operator: BinaryOp::Logic(op),
                lhs,
                rhs,
            } => self.generate_logic(ctx, *op, lhs, rhs),
            Node::Binary { operator, lhs, rhs } => Ok(self
                .generate_operands(ctx, lhs, rhs)?
                .chain(binary_operation(*operator))),
            Node::Unary { operator, operand } => Ok(self
                .generate_expr(ctx, operand, Target::Accumulator)?
                .chain(unary_operation(*operator))),
            Node::Call { function, args } => self.generate_call(ctx, *function, args),
            statement => Err(Error::new(CodegenError::NotAnExpression {
                kind: statement.kind_name(),
            })
            .with_node(statement)),
        }
    }

    /// Evaluates `lhs` into `%rax` and `rhs` into `%r10`, in that order.
    pub(super) fn generate_operands(
        &mut self,
        ctx: &mut FunctionContext<'code>,
        lhs: &'code Node,
        rhs: &'code Node,
    ) -> CodegenResult<AssemblyOutput<'code>> {
        let lhs = self.generate_expr(ctx, lhs, Target::Stack)?;
        let rhs = self.generate_expr(ctx, rhs, Target::Accumulator)?;
        ctx.stack.popped(1);
        Ok(lhs
            .chain(rhs)
            .chain_one(Instruction::Mov {
                source: ACCUMULATOR.into(),
                target: SCRATCH.into(),
            })
            .chain_one(Instruction::Pop(Register::quad(ACCUMULATOR))))
    }

    /// `and` stops at the first zero operand, `or` at the first non-zero one.
    fn generate_logic(
        &mut self,
        ctx: &mut FunctionContext<'code>,
        op: LogicOp,
        lhs: &'code Node,
        rhs: &'code Node,
    ) -> CodegenResult<AssemblyOutput<'code>> {
        let (stop_when, stop_value) = match op {
            LogicOp::And => (Condition::Equals, 0),
            LogicOp::Or => (Condition::NotEquals, 1),
        };
        let decided = self.labels.new_label();
        let end = self.labels.new_label();

        let mut output = AssemblyOutput::new();
        for operand in [lhs, rhs] {
            output
                .extend(self.generate_expr(ctx, operand, Target::Accumulator)?)
                .push_back(Instruction::Cmp {
                    source: Data::Immediate(0),
                    target: ACCUMULATOR.into(),
                })
                .push_back(Branch::Conditional {
                    condition: stop_when,
                    label: decided,
                });
        }
        output
            .push_back(Instruction::Mov {
                source: Data::Immediate(1 - stop_value),
                target: ACCUMULATOR.into(),
            })
            .push_back(Branch::Unconditional { label: end })
            .push_back(decided)
            .push_back(Instruction::Mov {
                source: Data::Immediate(stop_value),
                target: ACCUMULATOR.into(),
            })
            .push_back(end);
        Ok(output)
    }

    /// Arguments are evaluated left to right and pushed. Once all of them are
    /// known, the stack-passed ones get copied below in reverse order and the
    /// first six are loaded into their registers, so nested calls can't clobber
    /// anything.
    fn generate_call(
        &mut self,
        ctx: &mut FunctionContext<'code>,
        function: SymbolRef,
        args: &'code [Node],
    ) -> CodegenResult<AssemblyOutput<'code>> {
        let callee = self.callee(ctx, function)?;
        if args.len() != callee.nparms {
            return Err(CodegenError::ArgumentCount {
                name: callee.name().to_string(),
                expected: callee.nparms,
                found: args.len(),
            }
            .into());
        }

        let count = args.len();
        let on_stack = self.convention.stack_argument_count(count);
        let padding = ctx.stack.needs_padding(count + on_stack);
        tracing::trace!(
            target: "asmgen::call",
            callee = callee.name(),
            count,
            on_stack,
            depth = ctx.stack.depth(),
            padding,
            "generating call"
        );

        let mut output = AssemblyOutput::new();
        if padding {
            output.push_back(Instruction::Sub {
                source: Data::Immediate(WORD as i64),
                target: RegisterID::Rsp.into(),
            });
            ctx.stack.pushed(1);
        }

        for (i, arg) in args.iter().enumerate() {
            output.extend(
                self.generate_expr(ctx, arg, Target::Stack)
                    .map_err(|e| {
                        e.add_context(format!(
                            "generating argument {} of call to `{}`",
                            i + 1,
                            callee.name()
                        ))
                    })?,
            );
        }

        // argument `i` sits `count - 1 - i` words above the stack pointer, plus
        // whatever was copied below it so far
        let above =
            |i: usize, copied: usize| Memory::stack(((count - 1 - i + copied) * WORD) as i64);
        let mut copied = 0;
        for i in (0..count).rev() {
            if let ArgumentSlot::Stack(_) = self.convention.argument_slot(i) {
                output.push_back(Instruction::Push(above(i, copied).into()));
                copied += 1;
            }
        }
        ctx.stack.pushed(copied);
        for i in 0..count {
            if let ArgumentSlot::Register(register) = self.convention.argument_slot(i) {
                output.push_back(Instruction::Mov {
                    source: above(i, copied).into(),
                    target: register.into(),
                });
            }
        }

        output.push_back(Branch::Call {
            label: Label::Function(callee.name()),
        });

        let release = count + copied + usize::from(padding);
        if release != 0 {
            output.push_back(Instruction::Add {
                source: Data::Immediate((release * WORD) as i64),
                target: RegisterID::Rsp.into(),
            });
            ctx.stack.popped(release);
        }
        Ok(output)
    }
}

fn load_immediate<'code>(value: i64) -> AssemblyOutput<'code> {
    if i32::try_from(value).is_ok() {
        AssemblyOutput::from(Instruction::Mov {
            source: Data::Immediate(value),
            target: ACCUMULATOR.into(),
        })
    } else {
        AssemblyOutput::from(Instruction::MovAbs {
            value,
            target: Register::quad(ACCUMULATOR),
        })
    }
}

pub(super) const fn condition_of(relation: Relation) -> Condition {
    match relation {
        Relation::Equals => Condition::Equals,
        Relation::NotEquals => Condition::NotEquals,
        Relation::LessThan => Condition::LessThan,
        Relation::LessEqual => Condition::LessEqual,
        Relation::GreaterThan => Condition::GreaterThan,
        Relation::GreaterEqual => Condition::GreaterEqual,
    }
}

/// `%rax = %rax <op> %r10`
pub(super) fn arithmetic<'code>(op: ArithmeticOp) -> AssemblyOutput<'code> {
    let source = SCRATCH.into();
    let target = ACCUMULATOR.into();
    match op {
        ArithmeticOp::Add => Instruction::Add { source, target }.into(),
        ArithmeticOp::Subtract => Instruction::Sub { source, target }.into(),
        ArithmeticOp::Multiply => Instruction::Imul {
            source,
            target: Register::quad(ACCUMULATOR),
        }
        .into(),
        ArithmeticOp::Divide => AssemblyOutput::from(Instruction::Cqto)
            .chain_one(Instruction::Idiv(source)),
        ArithmeticOp::Modulo => AssemblyOutput::from(Instruction::Cqto)
            .chain_one(Instruction::Idiv(source))
            .chain_one(Instruction::Mov {
                source: RegisterID::Rdx.into(),
                target,
            }),
    }
}

fn binary_operation<'code>(operator: BinaryOp) -> AssemblyOutput<'code> {
    let source = SCRATCH.into();
    let target = ACCUMULATOR.into();
    match operator {
        BinaryOp::Arithmetic(op) => arithmetic(op),
        BinaryOp::Bit(BitOp::And) => Instruction::And { source, target }.into(),
        BinaryOp::Bit(BitOp::Or) => Instruction::Or { source, target }.into(),
        BinaryOp::Bit(BitOp::Xor) => Instruction::Xor { source, target }.into(),
        BinaryOp::Bit(direction @ (BitOp::LeftShift | BitOp::RightShift)) => {
            let count = Instruction::Mov {
                source,
                target: RegisterID::Rcx.into(),
            };
            let shift = if direction == BitOp::LeftShift {
                Instruction::Sal(target)
            } else {
                Instruction::Sar(target)
            };
            AssemblyOutput::from(count).chain_one(shift)
        }
        BinaryOp::Relation(relation) => AssemblyOutput::from(Instruction::Cmp { source, target })
            .chain(set_flag(condition_of(relation))),
        // short-circuiting, never reaches here
        BinaryOp::Logic(_) => AssemblyOutput::new(),
    }
}

fn unary_operation<'code>(operator: UnaryOp) -> AssemblyOutput<'code> {
    match operator {
        UnaryOp::Negate => Instruction::Neg(ACCUMULATOR.into()).into(),
        UnaryOp::BitNot => Instruction::Not(ACCUMULATOR.into()).into(),
        UnaryOp::LogicNot => AssemblyOutput::from(Instruction::Cmp {
            source: Data::Immediate(0),
            target: ACCUMULATOR.into(),
        })
        .chain(set_flag(Condition::Equals)),
    }
}

/// `%rax = 1` if the flags meet `condition`, `0` otherwise
fn set_flag<'code>(condition: Condition) -> AssemblyOutput<'code> {
    AssemblyOutput::from(Instruction::Set {
        condition,
        target: Register::byte(ACCUMULATOR),
    })
    .chain_one(Instruction::Movzb {
        source: Register::byte(ACCUMULATOR),
        target: Register::quad(ACCUMULATOR),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asmgen::abi::Convention;
    use crate::symbols::{FunctionSymbol, SymbolTable};
    use pretty_assertions::assert_eq;

    /// Text generated for `value` as the returned expression of a function
    /// without parameters, `callee` being declared before it.
    fn returning(callee: Option<FunctionSymbol>, value: Node) -> CodegenResult<String> {
        let mut symbols = SymbolTable::new();
        if let Some(callee) = callee {
            symbols.declare_function(callee);
        }
        symbols.declare_function(FunctionSymbol::new("caller", []).with_body(Node::ret(value)));
        let mut generator = Generator::new(&symbols, Convention::SystemV);
        let asm = generator.generate_function(symbols.functions.last().unwrap())?;
        let lines: Vec<_> = asm.iter().map(ToString::to_string).collect();
        // between the prologue and the jump to the epilogue
        Ok(lines[4..lines.len() - 5]
            .iter()
            .map(|l| format!("{l}\n"))
            .collect())
    }

    fn function(params: &[&str]) -> Option<FunctionSymbol> {
        Some(FunctionSymbol::new("g", params.iter().copied()))
    }

    #[test]
    fn left_operand_goes_first() {
        assert_eq!(
            returning(
                None,
                Node::binary(ArithmeticOp::Modulo, Node::number(7), Node::number(3))
            )
            .unwrap(),
            "\tmovq    $7, %rax
\tpushq   %rax
\tmovq    $3, %rax
\tmovq    %rax, %r10
\tpopq    %rax
\tcqto
\tidivq   %r10
\tmovq    %rdx, %rax
"
        );
    }

    #[test]
    fn relations_normalize_to_booleans() {
        let asm = returning(
            None,
            Node::binary(Relation::NotEquals, Node::number(1), Node::number(2)),
        )
        .unwrap();
        assert!(asm.ends_with("\tcmpq    %r10, %rax\n\tsetne   %al\n\tmovzbq  %al, %rax\n"));
    }

    #[test]
    fn shifts_count_in_cl() {
        let asm = returning(
            None,
            Node::binary(BitOp::RightShift, Node::number(-16), Node::number(2)),
        )
        .unwrap();
        assert!(asm.ends_with("\tmovq    %r10, %rcx\n\tsarq    %cl, %rax\n"));
    }

    #[test]
    fn logic_short_circuits() {
        assert_eq!(
            returning(
                None,
                Node::binary(LogicOp::Or, Node::number(0), Node::number(5))
            )
            .unwrap(),
            "\tmovq    $0, %rax
\tcmpq    $0, %rax
\tjne     .L1
\tmovq    $5, %rax
\tcmpq    $0, %rax
\tjne     .L1
\tmovq    $0, %rax
\tjmp     .L2
.L1:
\tmovq    $1, %rax
.L2:
"
        );
    }

    #[test]
    fn large_numbers_need_movabs() {
        assert_eq!(
            returning(None, Node::number(i64::MIN)).unwrap(),
            "\tmovabsq $-9223372036854775808, %rax\n"
        );
        assert_eq!(
            returning(None, Node::number(i64::from(i32::MIN))).unwrap(),
            "\tmovq    $-2147483648, %rax\n"
        );
    }

    #[test]
    fn every_literal_gets_its_own_label() {
        let asm = returning(
            None,
            Node::binary(ArithmeticOp::Add, Node::text("a"), Node::text("a")),
        )
        .unwrap();
        assert!(asm.starts_with("\tleaq    STR0(%rip), %rax\n"));
        assert!(asm.contains("\tleaq    STR1(%rip), %rax\n"));
    }

    #[test]
    fn register_arguments_are_loaded_after_evaluation() {
        assert_eq!(
            returning(
                function(&["a", "b"]),
                Node::call(SymbolRef::Function(0), [Node::number(1), Node::number(2)])
            )
            .unwrap(),
            "\tmovq    $1, %rax
\tpushq   %rax
\tmovq    $2, %rax
\tpushq   %rax
\tmovq    8(%rsp), %rdi
\tmovq    (%rsp), %rsi
\tcall    _g
\taddq    $16, %rsp
"
        );
    }

    #[test]
    fn odd_pushes_get_padded() {
        assert_eq!(
            returning(
                function(&["a"]),
                Node::call(SymbolRef::Function(0), [Node::number(1)])
            )
            .unwrap(),
            "\tsubq    $8, %rsp
\tmovq    $1, %rax
\tpushq   %rax
\tmovq    (%rsp), %rdi
\tcall    _g
\taddq    $16, %rsp
"
        );
        // the pushed left operand already misaligns the stack
        let asm = returning(
            function(&["a"]),
            Node::binary(
                ArithmeticOp::Add,
                Node::number(1),
                Node::call(SymbolRef::Function(0), [Node::number(2)]),
            ),
        )
        .unwrap();
        assert!(!asm.contains("subq"));
        assert!(asm.contains("\tcall    _g\n\taddq    $8, %rsp\n"));
    }

    #[test]
    fn seventh_argument_goes_on_the_stack() {
        let params = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let args = (1..=8).map(Node::number);
        let asm = returning(function(&params), Node::call(SymbolRef::Function(0), args)).unwrap();
        // the two stack arguments are copied right to left, the eighth first
        assert!(asm.contains(
            "\tmovq    $8, %rax\n\tpushq   %rax\n\tpushq   (%rsp)\n\tpushq   16(%rsp)\n"
        ));
        assert!(asm.contains("\tmovq    72(%rsp), %rdi\n"));
        assert!(asm.contains("\tmovq    32(%rsp), %r9\n\tcall    _g\n\taddq    $80, %rsp\n"));
    }

    #[test]
    fn calls_check_their_arity() {
        let err = returning(
            function(&["a", "b"]),
            Node::call(SymbolRef::Function(0), [Node::number(1)]),
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            CodegenError::ArgumentCount {
                name: "g".into(),
                expected: 2,
                found: 1
            }
        );
        assert_eq!(err.node(), Some("call of function #0 with 1 arguments"));
    }

    #[test]
    fn bad_arguments_report_their_position() {
        let err = returning(
            function(&["a", "b"]),
            Node::call(
                SymbolRef::Function(0),
                [Node::number(1), Node::block([])],
            ),
        )
        .unwrap_err();
        assert_eq!(err.node(), Some("block of 0 statements"));
        assert_eq!(
            err.contexts()[0],
            "generating argument 2 of call to `g`"
        );
    }

    #[test]
    fn only_functions_can_be_called() {
        let err = returning(None, Node::call(SymbolRef::Local(0), [])).unwrap_err();
        assert_eq!(err.kind, CodegenError::UnresolvedSymbol(SymbolRef::Local(0)));
    }
}
