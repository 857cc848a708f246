use super::assembly::{Branch, Condition, Data, Instruction, Label, Memory, Register, RegisterID};
use super::expr::{arithmetic, condition_of, Target};
use super::output::AssemblyOutput;
use super::sections::{INTEGER_FORMAT, INTEGER_INPUT, STRING_FORMAT};
use super::{FunctionContext, Generator};
use crate::ast::{ArithmeticOp, BinaryOp, Node};
use crate::error::{CodegenError, CodegenResult};
use crate::symbols::SymbolRef;

impl<'code> Generator<'code> {
    pub(super) fn generate_statement(
        &mut self,
        ctx: &mut FunctionContext<'code>,
        node: &'code Node,
    ) -> CodegenResult<AssemblyOutput<'code>> {
        match node {
            Node::Block { statements } => statements
                .iter()
                .enumerate()
                .map(|(i, statement)| {
                    self.generate_statement(ctx, statement).map_err(|e| {
                        e.add_context(format!("generating statement {} of a block", i + 1))
                    })
                })
                .collect::<CodegenResult<_>>(),
            Node::Assign {
                target,
                operator,
                value,
            } => self.generate_assignment(ctx, *target, *operator, value),
            Node::If {
                condition,
                then,
                otherwise,
            } => self.generate_if(ctx, condition, then, otherwise.as_deref()),
            Node::While { condition, body } => self.generate_while(ctx, condition, body),
            Node::Continue => match ctx.loops.last() {
                Some(head) => Ok(AssemblyOutput::from(Branch::Unconditional { label: *head })),
                None => Err(CodegenError::UnwantedContinue.into()),
            },
            Node::Print { items } => self.generate_print(ctx, items),
            Node::Read { target } => {
                let storage = self.storage(ctx, *target)?;
                Ok(AssemblyOutput::from(Instruction::Lea {
                    address: storage,
                    target: Register::quad(RegisterID::Rsi),
                })
                .chain_one(Instruction::Lea {
                    address: Memory::label(INTEGER_INPUT),
                    target: Register::quad(RegisterID::Rdi),
                })
                .chain_one(Instruction::Mov {
                    source: Data::Immediate(0),
                    target: RegisterID::Rax.into(),
                })
                .chain(aligned_call(ctx, Label::External("scanf"))))
            }
            Node::Return { value } => Ok(self
                .generate_expr(ctx, value, Target::Accumulator)?
                .chain_one(Branch::Unconditional {
                    label: ctx.epilogue,
                })),
            // expression statement, the value is dropped
            expression => self.generate_expr(ctx, expression, Target::Accumulator),
        }
        .map_err(|e| e.with_backup_node(node))
    }

    fn generate_assignment(
        &mut self,
        ctx: &mut FunctionContext<'code>,
        target: SymbolRef,
        operator: Option<ArithmeticOp>,
        value: &'code Node,
    ) -> CodegenResult<AssemblyOutput<'code>> {
        let mut output = self.generate_expr(ctx, value, Target::Accumulator)?;
        let storage = Data::Memory(self.storage(ctx, target)?);
        if let Some(op) = operator {
            output
                .push_back(Instruction::Mov {
                    source: RegisterID::Rax.into(),
                    target: RegisterID::R10.into(),
                })
                .push_back(Instruction::Mov {
                    source: storage,
                    target: RegisterID::Rax.into(),
                })
                .extend(arithmetic(op));
        }
        Ok(output.chain_one(Instruction::Mov {
            source: RegisterID::Rax.into(),
            target: storage,
        }))
    }

    /// Code that falls through when `condition` holds and jumps to `otherwise`
    /// when it doesn't.
    fn generate_branch(
        &mut self,
        ctx: &mut FunctionContext<'code>,
        condition: &'code Node,
        otherwise: Label<'code>,
    ) -> CodegenResult<AssemblyOutput<'code>> {
        match condition {
            Node::Binary {
                operator: BinaryOp::Relation(relation),
                lhs,
                rhs,
            } => Ok(self
                .generate_operands(ctx, lhs, rhs)?
                .chain_one(Instruction::Cmp {
                    source: RegisterID::R10.into(),
                    target: RegisterID::Rax.into(),
                })
                .chain_one(Branch::Conditional {
                    condition: condition_of(*relation).opposite(),
                    label: otherwise,
                })),
            _ => Ok(self
                .generate_expr(ctx, condition, Target::Accumulator)?
                .chain_one(Instruction::Cmp {
                    source: Data::Immediate(0),
                    target: RegisterID::Rax.into(),
                })
                .chain_one(Branch::Conditional {
                    condition: Condition::Equals,
                    label: otherwise,
                })),
        }
    }

    fn generate_if(
        &mut self,
        ctx: &mut FunctionContext<'code>,
        condition: &'code Node,
        then: &'code Node,
        otherwise: Option<&'code Node>,
    ) -> CodegenResult<AssemblyOutput<'code>> {
        let end = self.labels.new_label();
        match otherwise {
            None => Ok(self
                .generate_branch(ctx, condition, end)?
                .chain(self.generate_statement(ctx, then)?)
                .chain_one(end)),
            Some(otherwise) => {
                let else_label = self.labels.new_label();
                Ok(self
                    .generate_branch(ctx, condition, else_label)?
                    .chain(self.generate_statement(ctx, then)?)
                    .chain_one(Branch::Unconditional { label: end })
                    .chain_one(else_label)
                    .chain(self.generate_statement(ctx, otherwise)?)
                    .chain_one(end))
            }
        }
    }

    fn generate_while(
        &mut self,
        ctx: &mut FunctionContext<'code>,
        condition: &'code Node,
        body: &'code Node,
    ) -> CodegenResult<AssemblyOutput<'code>> {
        let head = self.labels.new_label();
        let exit = self.labels.new_label();
        let check = self.generate_branch(ctx, condition, exit)?;

        ctx.loops.push(head);
        let body = self.generate_statement(ctx, body);
        ctx.loops.pop();

        Ok(AssemblyOutput::from(head)
            .chain(check)
            .chain(body?)
            .chain_one(Branch::Unconditional { label: head })
            .chain_one(exit))
    }

    /// Every item goes through `printf`, followed by one newline.
    fn generate_print(
        &mut self,
        ctx: &mut FunctionContext<'code>,
        items: &'code [Node],
    ) -> CodegenResult<AssemblyOutput<'code>> {
        let mut output = AssemblyOutput::new();
        for item in items {
            let format = match item {
                Node::Text { .. } => STRING_FORMAT,
                _ => INTEGER_FORMAT,
            };
            output
                .extend(self.generate_expr(ctx, item, Target::Accumulator)?)
                .push_back(Instruction::Mov {
                    source: RegisterID::Rax.into(),
                    target: RegisterID::Rsi.into(),
                })
                .push_back(Instruction::Lea {
                    address: Memory::label(format),
                    target: Register::quad(RegisterID::Rdi),
                })
                // variadic: no vector registers used
                .push_back(Instruction::Mov {
                    source: Data::Immediate(0),
                    target: RegisterID::Rax.into(),
                })
                .extend(aligned_call(ctx, Label::External("printf")));
        }
        output
            .push_back(Instruction::Mov {
                source: Data::Immediate(i64::from(b'\n')),
                target: RegisterID::Rdi.into(),
            })
            .extend(aligned_call(ctx, Label::External("putchar")));
        Ok(output)
    }
}

/// Calls a function that takes no stack arguments, padding the stack if the
/// values pushed so far left it misaligned.
pub(super) fn aligned_call<'code>(
    ctx: &FunctionContext<'code>,
    label: Label<'code>,
) -> AssemblyOutput<'code> {
    let call = AssemblyOutput::from(Branch::Call { label });
    if ctx.stack.needs_padding(0) {
        call.cons(Instruction::Sub {
            source: Data::Immediate(8),
            target: RegisterID::Rsp.into(),
        })
        .chain_one(Instruction::Add {
            source: Data::Immediate(8),
            target: RegisterID::Rsp.into(),
        })
    } else {
        call
    }
}
