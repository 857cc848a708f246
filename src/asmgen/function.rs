use super::assembly::{Data, Directive, Instruction, Label, RegisterID};
use super::output::AssemblyOutput;
use super::stack::{FrameLayout, StackTracker, WORD};
use super::{FunctionContext, Generator};
use crate::error::{CodegenError, CodegenResult};
use crate::symbols::{FunctionSymbol, SymbolKind};

impl<'code> Generator<'code> {
    pub(super) fn generate_function(
        &mut self,
        function: &'code FunctionSymbol,
    ) -> CodegenResult<AssemblyOutput<'code>> {
        let name = function.name();
        self.generate_function_inner(function)
            .map_err(|e| e.add_context(format!("generating function `{name}`")))
    }

    fn generate_function_inner(
        &mut self,
        function: &'code FunctionSymbol,
    ) -> CodegenResult<AssemblyOutput<'code>> {
        if function.symbol.kind != SymbolKind::Function {
            return Err(CodegenError::InconsistentSymbol {
                name: function.name().to_string(),
                found: function.symbol.kind,
                expected: "function",
            }
            .into());
        }

        let frame = FrameLayout::new(function, self.convention)?;
        tracing::debug!(target: "asmgen::function", "{}: {frame:?}", function.name());

        let label = Label::Function(function.name());
        let mut output = AssemblyOutput::from(Directive::Global(label))
            .chain_one(label)
            .chain_one(Instruction::Push(RegisterID::Rbp.into()))
            .chain_one(Instruction::Mov {
                source: RegisterID::Rsp.into(),
                target: RegisterID::Rbp.into(),
            });

        // parameters get a fixed spot in the frame, the registers are free after this
        for register in &self.convention.argument_registers()[..frame.captured] {
            output.push_back(Instruction::Push((*register).into()));
        }

        // padding and locals are reserved in one go
        let reserved = usize::from(frame.padding) + frame.local_words;
        if reserved != 0 {
            output.push_back(Instruction::Sub {
                source: Data::Immediate((reserved * WORD) as i64),
                target: RegisterID::Rsp.into(),
            });
        }

        let mut ctx = FunctionContext {
            function,
            frame,
            stack: StackTracker::new(),
            epilogue: self.labels.new_label(),
            loops: Vec::new(),
        };

        output.extend(self.generate_statement(&mut ctx, &function.body)?);
        debug_assert_eq!(ctx.stack.depth(), 0, "unbalanced stack after function body");

        // falling off the end returns 0
        output
            .push_back(Instruction::Mov {
                source: Data::Immediate(0),
                target: self.convention.return_register().into(),
            })
            .push_back(ctx.epilogue)
            .push_back(Instruction::Leave)
            .push_back(Instruction::Ret);

        Ok(output)
    }
}
