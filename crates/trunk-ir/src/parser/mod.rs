//! Textual IR parser.
//!
//! Parsing happens in two stages:
//!
//! 1. [`raw`]: winnow combinators turn text into `Raw*` structures.
//! 2. `IrBuilder`: resolves `%value` and `^block` names, interns types and
//!    allocates everything in an [`IrContext`].
//!
//! The accepted syntax is exactly what [`crate::printer`] emits, plus named
//! values (`%t`, `%sum`) in place of numbered ones.

pub(crate) mod raw;

use std::collections::{HashMap, HashSet};

use smallvec::smallvec;
use winnow::prelude::*;

use crate::context::{BlockArgData, BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::location::Span;
use crate::refs::*;
use crate::rewrite::ArenaModule;
use crate::symbol::Symbol;
use crate::types::*;

pub use raw::ParseError;
use raw::{RawAttribute, RawOperation, RawRegion, RawType};

struct IrBuilder<'a> {
    ctx: &'a mut IrContext,
    path: PathRef,
    source_len: usize,
    value_map: HashMap<String, ValueRef>,
    block_map: HashMap<String, BlockRef>,
}

impl<'a> IrBuilder<'a> {
    fn new(ctx: &'a mut IrContext, source_len: usize) -> Self {
        let path = ctx.paths.intern("<text>");
        Self {
            ctx,
            path,
            source_len,
            value_map: HashMap::new(),
            block_map: HashMap::new(),
        }
    }

    fn error(&self, raw: &RawOperation<'_>, message: String) -> ParseError {
        ParseError {
            message,
            offset: self.source_len - raw.remaining_len,
        }
    }

    fn location(&self, raw: &RawOperation<'_>) -> Location {
        let offset = self.source_len - raw.remaining_len;
        Location::new(self.path, Span::new(offset, offset))
    }

    fn build_type(&mut self, raw: &RawType<'_>) -> TypeRef {
        let params: Vec<TypeRef> = raw.params.iter().map(|p| self.build_type(p)).collect();
        let mut builder = TypeDataBuilder::new(
            Symbol::from_dynamic(raw.dialect),
            Symbol::from_dynamic(raw.name),
        )
        .params(params);
        for (key, value) in &raw.attrs {
            let value = self.build_attribute(value);
            builder = builder.attr(Symbol::from_dynamic(key), value);
        }
        self.ctx.types.intern(builder.build())
    }

    fn build_attribute(&mut self, raw: &RawAttribute<'_>) -> Attribute {
        match raw {
            RawAttribute::Unit => Attribute::Unit,
            RawAttribute::Bool(b) => Attribute::Bool(*b),
            RawAttribute::Int(n) => Attribute::IntBits(*n),
            RawAttribute::Float(f) => Attribute::FloatBits(f.to_bits()),
            RawAttribute::String(s) => Attribute::String(s.clone()),
            RawAttribute::Symbol(s) => Attribute::Symbol(Symbol::from_dynamic(s)),
            RawAttribute::Type(t) => Attribute::Type(self.build_type(t)),
            RawAttribute::List(items) => {
                Attribute::List(items.iter().map(|a| self.build_attribute(a)).collect())
            }
        }
    }

    /// Build a region in its own scope: names defined inside are dropped
    /// afterwards, names from enclosing regions stay visible.
    fn build_region(
        &mut self,
        owner: &RawOperation<'_>,
        raw: &RawRegion<'_>,
    ) -> Result<RegionRef, ParseError> {
        let saved = (self.value_map.clone(), self.block_map.clone());
        let result = self.build_region_in_scope(owner, raw);
        (self.value_map, self.block_map) = saved;
        result
    }

    fn build_region_in_scope(
        &mut self,
        owner: &RawOperation<'_>,
        raw: &RawRegion<'_>,
    ) -> Result<RegionRef, ParseError> {
        let location = self.location(owner);

        // Blocks first, so successors can refer forward.
        let mut labels = HashSet::new();
        let mut blocks = Vec::with_capacity(raw.blocks.len());
        for raw_block in &raw.blocks {
            if !labels.insert(raw_block.label) {
                return Err(self.error(
                    owner,
                    format!("duplicate block label '^{}'", raw_block.label),
                ));
            }
            let args: Vec<BlockArgData> = raw_block
                .args
                .iter()
                .map(|(_, ty)| BlockArgData::of_type(self.build_type(ty)))
                .collect();
            let block = self.ctx.create_block(BlockData {
                location,
                args,
                ops: smallvec![],
                parent_region: None,
            });
            self.block_map.insert(raw_block.label.to_owned(), block);
            for (i, (name, _)) in raw_block.args.iter().enumerate() {
                let value = self.ctx.block_arg(block, i as u32);
                self.define_value(owner, name, value)?;
            }
            blocks.push(block);
        }

        for (raw_block, &block) in raw.blocks.iter().zip(&blocks) {
            for raw_op in &raw_block.ops {
                let op = self.build_operation(raw_op)?;
                self.ctx.push_op(block, op);
            }
        }

        Ok(self.ctx.create_region(RegionData {
            location,
            blocks: blocks.into_iter().collect(),
            parent_op: None,
        }))
    }

    fn define_value(
        &mut self,
        raw: &RawOperation<'_>,
        name: &str,
        value: ValueRef,
    ) -> Result<(), ParseError> {
        if self.value_map.insert(name.to_owned(), value).is_some() {
            return Err(self.error(raw, format!("duplicate SSA name '%{name}'")));
        }
        Ok(())
    }

    fn build_operation(&mut self, raw: &RawOperation<'_>) -> Result<OpRef, ParseError> {
        let operands = raw
            .operands
            .iter()
            .map(|name| {
                self.value_map.get(*name).copied().ok_or_else(|| {
                    self.error(
                        raw,
                        format!(
                            "undefined value '%{name}' in '{}.{}'",
                            raw.dialect, raw.op_name
                        ),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let successors = raw
            .successors
            .iter()
            .map(|label| {
                self.block_map.get(*label).copied().ok_or_else(|| {
                    self.error(
                        raw,
                        format!(
                            "undefined block '^{label}' in '{}.{}'",
                            raw.dialect, raw.op_name
                        ),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if !raw.results.is_empty() && raw.results.len() != raw.result_types.len() {
            return Err(self.error(
                raw,
                format!(
                    "'{}.{}' names {} result(s) but declares {} type(s)",
                    raw.dialect,
                    raw.op_name,
                    raw.results.len(),
                    raw.result_types.len()
                ),
            ));
        }
        let result_types: Vec<TypeRef> =
            raw.result_types.iter().map(|t| self.build_type(t)).collect();

        let mut builder = OperationDataBuilder::new(
            self.location(raw),
            Symbol::from_dynamic(raw.dialect),
            Symbol::from_dynamic(raw.op_name),
        )
        .operands(operands)
        .results(result_types);
        if let Some(sym) = &raw.sym_name {
            builder = builder.attr("sym_name", Attribute::Symbol(Symbol::from_dynamic(sym)));
        }
        for (key, value) in &raw.attributes {
            let value = self.build_attribute(value);
            builder = builder.attr(Symbol::from_dynamic(key), value);
        }
        for b in successors {
            builder = builder.successor(b);
        }
        for r in &raw.regions {
            let region = self.build_region(raw, r)?;
            builder = builder.region(region);
        }

        let data = builder.build(self.ctx);
        let op = self.ctx.create_op(data);
        for (i, name) in raw.results.iter().enumerate() {
            let value = self.ctx.op_result(op, i as u32);
            self.define_value(raw, name, value)?;
        }
        Ok(op)
    }
}

/// Parse a single top-level operation (normally a `core.module`).
///
/// Trailing input other than whitespace is an error.
pub fn parse_module(ctx: &mut IrContext, input: &str) -> Result<OpRef, ParseError> {
    let mut remaining = input;
    let offset_of = |rest: &str| input.len() - rest.len();

    let raw_op = raw::raw_operation
        .parse_next(&mut remaining)
        .map_err(|e| ParseError {
            message: format!("syntax error: {e}"),
            offset: offset_of(remaining),
        })?;
    let _ = raw::ws.parse_next(&mut remaining);
    if !remaining.is_empty() {
        return Err(ParseError {
            message: "trailing input after top-level operation".to_owned(),
            offset: offset_of(remaining),
        });
    }

    IrBuilder::new(ctx, input.len()).build_operation(&raw_op)
}

/// Parse textual IR into an [`ArenaModule`], panicking on failure.
pub fn parse_test_module(ctx: &mut IrContext, input: &str) -> ArenaModule {
    let op = parse_module(ctx, input)
        .unwrap_or_else(|e| panic!("failed to parse test IR: {e}\n\nInput:\n{input}"));
    ArenaModule::new(ctx, op)
        .unwrap_or_else(|| panic!("parsed operation is not a core.module\n\nInput:\n{input}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{adt, core};
    use crate::ops::ArenaDialectOp;
    use crate::printer::print_module;

    fn roundtrip(input: &str) -> String {
        let mut ctx = IrContext::new();
        let op = parse_module(&mut ctx, input).unwrap_or_else(|e| panic!("{e}"));
        let printed = print_module(&ctx, op);

        let mut ctx2 = IrContext::new();
        let op2 = parse_module(&mut ctx2, &printed).unwrap_or_else(|e| panic!("{e}\n{printed}"));
        assert_eq!(printed, print_module(&ctx2, op2), "printing is not stable");
        printed
    }

    #[test]
    fn named_values_are_renumbered() {
        let printed = roundtrip(
            r#"core.module @m {
                func.func @swap {type = core.func(core.tuple(core.f64, core.i32), core.tuple(core.i32, core.f64))} {
                  ^entry(%p: core.tuple(core.i32, core.f64)):
                    %a = adt.tuple_get %p {index = 0} : core.i32
                    %b = adt.tuple_get %p {index = 1} : core.f64
                    %t = adt.tuple_new %b, %a : core.tuple(core.f64, core.i32)
                    func.return %t
                }
              }"#,
        );
        insta::assert_snapshot!(printed, @r"
        core.module @m {
          func.func @swap {type = core.func(core.tuple(core.f64, core.i32), core.tuple(core.i32, core.f64))} {
            ^bb0(%0: core.tuple(core.i32, core.f64)):
              %1 = adt.tuple_get %0 {index = 0} : core.i32
              %2 = adt.tuple_get %0 {index = 1} : core.f64
              %3 = adt.tuple_new %2, %1 : core.tuple(core.f64, core.i32)
              func.return %3
          }
        }
        ");
    }

    #[test]
    fn struct_types_and_symbols_roundtrip() {
        let printed = roundtrip(
            r#"core.module @"my mod" {
                %0 = arith.const {value = -3} : core.i64
                %1 = adt.struct_new %0 : adt.struct() {fields = [[@elemet_0, core.i64]], name = @_tupletoStruct}
                %2 = adt.struct_extract %1 {field = @elemet_0} : core.i64
                %3 = arith.const {value = 1.5} : core.f64
                %4 = adt.tuple_new : core.tuple()
              }"#,
        );
        assert!(printed.starts_with("core.module @\"my mod\" {\n"));
        assert!(printed.contains("{value = 18446744073709551613}"));
        assert!(printed.contains("{value = 1.5}"));
        assert!(printed.contains("%4 = adt.tuple_new : core.tuple()\n"));
    }

    #[test]
    fn parsed_types_are_interned_with_built_ones() {
        let mut ctx = IrContext::new();
        let module = parse_test_module(
            &mut ctx,
            "core.module @m {\n  %0 = adt.tuple_new : core.tuple(core.i32, core.tuple())\n}",
        );
        let i32_ty = core::i32(&mut ctx);
        let unit = core::tuple(&mut ctx, []);
        let expected = core::tuple(&mut ctx, [i32_ty, unit]);

        let op = module.ops(&ctx)[0];
        assert!(adt::TupleNew::matches(&ctx, op));
        assert_eq!(ctx.op_result_types(op), &[expected]);
    }

    #[test]
    fn rejects_undefined_value() {
        let mut ctx = IrContext::new();
        let input = "core.module @m {\n  func.return %nope\n}";
        let err = parse_module(&mut ctx, input).expect_err("undefined operand");
        assert!(err.message.contains("undefined value '%nope'"), "{err}");
        assert_eq!(err.offset, input.find("func.return").unwrap());
    }

    #[test]
    fn values_do_not_escape_their_region() {
        let mut ctx = IrContext::new();
        let input = "core.module @m {\n  test.scope {\n    %x = arith.const {value = 1} : core.i32\n  }\n  func.return %x\n}";
        let err = parse_module(&mut ctx, input).expect_err("out of scope");
        assert!(err.message.contains("'%x'"), "{err}");
    }

    #[test]
    fn rejects_result_count_mismatch() {
        let mut ctx = IrContext::new();
        let err = parse_module(&mut ctx, "core.module @m {\n  %a, %b = arith.const {value = 1} : core.i32\n}")
            .expect_err("two names, one type");
        assert!(err.message.contains("2 result(s) but declares 1 type(s)"), "{err}");
    }

    #[test]
    fn rejects_trailing_input() {
        let mut ctx = IrContext::new();
        let input = "core.module @m {\n}\n}";
        let err = parse_module(&mut ctx, input).expect_err("trailing");
        assert_eq!(err.message, "trailing input after top-level operation");
        assert_eq!(err.offset, input.len() - 1);
    }

    #[test]
    fn zero_operand_op_does_not_swallow_next_result() {
        let printed = roundtrip(
            "core.module @m {\n  test.barrier\n  %0 = arith.const {value = 2} : core.i32\n}",
        );
        assert_eq!(
            printed,
            "core.module @m {\n  test.barrier\n  %0 = arith.const {value = 2} : core.i32\n}\n"
        );
    }
}
