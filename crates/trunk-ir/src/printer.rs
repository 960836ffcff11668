//! Textual IR printer.
//!
//! Every operation is printed in the generic form, with `sym_name` lifted
//! into an `@symbol` right after the op name:
//!
//! ```text
//! core.module @m {
//!   func.func @first {type = core.func(core.i32, core.tuple(core.i32, core.f64))} {
//!     ^bb0(%0: core.tuple(core.i32, core.f64)):
//!       %1 = adt.tuple_get %0 {index = 0} : core.i32
//!       func.return %1
//!   }
//! }
//! ```
//!
//! Values are numbered in print order. A region made of a single block
//! without arguments omits the block label. The output is accepted by
//! [`crate::parser::parse_module`].

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;

use crate::context::IrContext;
use crate::refs::*;
use crate::symbol::Symbol;
use crate::types::*;

struct PrintState<'a> {
    ctx: &'a IrContext,
    value_names: HashMap<ValueRef, usize>,
    block_labels: HashMap<BlockRef, usize>,
    next_value: usize,
    next_block: usize,
}

impl<'a> PrintState<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            value_names: HashMap::new(),
            block_labels: HashMap::new(),
            next_value: 0,
            next_block: 0,
        }
    }

    fn define_value(&mut self, f: &mut impl Write, v: ValueRef) -> fmt::Result {
        let n = self.next_value;
        self.next_value += 1;
        self.value_names.insert(v, n);
        write!(f, "%{n}")
    }

    fn write_value(&self, f: &mut impl Write, v: ValueRef) -> fmt::Result {
        match self.value_names.get(&v) {
            Some(n) => write!(f, "%{n}"),
            None => f.write_str("%?"),
        }
    }

    fn label_block(&mut self, b: BlockRef) {
        let n = self.next_block;
        self.next_block += 1;
        self.block_labels.insert(b, n);
    }

    fn write_block_label(&self, f: &mut impl Write, b: BlockRef) -> fmt::Result {
        match self.block_labels.get(&b) {
            Some(n) => write!(f, "^bb{n}"),
            None => f.write_str("^bb?"),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Print a module op and everything nested in it.
pub fn print_module(ctx: &IrContext, module: OpRef) -> String {
    print_op(ctx, module)
}

/// Print a single operation (with its regions).
///
/// Operands defined outside `op` print as `%?`.
pub fn print_op(ctx: &IrContext, op: OpRef) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    print_operation(&mut state, &mut out, op, 0).expect("fmt::Write to String never fails");
    out
}

pub fn print_type(ctx: &IrContext, ty: TypeRef) -> String {
    let mut out = String::new();
    write_type(ctx, &mut out, ty).expect("fmt::Write to String never fails");
    out
}

pub fn print_attribute(ctx: &IrContext, attr: &Attribute) -> String {
    let mut out = String::new();
    write_attribute(ctx, &mut out, attr).expect("fmt::Write to String never fails");
    out
}

// ============================================================================
// Types and attributes
// ============================================================================

fn write_type(ctx: &IrContext, f: &mut impl Write, ty: TypeRef) -> fmt::Result {
    let data = ctx.types.get(ty);
    write!(f, "{}.{}", data.dialect, data.name)?;
    if !data.params.is_empty() {
        f.write_char('(')?;
        for (i, &param) in data.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, param)?;
        }
        f.write_char(')')?;
    } else if !data.attrs.is_empty() || data.is("core", "tuple") {
        // `()` marks that attrs follow; the empty tuple always has it
        f.write_str("()")?;
    }
    if !data.attrs.is_empty() {
        write_attr_dict(ctx, f, data.attrs.iter())?;
    }
    Ok(())
}

fn write_attr_dict<'a>(
    ctx: &IrContext,
    f: &mut impl Write,
    attrs: impl Iterator<Item = (&'a Symbol, &'a Attribute)>,
) -> fmt::Result {
    f.write_str(" {")?;
    for (i, (key, val)) in attrs.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{key} = ")?;
        write_attribute(ctx, f, val)?;
    }
    f.write_char('}')
}

fn write_attribute(ctx: &IrContext, f: &mut impl Write, attr: &Attribute) -> fmt::Result {
    match attr {
        Attribute::Unit => f.write_str("unit"),
        Attribute::Bool(b) => write!(f, "{b}"),
        Attribute::IntBits(v) => write!(f, "{v}"),
        Attribute::FloatBits(bits) => {
            let v = f64::from_bits(*bits);
            let s = format!("{v}");
            f.write_str(&s)?;
            if v.is_finite() && !s.contains(['.', 'e', 'E']) {
                f.write_str(".0")?;
            }
            Ok(())
        }
        Attribute::String(s) => {
            f.write_char('"')?;
            write_escaped(f, s)?;
            f.write_char('"')
        }
        Attribute::Symbol(sym) => write_symbol(f, *sym),
        Attribute::Type(ty) => write_type(ctx, f, *ty),
        Attribute::List(items) => {
            f.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_attribute(ctx, f, item)?;
            }
            f.write_char(']')
        }
    }
}

fn write_escaped(f: &mut impl Write, s: &str) -> fmt::Result {
    for ch in s.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

fn write_symbol(f: &mut impl Write, sym: Symbol) -> fmt::Result {
    sym.with_str(|s| {
        let bare = !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if bare {
            write!(f, "@{s}")
        } else {
            f.write_str("@\"")?;
            write_escaped(f, s)?;
            f.write_char('"')
        }
    })
}

// ============================================================================
// Operations, regions, blocks
// ============================================================================

fn print_operation(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let data = ctx.op(op);
    let indent_str = " ".repeat(indent);
    f.write_str(&indent_str)?;

    let results = ctx.op_results(op);
    if !results.is_empty() {
        for (i, &v) in results.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            state.define_value(f, v)?;
        }
        f.write_str(" = ")?;
    }

    write!(f, "{}.{}", data.dialect, data.name)?;

    let sym_name = data
        .attributes
        .get(&Symbol::new("sym_name"))
        .and_then(Attribute::as_symbol);
    if let Some(sym) = sym_name {
        f.write_char(' ')?;
        write_symbol(f, sym)?;
    }

    let operands = ctx.op_operands(op);
    for (i, &v) in operands.iter().enumerate() {
        f.write_str(if i == 0 { " " } else { ", " })?;
        state.write_value(f, v)?;
    }

    if !data.successors.is_empty() {
        f.write_str(" [")?;
        for (i, &b) in data.successors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            state.write_block_label(f, b)?;
        }
        f.write_char(']')?;
    }

    let mut attrs = data
        .attributes
        .iter()
        .filter(|(k, _)| !(sym_name.is_some() && **k == "sym_name"))
        .peekable();
    if attrs.peek().is_some() {
        write_attr_dict(ctx, f, attrs)?;
    }

    let result_types = ctx.op_result_types(op);
    if !result_types.is_empty() {
        f.write_str(" : ")?;
        for (i, &ty) in result_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, ty)?;
        }
    }

    for &region in &data.regions {
        f.write_str(" {\n")?;
        print_region(state, f, region, indent)?;
        write!(f, "{indent_str}}}")?;
    }

    f.write_char('\n')
}

/// Print the blocks of `region`, owned by an op printed at `indent`.
fn print_region(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    region: RegionRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let blocks = &ctx.region(region).blocks;
    let elide_label = blocks.len() == 1 && ctx.block_args(blocks[0]).is_empty();
    // Elided labels do not consume a number.
    if !elide_label {
        for &block in blocks {
            state.label_block(block);
        }
    }
    let op_indent = if elide_label { indent + 2 } else { indent + 4 };

    for (i, &block) in blocks.iter().enumerate() {
        if i > 0 {
            f.write_char('\n')?;
        }
        if !elide_label {
            write!(f, "{}", " ".repeat(indent + 2))?;
            state.write_block_label(f, block)?;
            let args = ctx.block_args(block);
            if !args.is_empty() {
                f.write_char('(')?;
                for (j, &arg) in args.iter().enumerate() {
                    if j > 0 {
                        f.write_str(", ")?;
                    }
                    state.define_value(f, arg)?;
                    f.write_str(": ")?;
                    write_type(ctx, f, ctx.value_ty(arg))?;
                }
                f.write_char(')')?;
            }
            f.write_str(":\n")?;
        }
        for &op in &ctx.block(block).ops {
            print_operation(state, f, op, op_indent)?;
        }
    }
    Ok(())
}
