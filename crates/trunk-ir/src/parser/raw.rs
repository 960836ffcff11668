//! Stage one of the parser: text to unresolved `Raw*` structures.
//!
//! Names stay as borrowed strings here; resolving `%values`, `^blocks` and
//! interning types is left to the builder in [`super`].

use derive_more::Display;
use winnow::ascii;
use winnow::combinator::{alt, delimited, opt, preceded, separated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

/// Parse error for the textual IR format.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("parse error at offset {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl std::error::Error for ParseError {}

// ============================================================================
// Raw structures
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct RawOperation<'a> {
    /// Bytes of input left when the op started; turns into an offset.
    pub remaining_len: usize,
    pub results: Vec<&'a str>,
    pub dialect: &'a str,
    pub op_name: &'a str,
    pub sym_name: Option<String>,
    pub operands: Vec<&'a str>,
    pub successors: Vec<&'a str>,
    pub attributes: Vec<(&'a str, RawAttribute<'a>)>,
    pub result_types: Vec<RawType<'a>>,
    pub regions: Vec<RawRegion<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawRegion<'a> {
    pub blocks: Vec<RawBlock<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawBlock<'a> {
    pub label: &'a str,
    pub args: Vec<(&'a str, RawType<'a>)>,
    pub ops: Vec<RawOperation<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawType<'a> {
    pub dialect: &'a str,
    pub name: &'a str,
    pub params: Vec<RawType<'a>>,
    pub attrs: Vec<(&'a str, RawAttribute<'a>)>,
}

#[derive(Debug, Clone)]
pub(crate) enum RawAttribute<'a> {
    Unit,
    Bool(bool),
    Int(u64),
    Float(f64),
    String(String),
    Symbol(String),
    Type(RawType<'a>),
    List(Vec<RawAttribute<'a>>),
}

// ============================================================================
// Lexical combinators
// ============================================================================

pub(crate) fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
pub(crate) fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn word<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

/// `%name`, returning `name`.
pub(crate) fn value_ref<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded('%', word).parse_next(input)
}

/// `^label`, returning `label`.
pub(crate) fn block_label<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded('^', word).parse_next(input)
}

/// `@name` or `@"quoted name"`.
pub(crate) fn symbol_ref(input: &mut &str) -> ModalResult<String> {
    '@'.parse_next(input)?;
    if input.starts_with('"') {
        string_lit.parse_next(input)
    } else {
        word.map(str::to_owned).parse_next(input)
    }
}

/// `dialect.name`
pub(crate) fn qualified_name<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str)> {
    (ident, '.', ident)
        .map(|(d, _, n)| (d, n))
        .parse_next(input)
}

/// Decimal integer; negatives are stored as two's complement.
pub(crate) fn integer_lit(input: &mut &str) -> ModalResult<u64> {
    let negative = opt('-').parse_next(input)?.is_some();
    let magnitude: u64 = ascii::dec_uint(input)?;
    if !negative {
        return Ok(magnitude);
    }
    if magnitude > i64::MIN.unsigned_abs() {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    Ok((magnitude as i64).wrapping_neg() as u64)
}

/// Float literal with a mandatory decimal point, so `42` stays an integer.
pub(crate) fn float_with_dot(input: &mut &str) -> ModalResult<f64> {
    let text = (
        opt('-'),
        take_while(1.., |c: char| c.is_ascii_digit()),
        '.',
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt((
            one_of(['e', 'E']),
            opt(one_of(['+', '-'])),
            take_while(1.., |c: char| c.is_ascii_digit()),
        )),
    )
        .take()
        .parse_next(input)?;
    text.parse::<f64>()
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}

/// `"..."` with `\\ \" \n \t \r` escapes.
pub(crate) fn string_lit(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut out = String::new();
    loop {
        match any.parse_next(input)? {
            '"' => break,
            '\\' => match any.parse_next(input)? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                c @ ('"' | '\\') => out.push(c),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            },
            c => out.push(c),
        }
    }
    Ok(out)
}

// ============================================================================
// Types and attributes
// ============================================================================

/// `dialect.name`, `dialect.name(params)` or `dialect.name(params) {attrs}`.
///
/// Type attributes are only read after explicit parentheses; otherwise a
/// following `{` is the start of a region.
pub(crate) fn raw_type<'a>(input: &mut &'a str) -> ModalResult<RawType<'a>> {
    let (dialect, name) = qualified_name.parse_next(input)?;
    let params = opt(delimited(
        ('(', ws),
        separated(0.., (ws, raw_type, ws).map(|(_, t, _)| t), ','),
        (ws, ')'),
    ))
    .parse_next(input)?;
    let attrs = match params {
        Some(_) => opt(preceded(ws, raw_attr_dict))
            .parse_next(input)?
            .unwrap_or_default(),
        None => vec![],
    };
    Ok(RawType {
        dialect,
        name,
        params: params.unwrap_or_default(),
        attrs,
    })
}

pub(crate) fn raw_attr_value<'a>(input: &mut &'a str) -> ModalResult<RawAttribute<'a>> {
    alt((
        "true".value(RawAttribute::Bool(true)),
        "false".value(RawAttribute::Bool(false)),
        "unit".value(RawAttribute::Unit),
        string_lit.map(RawAttribute::String),
        symbol_ref.map(RawAttribute::Symbol),
        delimited(
            ('[', ws),
            separated(0.., (ws, raw_attr_value, ws).map(|(_, a, _)| a), ','),
            (ws, ']'),
        )
        .map(RawAttribute::List),
        float_with_dot.map(RawAttribute::Float),
        integer_lit.map(RawAttribute::Int),
        raw_type.map(RawAttribute::Type),
    ))
    .parse_next(input)
}

/// `{key = value, ...}` with at least one entry, so that it never
/// swallows an empty region `{}`.
pub(crate) fn raw_attr_dict<'a>(
    input: &mut &'a str,
) -> ModalResult<Vec<(&'a str, RawAttribute<'a>)>> {
    delimited(
        ('{', ws),
        separated(
            1..,
            (ws, ident, ws, '=', ws, raw_attr_value, ws).map(|(_, k, _, _, _, v, _)| (k, v)),
            ',',
        ),
        (ws, '}'),
    )
    .parse_next(input)
}

// ============================================================================
// Operations, blocks, regions
// ============================================================================

fn result_list<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    let results = separated(1.., (ws, value_ref, ws).map(|(_, v, _)| v), ',').parse_next(input)?;
    '='.parse_next(input)?;
    Ok(results)
}

/// Spaces and tabs only. Operands must start on the op's line, or a
/// following `%r = ...` would be read as an operand.
fn inline_ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., [' ', '\t']).void().parse_next(input)
}

fn operand_list<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    separated(1.., value_ref, (ws, ',', ws)).parse_next(input)
}

fn successor_list<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    delimited(
        ('[', ws),
        separated(1.., (ws, block_label, ws).map(|(_, l, _)| l), ','),
        (ws, ']'),
    )
    .parse_next(input)
}

fn type_annotation<'a>(input: &mut &'a str) -> ModalResult<Vec<RawType<'a>>> {
    preceded(
        (ws, ':', ws),
        separated(1.., (ws, raw_type, ws).map(|(_, t, _)| t), ','),
    )
    .parse_next(input)
}

/// ```text
/// [%r, ... =] dialect.op [@sym] [%a, ...] [[^succ, ...]] [{attrs}] [: types] [{region}]*
/// ```
pub(crate) fn raw_operation<'a>(input: &mut &'a str) -> ModalResult<RawOperation<'a>> {
    ws.parse_next(input)?;
    let remaining_len = input.len();

    let results = opt(result_list).parse_next(input)?.unwrap_or_default();
    ws.parse_next(input)?;
    let (dialect, op_name) = qualified_name.parse_next(input)?;
    let sym_name = opt(preceded(ws, symbol_ref)).parse_next(input)?;
    let operands = opt(preceded(inline_ws, operand_list))
        .parse_next(input)?
        .unwrap_or_default();
    let successors = opt(preceded(ws, successor_list))
        .parse_next(input)?
        .unwrap_or_default();
    let attributes = opt(preceded(ws, raw_attr_dict))
        .parse_next(input)?
        .unwrap_or_default();
    let result_types = opt(type_annotation).parse_next(input)?.unwrap_or_default();

    let mut regions = Vec::new();
    loop {
        ws.parse_next(input)?;
        if !input.starts_with('{') {
            break;
        }
        regions.push(raw_region.parse_next(input)?);
    }

    Ok(RawOperation {
        remaining_len,
        results,
        dialect,
        op_name,
        sym_name,
        operands,
        successors,
        attributes,
        result_types,
        regions,
    })
}

/// Ops up to the next block label or the closing brace.
fn raw_ops<'a>(input: &mut &'a str) -> ModalResult<Vec<RawOperation<'a>>> {
    let mut ops = Vec::new();
    loop {
        ws.parse_next(input)?;
        if input.is_empty() || input.starts_with(['^', '}']) {
            return Ok(ops);
        }
        ops.push(raw_operation.parse_next(input)?);
    }
}

/// `^label(%arg: type, ...): ops...`
pub(crate) fn raw_block<'a>(input: &mut &'a str) -> ModalResult<RawBlock<'a>> {
    ws.parse_next(input)?;
    let label = block_label.parse_next(input)?;
    let args = opt(delimited(
        ('(', ws),
        separated(
            0..,
            (ws, value_ref, ws, ':', ws, raw_type, ws).map(|(_, name, _, _, _, ty, _)| (name, ty)),
            ',',
        ),
        (ws, ')'),
    ))
    .parse_next(input)?
    .unwrap_or_default();
    (ws, ':').parse_next(input)?;
    let ops = raw_ops.parse_next(input)?;
    Ok(RawBlock { label, args, ops })
}

/// `{ ^bb0: ... ^bb1: ... }`, or `{ ops... }` as a single unlabelled block.
pub(crate) fn raw_region<'a>(input: &mut &'a str) -> ModalResult<RawRegion<'a>> {
    ('{', ws).parse_next(input)?;

    let mut blocks = Vec::new();
    if input.starts_with('^') {
        loop {
            ws.parse_next(input)?;
            if !input.starts_with('^') {
                break;
            }
            blocks.push(raw_block.parse_next(input)?);
        }
    } else if !input.starts_with('}') {
        let ops = raw_ops.parse_next(input)?;
        blocks.push(RawBlock {
            label: "bb0",
            args: vec![],
            ops,
        });
    }

    (ws, '}').parse_next(input)?;
    Ok(RawRegion { blocks })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<'a, T>(
        mut parser: impl Parser<&'a str, T, ErrMode<ContextError>>,
        mut input: &'a str,
    ) -> (T, &'a str) {
        let value = parser.parse_next(&mut input).expect("should parse");
        (value, input)
    }

    #[test]
    fn parses_nested_types() {
        let (ty, rest) = parse(raw_type, "core.tuple(core.i32, core.tuple()) tail");
        assert_eq!((ty.dialect, ty.name), ("core", "tuple"));
        assert_eq!(ty.params.len(), 2);
        assert!(ty.params[1].params.is_empty());
        assert_eq!(rest, " tail");
    }

    #[test]
    fn type_attrs_need_parens() {
        let (ty, rest) = parse(raw_type, "adt.struct() {name = @S}");
        assert_eq!(ty.attrs.len(), 1);
        assert_eq!(rest, "");

        let (ty, rest) = parse(raw_type, "core.i32 {name = @S}");
        assert!(ty.attrs.is_empty());
        assert_eq!(rest, " {name = @S}");
    }

    #[test]
    fn parses_attribute_values() {
        assert!(matches!(parse(raw_attr_value, "42").0, RawAttribute::Int(42)));
        assert!(matches!(
            parse(raw_attr_value, "-1").0,
            RawAttribute::Int(u64::MAX)
        ));
        assert!(matches!(parse(raw_attr_value, "2.5").0, RawAttribute::Float(f) if f == 2.5));
        assert!(matches!(parse(raw_attr_value, "unit").0, RawAttribute::Unit));
        assert!(matches!(
            parse(raw_attr_value, "@\"a b\"").0,
            RawAttribute::Symbol(s) if s == "a b"
        ));
        assert!(matches!(
            parse(raw_attr_value, "[[@f, core.i32]]").0,
            RawAttribute::List(items) if items.len() == 1
        ));
    }

    #[test]
    fn attr_dict_rejects_empty_braces() {
        let mut input = "{}";
        assert!(raw_attr_dict.parse_next(&mut input).is_err());
    }

    #[test]
    fn parses_operation_parts_in_order() {
        let (op, rest) = parse(
            raw_operation,
            "%x = adt.tuple_get %t {index = 1} : core.i32\nfunc.return %x",
        );
        assert_eq!(op.results, vec!["x"]);
        assert_eq!((op.dialect, op.op_name), ("adt", "tuple_get"));
        assert_eq!(op.operands, vec!["t"]);
        assert_eq!(op.attributes.len(), 1);
        assert_eq!(op.result_types.len(), 1);
        assert!(op.regions.is_empty());
        assert_eq!(rest, "func.return %x");
    }

    #[test]
    fn region_without_labels_is_one_block() {
        let (region, _) = parse(raw_region, "{\n  arith.const {value = 1} : core.i32\n}");
        assert_eq!(region.blocks.len(), 1);
        assert_eq!(region.blocks[0].label, "bb0");
        assert_eq!(region.blocks[0].ops.len(), 1);

        let (region, _) = parse(raw_region, "{}");
        assert!(region.blocks.is_empty());
    }

    #[test]
    fn region_with_labels_keeps_block_args() {
        let (region, _) = parse(
            raw_region,
            "{\n  ^bb0(%p: core.i32):\n    func.return %p\n  ^bb1:\n    func.return\n}",
        );
        assert_eq!(region.blocks.len(), 2);
        assert_eq!(region.blocks[0].args.len(), 1);
        assert_eq!(region.blocks[1].ops.len(), 1);
    }
}
