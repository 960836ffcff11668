//! Tuple → struct type mapping.

use trunk_ir::dialect::{adt, core};
use trunk_ir::rewrite::ArenaTypeConverter;
use trunk_ir::{IrContext, Symbol, TypeRef};

/// Nominal name shared by every struct produced from a tuple.
///
/// Distinct tuple shapes map to distinct struct types that carry the same
/// name; nothing may look these structs up by name.
pub const STRUCT_NAME: &str = "_tupletoStruct";

/// Field `i` of a converted tuple is named `elemet_<i>`.
pub const FIELD_PREFIX: &str = "elemet_";

pub fn field_name(index: usize) -> Symbol {
    Symbol::from_dynamic(&format!("{FIELD_PREFIX}{index}"))
}

/// `core.tuple(T0, ..., Tn-1)` → `adt.struct` with fields
/// `[(elemet_0, T0), ..., (elemet_n-1, Tn-1)]`. `None` for non-tuples.
///
/// Element types are used as given; the converter has already converted
/// nested tuples by the time this runs.
pub fn tuple_to_struct_type(ctx: &mut IrContext, tuple: TypeRef) -> Option<TypeRef> {
    let elements = core::tuple_elements(ctx, tuple)?.to_vec();
    let fields: Vec<(Symbol, TypeRef)> = elements
        .into_iter()
        .enumerate()
        .map(|(i, ty)| (field_name(i), ty))
        .collect();
    Some(adt::struct_type(ctx, Symbol::new(STRUCT_NAME), &fields))
}

/// Converter that replaces every tuple type, at any depth, by its struct.
pub fn tuple_type_converter() -> ArenaTypeConverter {
    let mut tc = ArenaTypeConverter::new();
    tc.add_conversion(core::is_tuple, tuple_to_struct_type);
    tc
}

#[cfg(test)]
mod tests {
    use super::*;
    use trunk_ir::printer::print_type;

    #[test]
    fn field_per_element_in_order() {
        let mut ctx = IrContext::new();
        let i32_ty = core::i32(&mut ctx);
        let f64_ty = core::f64(&mut ctx);
        let i1 = core::i1(&mut ctx);

        for elements in [vec![], vec![i32_ty], vec![i32_ty, f64_ty, i1, i32_ty]] {
            let tuple = core::tuple(&mut ctx, elements.iter().copied());
            let st = tuple_to_struct_type(&mut ctx, tuple).expect("tuple maps");
            let fields = adt::struct_fields(&ctx, st).expect("struct fields");
            assert_eq!(fields.len(), elements.len());
            for (i, (name, ty)) in fields.into_iter().enumerate() {
                assert_eq!(name, field_name(i));
                assert_eq!(ty, elements[i]);
            }
            assert_eq!(adt::struct_name(&ctx, st), Some(Symbol::new(STRUCT_NAME)));
        }
    }

    #[test]
    fn field_names_use_decimal_indices() {
        assert_eq!(field_name(0), "elemet_0");
        assert_eq!(field_name(12), "elemet_12");
    }

    #[test]
    fn non_tuples_are_not_mapped() {
        let mut ctx = IrContext::new();
        let i32_ty = core::i32(&mut ctx);
        assert_eq!(tuple_to_struct_type(&mut ctx, i32_ty), None);
    }

    #[test]
    fn mapping_is_deterministic() {
        let mut ctx = IrContext::new();
        let i32_ty = core::i32(&mut ctx);
        let a = core::tuple(&mut ctx, [i32_ty, i32_ty]);
        let b = core::tuple(&mut ctx, [i32_ty, i32_ty]);
        assert_eq!(a, b);
        assert_eq!(
            tuple_to_struct_type(&mut ctx, a),
            tuple_to_struct_type(&mut ctx, b)
        );
    }

    #[test]
    fn shapes_share_the_nominal_name() {
        let mut ctx = IrContext::new();
        let i32_ty = core::i32(&mut ctx);
        let f64_ty = core::f64(&mut ctx);
        let a = core::tuple(&mut ctx, [i32_ty, i32_ty]);
        let b = core::tuple(&mut ctx, [i32_ty, f64_ty]);
        let sa = tuple_to_struct_type(&mut ctx, a).expect("tuple maps");
        let sb = tuple_to_struct_type(&mut ctx, b).expect("tuple maps");

        assert_ne!(sa, sb);
        assert_eq!(adt::struct_name(&ctx, sa), adt::struct_name(&ctx, sb));
    }

    #[test]
    fn nested_tuples_convert_bottom_up() {
        let mut ctx = IrContext::new();
        let i32_ty = core::i32(&mut ctx);
        let f64_ty = core::f64(&mut ctx);
        let inner = core::tuple(&mut ctx, [i32_ty, f64_ty]);
        let outer = core::tuple(&mut ctx, [i32_ty, inner]);

        let tc = tuple_type_converter();
        let converted = tc.convert_type(&mut ctx, outer).expect("converts");
        assert!(tc.is_legal_type(&ctx, converted));
        assert_eq!(
            print_type(&ctx, converted),
            "adt.struct() {fields = [[@elemet_0, core.i32], [@elemet_1, adt.struct() {fields = [[@elemet_0, core.i32], [@elemet_1, core.f64]], name = @_tupletoStruct}]], name = @_tupletoStruct}"
        );
    }

    #[test]
    fn empty_tuple_maps_to_empty_struct() {
        let mut ctx = IrContext::new();
        let unit = core::tuple(&mut ctx, []);
        let tc = tuple_type_converter();
        let converted = tc.convert_type(&mut ctx, unit).expect("converts");
        assert_eq!(
            print_type(&ctx, converted),
            "adt.struct() {fields = [], name = @_tupletoStruct}"
        );
    }
}
