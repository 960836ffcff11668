//! `IrContext`: the arena that owns every IR entity.
//!
//! Operations, values, blocks and regions are stored in `PrimaryMap`s.
//! Operand and result lists use `EntityList` backed by shared `ListPool`s.
//! The context keeps a use-chain per value, so replacing a value
//! (`replace_all_uses`) never needs a walk over the module.

use std::collections::BTreeMap;

use cranelift_entity::{EntityList, ListPool, PrimaryMap, SecondaryMap};
use smallvec::SmallVec;

use crate::refs::*;
use crate::symbol::Symbol;
use crate::types::*;

// ============================================================================
// Entity data
// ============================================================================

/// One use of a value: operand `operand_index` of `user`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: OpRef,
    pub operand_index: u32,
}

pub struct OperationData {
    pub location: Location,
    pub dialect: Symbol,
    pub name: Symbol,
    pub operands: EntityList<ValueRef>,
    pub results: EntityList<TypeRef>,
    pub attributes: BTreeMap<Symbol, Attribute>,
    pub regions: SmallVec<[RegionRef; 4]>,
    pub successors: SmallVec<[BlockRef; 4]>,
    pub parent_block: Option<BlockRef>,
}

pub struct ValueData {
    pub def: ValueDef,
    pub ty: TypeRef,
}

#[derive(Clone, Debug)]
pub struct BlockArgData {
    pub ty: TypeRef,
    pub attrs: BTreeMap<Symbol, Attribute>,
}

impl BlockArgData {
    pub fn of_type(ty: TypeRef) -> Self {
        Self {
            ty,
            attrs: BTreeMap::new(),
        }
    }
}

pub struct BlockData {
    pub location: Location,
    pub args: Vec<BlockArgData>,
    pub ops: SmallVec<[OpRef; 4]>,
    pub parent_region: Option<RegionRef>,
}

pub struct RegionData {
    pub location: Location,
    pub blocks: SmallVec<[BlockRef; 4]>,
    pub parent_op: Option<OpRef>,
}

// ============================================================================
// IrContext
// ============================================================================

pub struct IrContext {
    ops: PrimaryMap<OpRef, OperationData>,
    values: PrimaryMap<ValueRef, ValueData>,
    blocks: PrimaryMap<BlockRef, BlockData>,
    regions: PrimaryMap<RegionRef, RegionData>,

    uses: SecondaryMap<ValueRef, SmallVec<[Use; 2]>>,

    pub types: TypeInterner,
    pub paths: PathInterner,

    value_pool: ListPool<ValueRef>,
    type_pool: ListPool<TypeRef>,

    result_values: SecondaryMap<OpRef, EntityList<ValueRef>>,
    block_arg_values: SecondaryMap<BlockRef, EntityList<ValueRef>>,
}

impl IrContext {
    pub fn new() -> Self {
        Self {
            ops: PrimaryMap::new(),
            values: PrimaryMap::new(),
            blocks: PrimaryMap::new(),
            regions: PrimaryMap::new(),
            uses: SecondaryMap::new(),
            types: TypeInterner::new(),
            paths: PathInterner::new(),
            value_pool: ListPool::new(),
            type_pool: ListPool::new(),
            result_values: SecondaryMap::new(),
            block_arg_values: SecondaryMap::new(),
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Allocate an operation together with its result values.
    ///
    /// Operand uses are registered and owned regions are back-linked. The
    /// new op is detached; attach it with `push_op` or `insert_op_before`.
    ///
    /// # Panics
    ///
    /// Panics if `data.parent_block` is set or an owned region already has a
    /// parent operation.
    pub fn create_op(&mut self, data: OperationData) -> OpRef {
        assert!(
            data.parent_block.is_none(),
            "create_op: operation must not have parent_block set; \
             attach it with push_op after creation",
        );

        let operands: SmallVec<[ValueRef; 8]> = data.operands.as_slice(&self.value_pool).into();
        let result_types: SmallVec<[TypeRef; 4]> = data.results.as_slice(&self.type_pool).into();
        let regions = data.regions.clone();

        let op = self.ops.push(data);

        for &r in &regions {
            if let Some(owner) = self.regions[r].parent_op {
                panic!("create_op: region {r} already belongs to operation {owner}");
            }
            self.regions[r].parent_op = Some(op);
        }

        for (idx, &val) in operands.iter().enumerate() {
            self.uses[val].push(Use {
                user: op,
                operand_index: idx as u32,
            });
        }

        let mut results = EntityList::new();
        for (idx, &ty) in result_types.iter().enumerate() {
            let v = self.values.push(ValueData {
                def: ValueDef::OpResult(op, idx as u32),
                ty,
            });
            results.push(v, &mut self.value_pool);
        }
        self.result_values[op] = results;

        op
    }

    pub fn op(&self, op: OpRef) -> &OperationData {
        &self.ops[op]
    }

    /// Mutable access to operation data.
    ///
    /// Editing `operands` or `results` through this reference desyncs the
    /// use-chain and value types; use the dedicated setters instead.
    pub fn op_mut(&mut self, op: OpRef) -> &mut OperationData {
        &mut self.ops[op]
    }

    /// `dialect.name` of an operation.
    pub fn op_full_name(&self, op: OpRef) -> String {
        let data = &self.ops[op];
        format!("{}.{}", data.dialect, data.name)
    }

    pub fn op_operands(&self, op: OpRef) -> &[ValueRef] {
        self.ops[op].operands.as_slice(&self.value_pool)
    }

    pub fn op_result_types(&self, op: OpRef) -> &[TypeRef] {
        self.ops[op].results.as_slice(&self.type_pool)
    }

    pub fn op_result(&self, op: OpRef, index: u32) -> ValueRef {
        self.result_values[op].as_slice(&self.value_pool)[index as usize]
    }

    pub fn op_results(&self, op: OpRef) -> &[ValueRef] {
        self.result_values[op].as_slice(&self.value_pool)
    }

    /// Retype the `index`-th result in place, keeping the result value and
    /// all of its uses.
    pub fn set_op_result_type(&mut self, op: OpRef, index: u32, ty: TypeRef) {
        let slot = &mut self.ops[op].results.as_mut_slice(&mut self.type_pool)[index as usize];
        *slot = ty;
        let value = self.op_result(op, index);
        self.values[value].ty = ty;
    }

    /// Insert or overwrite an attribute, returning the previous value.
    pub fn set_op_attr(
        &mut self,
        op: OpRef,
        key: impl Into<Symbol>,
        value: Attribute,
    ) -> Option<Attribute> {
        self.ops[op].attributes.insert(key.into(), value)
    }

    /// Drop an operation's use-chain entries.
    ///
    /// The op must already be detached from its block, and none of its
    /// results may still be used.
    ///
    /// # Panics
    ///
    /// Panics if the op is still attached or a result still has uses.
    pub fn remove_op(&mut self, op: OpRef) {
        if let Some(block) = self.ops[op].parent_block {
            panic!(
                "remove_op: operation {op} is still attached to {block}; \
                 call remove_op_from_block first"
            );
        }

        for &val in self.result_values[op].as_slice(&self.value_pool) {
            assert!(
                self.uses[val].is_empty(),
                "remove_op: result value {val} still has {} use(s)",
                self.uses[val].len()
            );
        }

        let operands: SmallVec<[ValueRef; 8]> =
            self.ops[op].operands.as_slice(&self.value_pool).into();
        for (idx, &val) in operands.iter().enumerate() {
            self.uses[val].retain(|u| !(u.user == op && u.operand_index == idx as u32));
        }
    }

    // ========================================================================
    // Values
    // ========================================================================

    pub fn value(&self, v: ValueRef) -> &ValueData {
        &self.values[v]
    }

    pub fn value_ty(&self, v: ValueRef) -> TypeRef {
        self.values[v].ty
    }

    pub fn value_def(&self, v: ValueRef) -> ValueDef {
        self.values[v].def
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Allocate a block together with its argument values.
    pub fn create_block(&mut self, data: BlockData) -> BlockRef {
        let arg_types: SmallVec<[TypeRef; 4]> = data.args.iter().map(|a| a.ty).collect();
        let block = self.blocks.push(data);

        let mut args = EntityList::new();
        for (idx, ty) in arg_types.into_iter().enumerate() {
            let v = self.values.push(ValueData {
                def: ValueDef::BlockArg(block, idx as u32),
                ty,
            });
            args.push(v, &mut self.value_pool);
        }
        self.block_arg_values[block] = args;

        block
    }

    pub fn block(&self, b: BlockRef) -> &BlockData {
        &self.blocks[b]
    }

    pub fn block_mut(&mut self, b: BlockRef) -> &mut BlockData {
        &mut self.blocks[b]
    }

    pub fn block_arg(&self, b: BlockRef, index: u32) -> ValueRef {
        self.block_arg_values[b].as_slice(&self.value_pool)[index as usize]
    }

    pub fn block_args(&self, b: BlockRef) -> &[ValueRef] {
        self.block_arg_values[b].as_slice(&self.value_pool)
    }

    /// Retype the `index`-th block argument in place.
    pub fn set_block_arg_type(&mut self, b: BlockRef, index: u32, ty: TypeRef) {
        self.blocks[b].args[index as usize].ty = ty;
        let value = self.block_arg(b, index);
        self.values[value].ty = ty;
    }

    /// Append a detached operation to `block`.
    ///
    /// # Panics
    ///
    /// Panics if the operation is already attached somewhere.
    pub fn push_op(&mut self, block: BlockRef, op: OpRef) {
        if let Some(owner) = self.ops[op].parent_block {
            panic!("push_op: operation {op} already belongs to {owner}");
        }
        self.ops[op].parent_block = Some(block);
        self.blocks[block].ops.push(op);
    }

    /// Insert a detached operation right before `before` in `block`.
    ///
    /// # Panics
    ///
    /// Panics if `op` is attached already or `before` is not in `block`.
    pub fn insert_op_before(&mut self, block: BlockRef, before: OpRef, op: OpRef) {
        if let Some(owner) = self.ops[op].parent_block {
            panic!("insert_op_before: operation {op} already belongs to {owner}");
        }
        let ops = &mut self.blocks[block].ops;
        let Some(pos) = ops.iter().position(|&o| o == before) else {
            panic!("insert_op_before: {before} is not in {block}");
        };
        ops.insert(pos, op);
        self.ops[op].parent_block = Some(block);
    }

    /// Detach an operation from `block` without destroying it.
    pub fn remove_op_from_block(&mut self, block: BlockRef, op: OpRef) {
        self.blocks[block].ops.retain(|o| *o != op);
        if self.ops[op].parent_block == Some(block) {
            self.ops[op].parent_block = None;
        }
    }

    // ========================================================================
    // Regions
    // ========================================================================

    /// Allocate a region and back-link its blocks.
    ///
    /// # Panics
    ///
    /// Panics if a block already belongs to another region.
    pub fn create_region(&mut self, data: RegionData) -> RegionRef {
        let blocks = data.blocks.clone();
        let region = self.regions.push(data);
        for &b in &blocks {
            if let Some(owner) = self.blocks[b].parent_region {
                panic!("create_region: block {b} already belongs to {owner}");
            }
            self.blocks[b].parent_region = Some(region);
        }
        region
    }

    pub fn region(&self, r: RegionRef) -> &RegionData {
        &self.regions[r]
    }

    pub fn region_mut(&mut self, r: RegionRef) -> &mut RegionData {
        &mut self.regions[r]
    }

    // ========================================================================
    // Use-chains
    // ========================================================================

    pub fn uses(&self, v: ValueRef) -> &[Use] {
        &self.uses[v]
    }

    pub fn has_uses(&self, v: ValueRef) -> bool {
        !self.uses[v].is_empty()
    }

    /// Redirect every use of `old` to `new`, updating operands and use-chains.
    pub fn replace_all_uses(&mut self, old: ValueRef, new: ValueRef) {
        if old == new {
            return;
        }
        let old_uses = std::mem::take(&mut self.uses[old]);
        for u in old_uses {
            let slot = &mut self.ops[u.user].operands.as_mut_slice(&mut self.value_pool)
                [u.operand_index as usize];
            debug_assert_eq!(*slot, old);
            *slot = new;
            self.uses[new].push(u);
        }
    }
}

impl Default for IrContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// OperationData construction
// ============================================================================

impl OperationData {
    /// Bare operation data; lists are filled through the context pools.
    pub fn new(location: Location, dialect: Symbol, name: Symbol) -> Self {
        Self {
            location,
            dialect,
            name,
            operands: EntityList::new(),
            results: EntityList::new(),
            attributes: BTreeMap::new(),
            regions: SmallVec::new(),
            successors: SmallVec::new(),
            parent_block: None,
        }
    }
}

/// Fluent builder that packs operands and result types into the context's
/// list pools on `build`.
pub struct OperationDataBuilder {
    location: Location,
    dialect: Symbol,
    name: Symbol,
    operands: SmallVec<[ValueRef; 8]>,
    results: SmallVec<[TypeRef; 4]>,
    attributes: BTreeMap<Symbol, Attribute>,
    regions: SmallVec<[RegionRef; 4]>,
    successors: SmallVec<[BlockRef; 4]>,
}

impl OperationDataBuilder {
    pub fn new(location: Location, dialect: Symbol, name: Symbol) -> Self {
        Self {
            location,
            dialect,
            name,
            operands: SmallVec::new(),
            results: SmallVec::new(),
            attributes: BTreeMap::new(),
            regions: SmallVec::new(),
            successors: SmallVec::new(),
        }
    }

    pub fn operand(mut self, v: ValueRef) -> Self {
        self.operands.push(v);
        self
    }

    pub fn operands(mut self, vs: impl IntoIterator<Item = ValueRef>) -> Self {
        self.operands.extend(vs);
        self
    }

    pub fn result(mut self, ty: TypeRef) -> Self {
        self.results.push(ty);
        self
    }

    pub fn results(mut self, tys: impl IntoIterator<Item = TypeRef>) -> Self {
        self.results.extend(tys);
        self
    }

    pub fn attr(mut self, key: impl Into<Symbol>, val: Attribute) -> Self {
        self.attributes.insert(key.into(), val);
        self
    }

    pub fn region(mut self, r: RegionRef) -> Self {
        self.regions.push(r);
        self
    }

    pub fn successor(mut self, b: BlockRef) -> Self {
        self.successors.push(b);
        self
    }

    pub fn build(self, ctx: &mut IrContext) -> OperationData {
        let mut operands = EntityList::new();
        operands.extend(self.operands, &mut ctx.value_pool);
        let mut results = EntityList::new();
        results.extend(self.results, &mut ctx.type_pool);
        OperationData {
            location: self.location,
            dialect: self.dialect,
            name: self.name,
            operands,
            results,
            attributes: self.attributes,
            regions: self.regions,
            successors: self.successors,
            parent_block: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Span;
    use smallvec::smallvec;

    fn setup() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("context.ir");
        (ctx, Location::new(path, Span::new(0, 0)))
    }

    fn core_type(ctx: &mut IrContext, name: &'static str) -> TypeRef {
        ctx.types
            .intern(TypeDataBuilder::new(Symbol::new("core"), Symbol::new(name)).build())
    }

    fn tuple_type(ctx: &mut IrContext, elems: &[TypeRef]) -> TypeRef {
        ctx.types.intern(
            TypeDataBuilder::new(Symbol::new("core"), Symbol::new("tuple"))
                .params(elems.iter().copied())
                .build(),
        )
    }

    fn constant(ctx: &mut IrContext, loc: Location, ty: TypeRef, value: u64) -> OpRef {
        let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("const"))
            .result(ty)
            .attr("value", Attribute::IntBits(value))
            .build(ctx);
        ctx.create_op(data)
    }

    fn empty_block(ctx: &mut IrContext, loc: Location, args: Vec<BlockArgData>) -> BlockRef {
        ctx.create_block(BlockData {
            location: loc,
            args,
            ops: smallvec![],
            parent_region: None,
        })
    }

    #[test]
    fn tuple_new_registers_operand_uses() {
        let (mut ctx, loc) = setup();
        let i32_ty = core_type(&mut ctx, "i32");
        let pair_ty = tuple_type(&mut ctx, &[i32_ty, i32_ty]);

        let a = constant(&mut ctx, loc, i32_ty, 1);
        let b = constant(&mut ctx, loc, i32_ty, 2);
        let va = ctx.op_result(a, 0);
        let vb = ctx.op_result(b, 0);

        let data = OperationDataBuilder::new(loc, Symbol::new("adt"), Symbol::new("tuple_new"))
            .operands([va, vb])
            .result(pair_ty)
            .build(&mut ctx);
        let tuple = ctx.create_op(data);

        assert_eq!(ctx.op_full_name(tuple), "adt.tuple_new");
        assert_eq!(ctx.op_operands(tuple), &[va, vb]);
        assert_eq!(ctx.op_result_types(tuple), &[pair_ty]);
        assert_eq!(
            ctx.uses(va),
            &[Use {
                user: tuple,
                operand_index: 0
            }]
        );
        assert_eq!(ctx.uses(vb)[0].operand_index, 1);

        let result = ctx.op_result(tuple, 0);
        assert_eq!(ctx.value_def(result), ValueDef::OpResult(tuple, 0));
        assert_eq!(ctx.value_ty(result), pair_ty);
    }

    #[test]
    fn rauw_moves_every_use() {
        let (mut ctx, loc) = setup();
        let i32_ty = core_type(&mut ctx, "i32");
        let old = constant(&mut ctx, loc, i32_ty, 1);
        let new = constant(&mut ctx, loc, i32_ty, 2);
        let v_old = ctx.op_result(old, 0);
        let v_new = ctx.op_result(new, 0);

        let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("add"))
            .operands([v_old, v_old])
            .result(i32_ty)
            .build(&mut ctx);
        let add = ctx.create_op(data);

        ctx.replace_all_uses(v_old, v_new);

        assert!(!ctx.has_uses(v_old));
        assert_eq!(ctx.uses(v_new).len(), 2);
        assert_eq!(ctx.op_operands(add), &[v_new, v_new]);
    }

    #[test]
    fn retyping_keeps_value_identity_and_uses() {
        let (mut ctx, loc) = setup();
        let i32_ty = core_type(&mut ctx, "i32");
        let f64_ty = core_type(&mut ctx, "f64");
        let pair_ty = tuple_type(&mut ctx, &[i32_ty, f64_ty]);

        let block = empty_block(&mut ctx, loc, vec![BlockArgData::of_type(pair_ty)]);
        let arg = ctx.block_arg(block, 0);

        let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("call"))
            .operand(arg)
            .result(pair_ty)
            .build(&mut ctx);
        let call = ctx.create_op(data);

        ctx.set_block_arg_type(block, 0, f64_ty);
        ctx.set_op_result_type(call, 0, i32_ty);

        assert_eq!(ctx.block_arg(block, 0), arg);
        assert_eq!(ctx.value_ty(arg), f64_ty);
        assert_eq!(ctx.block(block).args[0].ty, f64_ty);
        assert_eq!(ctx.op_result_types(call), &[i32_ty]);
        assert_eq!(ctx.value_ty(ctx.op_result(call, 0)), i32_ty);
        assert_eq!(ctx.uses(arg).len(), 1);
    }

    #[test]
    fn block_membership_tracks_parent() {
        let (mut ctx, loc) = setup();
        let i32_ty = core_type(&mut ctx, "i32");
        let block = empty_block(&mut ctx, loc, vec![]);

        let first = constant(&mut ctx, loc, i32_ty, 1);
        let last = constant(&mut ctx, loc, i32_ty, 3);
        let middle = constant(&mut ctx, loc, i32_ty, 2);
        ctx.push_op(block, first);
        ctx.push_op(block, last);
        ctx.insert_op_before(block, last, middle);
        assert_eq!(ctx.block(block).ops.as_slice(), &[first, middle, last]);
        assert_eq!(ctx.op(middle).parent_block, Some(block));

        ctx.remove_op_from_block(block, middle);
        assert_eq!(ctx.block(block).ops.as_slice(), &[first, last]);
        assert_eq!(ctx.op(middle).parent_block, None);

        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });
        assert_eq!(ctx.block(block).parent_region, Some(region));
    }

    #[test]
    fn owning_op_backlinks_region() {
        let (mut ctx, loc) = setup();
        let block = empty_block(&mut ctx, loc, vec![]);
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });
        let data = OperationDataBuilder::new(loc, Symbol::new("core"), Symbol::new("module"))
            .attr("sym_name", Attribute::Symbol(Symbol::new("m")))
            .region(region)
            .build(&mut ctx);
        let module = ctx.create_op(data);
        assert_eq!(ctx.region(region).parent_op, Some(module));
    }

    #[test]
    fn set_op_attr_overwrites() {
        let (mut ctx, loc) = setup();
        let i32_ty = core_type(&mut ctx, "i32");
        let op = constant(&mut ctx, loc, i32_ty, 7);
        let previous = ctx.set_op_attr(op, "value", Attribute::IntBits(8));
        assert_eq!(previous, Some(Attribute::IntBits(7)));
        assert_eq!(
            ctx.op(op).attributes.get(&Symbol::new("value")),
            Some(&Attribute::IntBits(8))
        );
    }

    #[test]
    fn entity_refs_display_with_prefix() {
        use cranelift_entity::EntityRef;
        assert_eq!(OpRef::new(0).to_string(), "op0");
        assert_eq!(ValueRef::new(5).to_string(), "v5");
        assert_eq!(BlockRef::new(2).to_string(), "block2");
        assert_eq!(TypeRef::new(3).to_string(), "ty3");
    }

    #[test]
    #[should_panic(expected = "still has")]
    fn removing_op_with_live_result_panics() {
        let (mut ctx, loc) = setup();
        let i32_ty = core_type(&mut ctx, "i32");
        let producer = constant(&mut ctx, loc, i32_ty, 1);
        let v = ctx.op_result(producer, 0);
        let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("return"))
            .operand(v)
            .build(&mut ctx);
        ctx.create_op(data);
        ctx.remove_op(producer);
    }

    #[test]
    #[should_panic(expected = "already belongs to")]
    fn region_cannot_have_two_owners() {
        let (mut ctx, loc) = setup();
        let block = empty_block(&mut ctx, loc, vec![]);
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });
        for _ in 0..2 {
            let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("func"))
                .region(region)
                .build(&mut ctx);
            ctx.create_op(data);
        }
    }
}
