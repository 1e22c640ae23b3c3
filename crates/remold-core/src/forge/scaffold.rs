//! Scaffold: the forge's ephemeral working state
//!
//! One scaffold is created per compilation call. It carries the candidate
//! fragment list (the definition's own fragments plus everything pulled in
//! through inheritance links), the processed set that prevents a fragment
//! from being applied twice, and the instruction list being assembled. It is
//! discarded when compilation finishes; nothing of it survives into the
//! compiled unit except the emitted instructions.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::definition::{Definition, DefinitionRegistry};
use crate::fragment::{Fragment, FragmentId};
use crate::forge::instruction::Instruction;
use crate::types::{TypeCatalog, TypePair};
use std::collections::HashSet;
use std::sync::Arc;

pub struct Scaffold<'a> {
    pair: TypePair,
    registry: &'a DefinitionRegistry,
    catalog: &'a TypeCatalog,
    candidates: Vec<Arc<Fragment>>,
    processed: HashSet<FragmentId>,
    instructions: Vec<Instruction>,
    frames: Vec<TypePair>,
}

impl<'a> Scaffold<'a> {
    pub fn new(
        definition: &Definition,
        registry: &'a DefinitionRegistry,
        catalog: &'a TypeCatalog,
    ) -> Self {
        Scaffold {
            pair: definition.pair().clone(),
            registry,
            catalog,
            candidates: definition.fragments().to_vec(),
            processed: HashSet::new(),
            instructions: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn pair(&self) -> &TypePair {
        &self.pair
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        self.registry
    }

    pub fn catalog(&self) -> &TypeCatalog {
        self.catalog
    }

    pub fn candidates(&self) -> &[Arc<Fragment>] {
        &self.candidates
    }

    pub fn append_candidate(&mut self, fragment: Arc<Fragment>) {
        self.candidates.push(fragment);
    }

    pub fn is_processed(&self, fragment: &Fragment) -> bool {
        self.processed.contains(&fragment.id())
    }

    pub fn mark_processed(&mut self, fragment: &Fragment) {
        self.processed.insert(fragment.id());
    }

    /// Candidates not yet consumed by an earlier stage, in candidate order
    /// (own fragments before inherited ones)
    pub fn unprocessed(&self) -> impl Iterator<Item = &Arc<Fragment>> {
        self.candidates
            .iter()
            .filter(|f| !self.processed.contains(&f.id()))
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn push_frame(&mut self, pair: TypePair) {
        self.frames.push(pair);
    }

    pub fn pop_frame(&mut self) -> Option<TypePair> {
        self.frames.pop()
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    #[cfg(test)]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::ConstructionStrategy;

    fn pair() -> TypePair {
        TypePair::new("Person", "PersonDto")
    }

    #[test]
    fn test_processed_tracking() {
        let mut def = Definition::new(pair());
        def.add(Fragment::construction(pair(), ConstructionStrategy::Activate))
            .unwrap();
        let registry = DefinitionRegistry::new();
        let catalog = TypeCatalog::new();
        let mut scaffold = Scaffold::new(&def, &registry, &catalog);

        assert_eq!(scaffold.unprocessed().count(), 1);
        let fragment = Arc::clone(&scaffold.candidates()[0]);
        scaffold.mark_processed(&fragment);
        assert!(scaffold.is_processed(&fragment));
        assert_eq!(scaffold.unprocessed().count(), 0);
    }

    #[test]
    fn test_candidate_order_preserved_across_append() {
        let mut def = Definition::new(pair());
        def.add(Fragment::construction(pair(), ConstructionStrategy::Activate))
            .unwrap();
        let registry = DefinitionRegistry::new();
        let catalog = TypeCatalog::new();
        let mut scaffold = Scaffold::new(&def, &registry, &catalog);

        let base = TypePair::new("Base", "BaseDto");
        scaffold.append_candidate(Arc::new(Fragment::construction(
            base.clone(),
            ConstructionStrategy::Activate,
        )));

        let pairs: Vec<_> = scaffold.candidates().iter().map(|f| f.pair().clone()).collect();
        assert_eq!(pairs, vec![pair(), base]);
    }
}
