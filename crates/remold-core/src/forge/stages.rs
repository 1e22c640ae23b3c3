//! The forge's ordered processing stages
//!
//! Each stage is a pure function over the scaffold: it may consume
//! unprocessed fragments and append instructions. Stage order is fixed;
//! `super::STAGES` is the authoritative sequence.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::error::Result;
use crate::fragment::{ConstructionStrategy, FragmentBody, FragmentKind};
use crate::forge::instruction::{Instruction, MemberResolution};
use crate::forge::scaffold::Scaffold;
use crate::types::{TypeKind, TypePair};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Push the (source, target) frame for the unit being compiled
pub fn initialize(scaffold: &mut Scaffold<'_>) -> Result<()> {
    let pair = scaffold.pair().clone();
    scaffold.push_frame(pair);
    Ok(())
}

/// Fragments belonging to a base pair only propagate when their category is
/// inheritable; construction fragments never do. Ineligible ones are marked
/// processed so downstream stages skip them.
///
/// When the scaffold was built from a definition alone, every candidate still
/// carries the own pair (`Definition::add` enforces that) and this stage
/// consumes nothing; it screens candidates seeded through
/// `Scaffold::append_candidate` before compilation. Fragments pulled in
/// through inheritance links undergo the same screening as
/// `collect_candidates` appends them.
pub fn filter_uninheritable(scaffold: &mut Scaffold<'_>) -> Result<()> {
    let own_pair = scaffold.pair().clone();
    let filtered: Vec<_> = scaffold
        .candidates()
        .iter()
        .filter(|f| f.pair() != &own_pair)
        .filter(|f| f.kind() == FragmentKind::Construction || !f.is_inherited())
        .map(Arc::clone)
        .collect();
    for fragment in filtered {
        trace!(kind = ?fragment.kind(), base = %fragment.pair(), "uninheritable fragment skipped");
        scaffold.mark_processed(&fragment);
    }
    Ok(())
}

/// Follow inheritance links transitively, pulling each base definition's
/// fragments into the candidate list. A missing base silently ends that
/// branch; a visited set guards against inheritance cycles.
pub fn collect_candidates(scaffold: &mut Scaffold<'_>) -> Result<()> {
    let mut visited: HashSet<TypePair> = HashSet::new();
    visited.insert(scaffold.pair().clone());

    loop {
        let link = scaffold.unprocessed().find_map(|f| match f.body() {
            FragmentBody::Inherits { base } => Some((Arc::clone(f), base.clone())),
            _ => None,
        });
        let Some((fragment, base)) = link else {
            break;
        };
        scaffold.mark_processed(&fragment);

        if !visited.insert(base.clone()) {
            trace!(base = %base, "inheritance link already visited");
            continue;
        }
        let Some(base_definition) = scaffold.registry().find(&base) else {
            // Tolerated: an unregistered base ends the chain here. Worth a
            // warning since it can hide a configuration mistake.
            warn!(base = %base, "inherited base definition not registered; inheritance stops");
            continue;
        };

        debug!(base = %base, fragments = base_definition.fragments().len(), "inheriting fragments");
        for inherited in base_definition.fragments() {
            if !inherited.is_inherited() {
                continue;
            }
            let is_construction = inherited.kind() == FragmentKind::Construction;
            scaffold.append_candidate(Arc::clone(inherited));
            if is_construction {
                // Each level specifies its own construction
                scaffold.mark_processed(inherited);
            }
        }
    }
    Ok(())
}

/// The first unprocessed construction fragment in candidate order wins;
/// without one the target is default-activated. All construction fragments
/// are consumed either way - duplicates are discarded, never combined.
pub fn construction(scaffold: &mut Scaffold<'_>) -> Result<()> {
    let mut strategy: Option<ConstructionStrategy> = None;
    let construction_fragments: Vec<_> = scaffold
        .candidates()
        .iter()
        .filter(|f| f.kind() == FragmentKind::Construction)
        .map(Arc::clone)
        .collect();

    for fragment in &construction_fragments {
        if strategy.is_none() && !scaffold.is_processed(fragment) {
            if let FragmentBody::Construction(s) = fragment.body() {
                strategy = Some(s.clone());
            }
        }
        scaffold.mark_processed(fragment);
    }

    let strategy = strategy.unwrap_or(ConstructionStrategy::Activate);
    debug!(strategy = ?strategy, "construction strategy selected");
    scaffold.emit(Instruction::Construct(strategy));
    Ok(())
}

/// Compile the optional null-source branch. At run time it replaces member
/// mapping entirely when the source is null.
pub fn null_source(scaffold: &mut Scaffold<'_>) -> Result<()> {
    let mut guard = None;
    let null_fragments: Vec<_> = scaffold
        .candidates()
        .iter()
        .filter(|f| f.kind() == FragmentKind::NullSource)
        .map(Arc::clone)
        .collect();

    for fragment in &null_fragments {
        if guard.is_none() && !scaffold.is_processed(fragment) {
            if let FragmentBody::NullSource(s) = fragment.body() {
                guard = Some(s.clone());
            }
        }
        scaffold.mark_processed(fragment);
    }

    if let Some(strategy) = guard {
        scaffold.emit(Instruction::NullGuard(strategy));
    }
    Ok(())
}

/// Run the active auto-match strategy over every writable target member and
/// emit an assignment instruction per match. Members whose value type is
/// primitive or sealed get a static resolution; everything else resolves
/// against the value's runtime type with the declared pair as fallback.
pub fn member_matching(scaffold: &mut Scaffold<'_>) -> Result<()> {
    let mut strategy = None;
    let auto_fragments: Vec<_> = scaffold
        .candidates()
        .iter()
        .filter(|f| f.kind() == FragmentKind::AutoMatch)
        .map(Arc::clone)
        .collect();
    for fragment in &auto_fragments {
        if strategy.is_none() && !scaffold.is_processed(fragment) {
            if let FragmentBody::AutoMatch(s) = fragment.body() {
                strategy = Some(s.clone());
            }
        }
        scaffold.mark_processed(fragment);
    }
    // Absent strategy defaults to matching nothing
    let Some(strategy) = strategy else {
        return Ok(());
    };

    let pair = scaffold.pair().clone();
    let source_members = match scaffold.catalog().get(&pair.source) {
        Some(d) if d.kind == TypeKind::Object => d.members.clone(),
        _ => return Ok(()),
    };
    let target_members = match scaffold.catalog().get(&pair.target) {
        Some(d) if d.kind == TypeKind::Object => d.members.clone(),
        _ => return Ok(()),
    };

    for target_member in target_members.iter().filter(|m| m.writable) {
        let Some(source_member) = strategy.try_match(&source_members, target_member) else {
            trace!(member = %target_member.name, "no source member matched; left unset");
            continue;
        };
        let member_pair = TypePair::new(
            source_member.type_name.clone(),
            target_member.type_name.clone(),
        );
        let resolution = if scaffold.catalog().is_statically_resolvable(&source_member.type_name) {
            MemberResolution::Static(member_pair)
        } else {
            MemberResolution::Dynamic {
                declared: member_pair,
            }
        };
        trace!(
            target = %target_member.name,
            source = %source_member.name,
            resolution = ?resolution,
            "member matched"
        );
        scaffold.emit(Instruction::AssignMember {
            target_member: target_member.name.clone(),
            source_member: source_member.name.clone(),
            resolution,
        });
    }
    Ok(())
}

/// Lower trigger fragments into lifecycle calls, in candidate order
pub fn triggers(scaffold: &mut Scaffold<'_>) -> Result<()> {
    let trigger_fragments: Vec<_> = scaffold
        .unprocessed()
        .filter(|f| f.kind() == FragmentKind::Trigger)
        .map(Arc::clone)
        .collect();
    for fragment in trigger_fragments {
        if let FragmentBody::Trigger { cause, action } = fragment.body() {
            scaffold.emit(Instruction::Trigger {
                cause: *cause,
                action: Arc::clone(action),
            });
        }
        scaffold.mark_processed(&fragment);
    }
    Ok(())
}

/// Pop the frame pushed by `initialize`; the instruction list is now final
pub fn finalize(scaffold: &mut Scaffold<'_>) -> Result<()> {
    scaffold.pop_frame();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automatch::AutoMatchStrategy;
    use crate::definition::{Definition, DefinitionRegistry};
    use crate::fragment::Fragment;
    use crate::types::{Member, TypeCatalog, TypeDescriptor};

    fn pair() -> TypePair {
        TypePair::new("Person", "PersonDto")
    }

    fn catalog() -> TypeCatalog {
        let mut catalog = TypeCatalog::with_primitives();
        catalog.register(TypeDescriptor::object(
            "Person",
            vec![Member::new("Name", "String"), Member::new("Age", "i64")],
        ));
        catalog.register(TypeDescriptor::object(
            "PersonDto",
            vec![Member::new("Name", "String"), Member::new("Age", "i64")],
        ));
        catalog
    }

    fn run_all(scaffold: &mut Scaffold<'_>) {
        for stage in crate::forge::STAGES {
            (stage.run)(scaffold).unwrap();
        }
    }

    #[test]
    fn test_defaults_to_activation() {
        let def = Definition::new(pair());
        let registry = DefinitionRegistry::new();
        let catalog = catalog();
        let mut scaffold = Scaffold::new(&def, &registry, &catalog);
        run_all(&mut scaffold);

        assert!(matches!(
            scaffold.instructions()[0],
            Instruction::Construct(ConstructionStrategy::Activate)
        ));
    }

    #[test]
    fn test_first_construction_fragment_wins() {
        let mut def = Definition::new(pair());
        def.add(Fragment::construction(pair(), ConstructionStrategy::DefaultFactory))
            .unwrap();
        def.add(Fragment::construction(pair(), ConstructionStrategy::Activate))
            .unwrap();
        let registry = DefinitionRegistry::new();
        let catalog = catalog();
        let mut scaffold = Scaffold::new(&def, &registry, &catalog);
        run_all(&mut scaffold);

        let constructs: Vec<_> = scaffold
            .instructions()
            .iter()
            .filter(|i| matches!(i, Instruction::Construct(_)))
            .collect();
        assert_eq!(constructs.len(), 1);
        assert!(matches!(
            constructs[0],
            Instruction::Construct(ConstructionStrategy::DefaultFactory)
        ));
    }

    #[test]
    fn test_base_construction_not_inherited() {
        let base_pair = TypePair::new("Base", "BaseDto");
        let mut base = Definition::new(base_pair.clone());
        base.add(Fragment::construction(
            base_pair.clone(),
            ConstructionStrategy::DefaultFactory,
        ))
        .unwrap();

        let mut registry = DefinitionRegistry::new();
        registry.register(base);

        let mut derived = Definition::new(pair());
        derived
            .add(Fragment::inherits(pair(), base_pair))
            .unwrap();

        let catalog = catalog();
        let mut scaffold = Scaffold::new(&derived, &registry, &catalog);
        run_all(&mut scaffold);

        // The base's explicit strategy does not propagate; activation wins
        assert!(matches!(
            scaffold.instructions()[0],
            Instruction::Construct(ConstructionStrategy::Activate)
        ));
    }

    #[test]
    fn test_preseeded_foreign_fragments_filtered() {
        // Candidates seeded beyond the definition's own fragments are
        // screened by the filter stage: foreign construction and explicitly
        // non-inherited fragments are consumed, inheritable ones survive
        let base_pair = TypePair::new("Base", "BaseDto");
        let def = Definition::new(pair());
        let registry = DefinitionRegistry::new();
        let catalog = catalog();
        let mut scaffold = Scaffold::new(&def, &registry, &catalog);

        scaffold.append_candidate(Arc::new(Fragment::construction(
            base_pair.clone(),
            ConstructionStrategy::DefaultFactory,
        )));
        scaffold.append_candidate(Arc::new(
            Fragment::auto_match(base_pair.clone(), AutoMatchStrategy::exact()).not_inherited(),
        ));
        scaffold.append_candidate(Arc::new(Fragment::auto_match(
            base_pair,
            AutoMatchStrategy::exact(),
        )));

        filter_uninheritable(&mut scaffold).unwrap();
        assert_eq!(scaffold.unprocessed().count(), 1);
        assert_eq!(
            scaffold.unprocessed().next().unwrap().kind(),
            FragmentKind::AutoMatch
        );
    }

    #[test]
    fn test_missing_base_tolerated() {
        let mut derived = Definition::new(pair());
        derived
            .add(Fragment::inherits(pair(), TypePair::new("Ghost", "GhostDto")))
            .unwrap();
        let registry = DefinitionRegistry::new();
        let catalog = catalog();
        let mut scaffold = Scaffold::new(&derived, &registry, &catalog);
        run_all(&mut scaffold);

        assert!(matches!(
            scaffold.instructions()[0],
            Instruction::Construct(ConstructionStrategy::Activate)
        ));
    }

    #[test]
    fn test_inheritance_cycle_guarded() {
        let a = TypePair::new("A", "ADto");
        let b = TypePair::new("B", "BDto");

        let mut def_a = Definition::new(a.clone());
        def_a.add(Fragment::inherits(a.clone(), b.clone())).unwrap();
        let mut def_b = Definition::new(b.clone());
        def_b.add(Fragment::inherits(b.clone(), a.clone())).unwrap();

        let mut registry = DefinitionRegistry::new();
        registry.register(def_b);
        let catalog = TypeCatalog::new();
        let mut scaffold = Scaffold::new(&def_a, &registry, &catalog);
        // Must terminate
        run_all(&mut scaffold);
    }

    #[test]
    fn test_inherited_automatch_applies() {
        let base_pair = TypePair::new("Base", "BaseDto");
        let mut base = Definition::new(base_pair.clone());
        base.add(Fragment::auto_match(base_pair.clone(), AutoMatchStrategy::exact()))
            .unwrap();

        let mut registry = DefinitionRegistry::new();
        registry.register(base);

        let mut derived = Definition::new(pair());
        derived.add(Fragment::inherits(pair(), base_pair)).unwrap();

        let catalog = catalog();
        let mut scaffold = Scaffold::new(&derived, &registry, &catalog);
        run_all(&mut scaffold);

        let assigns = scaffold
            .instructions()
            .iter()
            .filter(|i| matches!(i, Instruction::AssignMember { .. }))
            .count();
        assert_eq!(assigns, 2);
    }

    #[test]
    fn test_no_automatch_means_no_assignments() {
        let def = Definition::new(pair());
        let registry = DefinitionRegistry::new();
        let catalog = catalog();
        let mut scaffold = Scaffold::new(&def, &registry, &catalog);
        run_all(&mut scaffold);

        assert!(scaffold
            .instructions()
            .iter()
            .all(|i| !matches!(i, Instruction::AssignMember { .. })));
    }

    #[test]
    fn test_frame_balanced_after_finalize() {
        let def = Definition::new(pair());
        let registry = DefinitionRegistry::new();
        let catalog = catalog();
        let mut scaffold = Scaffold::new(&def, &registry, &catalog);
        run_all(&mut scaffold);
        assert_eq!(scaffold.frame_depth(), 0);
    }
}
