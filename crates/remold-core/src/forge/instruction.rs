//! Portable instruction representation produced by the forge
//!
//! The stages lower a definition's fragment set into this flat instruction
//! list; the executor interprets it at call time. The list is the stable
//! intermediate form between configuration and execution - no code
//! generation is involved.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::fragment::{ConstructionStrategy, NullSourceStrategy, TriggerFn};
use crate::injection::TriggerCause;
use crate::types::TypePair;
use std::fmt;

/// How the executor resolves the nested injection for a matched member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberResolution {
    /// The member's declared types are final (primitive or sealed); resolve
    /// the pair once, statically
    Static(TypePair),
    /// Resolve against the value's `$type` discriminator at run time,
    /// falling back to the declared pair when absent or when the value is
    /// null
    Dynamic { declared: TypePair },
}

impl MemberResolution {
    pub fn declared(&self) -> &TypePair {
        match self {
            MemberResolution::Static(pair) => pair,
            MemberResolution::Dynamic { declared } => declared,
        }
    }
}

/// One step of a compiled injection
#[derive(Clone)]
pub enum Instruction {
    /// Create the target instance
    Construct(ConstructionStrategy),
    /// Runtime branch taken instead of member mapping when the source is null
    NullGuard(NullSourceStrategy),
    /// Convert and assign one matched member
    AssignMember {
        target_member: String,
        source_member: String,
        resolution: MemberResolution,
    },
    /// Run a lifecycle action
    Trigger { cause: TriggerCause, action: TriggerFn },
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Construct(s) => f.debug_tuple("Construct").field(s).finish(),
            Instruction::NullGuard(s) => f.debug_tuple("NullGuard").field(s).finish(),
            Instruction::AssignMember {
                target_member,
                source_member,
                resolution,
            } => f
                .debug_struct("AssignMember")
                .field("target_member", target_member)
                .field("source_member", source_member)
                .field("resolution", resolution)
                .finish(),
            Instruction::Trigger { cause, .. } => {
                f.debug_struct("Trigger").field("cause", cause).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_declared_pair() {
        let pair = TypePair::new("String", "String");
        assert_eq!(MemberResolution::Static(pair.clone()).declared(), &pair);
        assert_eq!(
            MemberResolution::Dynamic {
                declared: pair.clone()
            }
            .declared(),
            &pair
        );
    }

    #[test]
    fn test_instruction_debug_is_compact() {
        let inst = Instruction::Construct(ConstructionStrategy::Activate);
        assert_eq!(format!("{:?}", inst), "Construct(Activate)");
    }
}
