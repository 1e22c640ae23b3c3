//! Instruction-list interpreter backing compiled injections
//!
//! A `CompiledInjection` is the immutable output of `Forge::compile`: the
//! instruction list plus the (source, target) pair it was compiled for. It is
//! safe for concurrent invocation as long as each call graph uses its own
//! `InjectionContext`.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::context::{runtime_type, source_identity, InjectionContext, InjectionHint};
use crate::error::{Error, Result};
use crate::fragment::{ConstructionStrategy, NullSourceStrategy};
use crate::forge::instruction::{Instruction, MemberResolution};
use crate::injection::{Injection, MergeOutcome, PostMergeAction, TriggerCause, TriggerParams};
use crate::types::{TypeCatalog, TypeKind, TypeName, TypePair};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct CompiledInjection {
    pair: TypePair,
    instructions: Vec<Instruction>,
}

impl CompiledInjection {
    pub(crate) fn new(pair: TypePair, instructions: Vec<Instruction>) -> Self {
        CompiledInjection { pair, instructions }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The null-source branch: runs instead of member mapping
    fn null_branch(&self, source: &Value, context: &mut InjectionContext) -> Result<Value> {
        let guard = self.instructions.iter().find_map(|i| match i {
            Instruction::NullGuard(strategy) => Some(strategy),
            _ => None,
        });
        match guard {
            Some(NullSourceStrategy::Throw(make_error)) => Err(make_error()),
            Some(NullSourceStrategy::CustomFactory(factory)) => {
                let factory = factory.clone();
                factory(source, context)
            }
            Some(NullSourceStrategy::DefaultValue) | None => {
                Ok(default_value(context.catalog(), &self.pair.target))
            }
        }
    }

    fn construct(&self, source: &Value, context: &mut InjectionContext) -> Result<Value> {
        let strategy = self
            .instructions
            .iter()
            .find_map(|i| match i {
                Instruction::Construct(strategy) => Some(strategy.clone()),
                _ => None,
            })
            .unwrap_or(ConstructionStrategy::Activate);

        let target = match strategy {
            ConstructionStrategy::Activate => activate(context.catalog(), &self.pair.target),
            ConstructionStrategy::DefaultFactory => {
                default_value(context.catalog(), &self.pair.target)
            }
            ConstructionStrategy::CustomFactory(factory) => {
                let produced = factory(source, context)?;
                check_shape(context.catalog(), &self.pair.target, &produced)?;
                produced
            }
        };
        Ok(target)
    }

    /// Convert and assign every matched member. When merging, a member that
    /// already holds a non-null value on the existing target is merged into
    /// rather than replaced, so its untouched state survives.
    fn populate(
        &self,
        source: &Value,
        target: &mut Value,
        context: &mut InjectionContext,
        merging: bool,
    ) -> Result<()> {
        for instruction in &self.instructions {
            let Instruction::AssignMember {
                target_member,
                source_member,
                resolution,
            } = instruction
            else {
                continue;
            };
            let Some(value) = source.get(source_member) else {
                continue;
            };

            let member_pair = resolve_member_pair(resolution, value);
            let unit = context.resolve_required(&member_pair)?;

            let existing = if merging {
                target.get(target_member).cloned()
            } else {
                None
            };
            let converted = match existing {
                Some(current) if !current.is_null() => {
                    unit.merge(value, current, context, InjectionHint::None)?.target
                }
                _ => unit.transform(value, context, InjectionHint::None)?,
            };
            target[target_member.as_str()] = converted;
        }
        Ok(())
    }

    fn fire_triggers(
        &self,
        source: &Value,
        target: &mut Value,
        context: &mut InjectionContext,
        hint: InjectionHint,
    ) -> Result<()> {
        for instruction in &self.instructions {
            let Instruction::Trigger { cause, action } = instruction else {
                continue;
            };
            let fire = match cause {
                TriggerCause::InjectionEnded => true,
                TriggerCause::CollectionItemProcessed => {
                    matches!(hint, InjectionHint::CollectionIndex(_))
                }
            };
            if fire {
                action(TriggerParams {
                    source,
                    target: &mut *target,
                    context: &mut *context,
                    hint,
                })?;
            }
        }
        Ok(())
    }

    fn transform_inner(
        &self,
        source: &Value,
        context: &mut InjectionContext,
        hint: InjectionHint,
    ) -> Result<Value> {
        let mut target = self.construct(source, context)?;
        // Cache the shell before recursing so a cyclic graph revisiting this
        // source resolves to it instead of recursing forever
        if let Some(id) = source_identity(source) {
            context.cache_target(id.to_string(), self.pair.target.clone(), target.clone());
        }
        self.populate(source, &mut target, context, false)?;
        self.fire_triggers(source, &mut target, context, hint)?;
        if let Some(id) = source_identity(source) {
            context.cache_target(id.to_string(), self.pair.target.clone(), target.clone());
        }
        Ok(target)
    }

    fn merge_inner(
        &self,
        source: &Value,
        existing: Value,
        context: &mut InjectionContext,
        hint: InjectionHint,
    ) -> Result<MergeOutcome> {
        if existing.is_null() {
            let target = self.transform_inner(source, context, hint)?;
            return Ok(MergeOutcome {
                action: PostMergeAction::Replace,
                target,
            });
        }
        // Member assignment indexes into the existing value; anything but an
        // object cannot hold members
        let has_assignments = self
            .instructions
            .iter()
            .any(|i| matches!(i, Instruction::AssignMember { .. }));
        if has_assignments && !existing.is_object() {
            return Err(Error::TypeMismatch {
                expected: format!("{} (object)", self.pair.target),
                actual: value_kind(&existing).to_string(),
                context: "merge target".to_string(),
            });
        }
        let mut target = existing;
        self.populate(source, &mut target, context, true)?;
        self.fire_triggers(source, &mut target, context, hint)?;
        Ok(MergeOutcome {
            action: PostMergeAction::UpdateInPlace,
            target,
        })
    }
}

impl Injection for CompiledInjection {
    fn pair(&self) -> &TypePair {
        &self.pair
    }

    fn transform(
        &self,
        source: &Value,
        context: &mut InjectionContext,
        hint: InjectionHint,
    ) -> Result<Value> {
        if source.is_null() {
            return self.null_branch(source, context);
        }
        if let Some(id) = source_identity(source) {
            if let Some(cached) = context.cached_target(id, &self.pair.target) {
                return Ok(cached.clone());
            }
        }
        context.push_frame(self.pair.clone());
        let result = self.transform_inner(source, context, hint);
        context.pop_frame();
        result
    }

    fn merge(
        &self,
        source: &Value,
        existing: Value,
        context: &mut InjectionContext,
        hint: InjectionHint,
    ) -> Result<MergeOutcome> {
        if source.is_null() {
            let target = self.null_branch(source, context)?;
            return Ok(MergeOutcome {
                action: PostMergeAction::Replace,
                target,
            });
        }
        context.push_frame(self.pair.clone());
        let result = self.merge_inner(source, existing, context, hint);
        context.pop_frame();
        result
    }
}

fn resolve_member_pair(resolution: &MemberResolution, value: &Value) -> TypePair {
    match resolution {
        MemberResolution::Static(pair) => pair.clone(),
        MemberResolution::Dynamic { declared } => {
            if value.is_null() {
                return declared.clone();
            }
            match runtime_type(value) {
                Some(actual) => TypePair::new(actual, declared.target.clone()),
                None => declared.clone(),
            }
        }
    }
}

/// Parameterless activation of a target type
fn activate(catalog: &TypeCatalog, target: &TypeName) -> Value {
    match catalog.kind_of(target) {
        Some(TypeKind::Sequence) | Some(TypeKind::Array) => json!([]),
        Some(TypeKind::Primitive) => default_value(catalog, target),
        _ => json!({}),
    }
}

/// The target type's default value: null for composites, zero-ish for
/// primitives, empty for collections
pub(crate) fn default_value(catalog: &TypeCatalog, target: &TypeName) -> Value {
    match catalog.kind_of(target) {
        Some(TypeKind::Primitive) => match target.as_str() {
            "bool" => json!(false),
            "i64" | "u64" => json!(0),
            "f64" => json!(0.0),
            "String" => json!(""),
            _ => Value::Null,
        },
        Some(TypeKind::Sequence) | Some(TypeKind::Array) => json!([]),
        _ => Value::Null,
    }
}

fn check_shape(catalog: &TypeCatalog, target: &TypeName, produced: &Value) -> Result<()> {
    let expected = match catalog.kind_of(target) {
        Some(TypeKind::Object) if !produced.is_object() && !produced.is_null() => "object",
        Some(TypeKind::Sequence) | Some(TypeKind::Array) if !produced.is_array() => "array",
        _ => return Ok(()),
    };
    Err(Error::TypeMismatch {
        expected: format!("{} ({})", target, expected),
        actual: value_kind(produced).to_string(),
        context: "custom construction factory".to_string(),
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
