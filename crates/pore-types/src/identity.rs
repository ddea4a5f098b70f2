//! Parameter identities and override keys

use crate::ids::CallSiteId;
use crate::name::{NameError, ParameterName};
use crate::type_def::TypeDef;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Immutable key of one input slot at one call-site
///
/// Two identities are equal iff name, declared type, call-site and the
/// static flag all match. Used as the key of every store in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterIdentity {
    name: ParameterName,
    type_def: TypeDef,
    call_site: CallSiteId,
    static_param: bool,
}

impl ParameterIdentity {
    /// Identity of a regular (runtime) input
    #[inline]
    #[must_use]
    pub fn new(name: ParameterName, type_def: TypeDef, call_site: CallSiteId) -> Self {
        Self {
            name,
            type_def,
            call_site,
            static_param: false,
        }
    }

    /// Mark the identity as a static (compile-time only) parameter
    #[inline]
    #[must_use]
    pub fn with_static(mut self, static_param: bool) -> Self {
        self.static_param = static_param;
        self
    }

    /// Namespace-qualified name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &ParameterName {
        &self.name
    }

    /// Declared type
    #[inline]
    #[must_use]
    pub fn type_def(&self) -> &TypeDef {
        &self.type_def
    }

    /// Owning call-site
    #[inline]
    #[must_use]
    pub fn call_site(&self) -> CallSiteId {
        self.call_site
    }

    /// Static (compile-time only) parameter flag
    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.static_param
    }

    /// Input name as declared by the function of the call-site
    #[inline]
    #[must_use]
    pub fn input_name(&self) -> &str {
        self.name.input_name()
    }

    /// Same input on another call-site
    #[inline]
    #[must_use]
    pub fn rebased(&self, call_site: CallSiteId) -> Self {
        Self {
            call_site,
            ..self.clone()
        }
    }

    /// Identity of an input exposed by a nested call below this one
    ///
    /// The child name is this identity's name extended with `input`.
    ///
    /// # Errors
    /// Returns error if `input` is not a valid name segment
    pub fn nested(
        &self,
        input: &str,
        type_def: TypeDef,
        call_site: CallSiteId,
        static_param: bool,
    ) -> Result<Self, NameError> {
        Ok(Self {
            name: self.name.child(input)?,
            type_def,
            call_site,
            static_param,
        })
    }
}

impl Display for ParameterIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.name, self.type_def, self.call_site)?;
        if self.static_param {
            f.write_str(" (static)")?;
        }
        Ok(())
    }
}

/// Key of an override connection point inside the owning graph
///
/// Built exclusively through [`OverrideKey::for_identity`], which applies the
/// call-site aliasing rule. Resolution and mutation must both go through it,
/// otherwise an override written by one is invisible to the other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverrideKey {
    call_site: CallSiteId,
    aliased_name: ParameterName,
    type_def: TypeDef,
}

impl OverrideKey {
    /// Derive the override key of `identity` on a call-site named `instance_name`
    #[must_use]
    pub fn for_identity(identity: &ParameterIdentity, instance_name: &str) -> Self {
        Self {
            call_site: identity.call_site(),
            aliased_name: identity.name().aliased(instance_name),
            type_def: identity.type_def().clone(),
        }
    }

    /// Owning call-site
    #[inline]
    #[must_use]
    pub fn call_site(&self) -> CallSiteId {
        self.call_site
    }

    /// Name after aliasing
    #[inline]
    #[must_use]
    pub fn aliased_name(&self) -> &ParameterName {
        &self.aliased_name
    }

    /// Declared type
    #[inline]
    #[must_use]
    pub fn type_def(&self) -> &TypeDef {
        &self.type_def
    }
}

impl Display for OverrideKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.aliased_name, self.type_def, self.call_site)
    }
}
