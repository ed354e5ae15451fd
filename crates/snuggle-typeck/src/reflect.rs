//! The reflected-type bridge.
//!
//! Host classes become Snuggle types through a build-time registry rather
//! than run-time reflection: each [`ReflectedClass`] is a hand-written
//! descriptor of one host class, and the builder methods mirror the
//! annotations the host side would carry -- membership in the registry is
//! `SnuggleAllow`, omission is `SnuggleDeny`, [`ReflectedClassBuilder::rename`]
//! is `SnuggleRename`, [`ReflectedClassBuilder::singleton`] is
//! `SnuggleStatic`, and [`ReflectedClassBuilder::acknowledge_generics`] is
//! `SnuggleAcknowledgeGenerics`.
//!
//! Registry validation runs once at compiler start-up; a bad descriptor is
//! fatal there, never at an individual expression.

use std::fmt;

/// A host-side type in a reflected signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectedType {
    Void,
    Bool,
    I32,
    I64,
    F32,
    F64,
    Str,
    Object,
    /// Another reflected class, by Snuggle-visible name.
    Class(String),
}

impl ReflectedType {
    /// The host descriptor fragment for this type.
    pub fn descriptor(&self, registry: &ReflectRegistry) -> String {
        match self {
            ReflectedType::Void => "V".to_string(),
            ReflectedType::Bool => "Z".to_string(),
            ReflectedType::I32 => "I".to_string(),
            ReflectedType::I64 => "J".to_string(),
            ReflectedType::F32 => "F".to_string(),
            ReflectedType::F64 => "D".to_string(),
            ReflectedType::Str => "Ljava/lang/String;".to_string(),
            ReflectedType::Object => "Ljava/lang/Object;".to_string(),
            ReflectedType::Class(name) => match registry.class_index(name) {
                Some(idx) => format!("L{};", registry.classes[idx].runtime_name),
                None => format!("L{name};"),
            },
        }
    }
}

/// Singleton mode: one process-wide instance lives in a well-known static
/// field of the runtime class.
#[derive(Debug, Clone)]
pub struct Singleton {
    /// Index of the instance in the runtime's object table.
    pub object_index: u32,
    /// Name of the static field holding the instance.
    pub field: String,
}

/// One allowed method of a reflected class.
#[derive(Debug, Clone)]
pub struct ReflectedMethod {
    /// Snuggle-visible name (after any rename).
    pub name: String,
    /// The host method name to invoke.
    pub host_name: String,
    pub is_static: bool,
    pub params: Vec<ReflectedType>,
    pub ret: ReflectedType,
}

/// One allowed field of a reflected class.
#[derive(Debug, Clone)]
pub struct ReflectedField {
    pub name: String,
    pub host_name: String,
    pub ty: ReflectedType,
}

/// One host class surfaced as a compile-time Snuggle type.
#[derive(Debug, Clone)]
pub struct ReflectedClass {
    /// Snuggle-visible name (after any rename).
    pub name: String,
    /// Host-internal class name, e.g. `snuggle/runtime/Console`.
    pub runtime_name: String,
    /// Host-side type parameter count.
    pub type_params: u32,
    /// Explicit opt-in to erasing those parameters.
    pub acknowledge_generics: bool,
    pub singleton: Option<Singleton>,
    pub fields: Vec<ReflectedField>,
    pub methods: Vec<ReflectedMethod>,
}

/// Builder for one reflected class descriptor.
#[derive(Debug)]
pub struct ReflectedClassBuilder {
    class: ReflectedClass,
}

impl ReflectedClassBuilder {
    pub fn new(name: impl Into<String>, runtime_name: impl Into<String>) -> Self {
        Self {
            class: ReflectedClass {
                name: name.into(),
                runtime_name: runtime_name.into(),
                type_params: 0,
                acknowledge_generics: false,
                singleton: None,
                fields: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    /// Expose the class under a different Snuggle name.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.class.name = name.into();
        self
    }

    /// Declare the host class's type parameter count.
    pub fn type_params(mut self, count: u32) -> Self {
        self.class.type_params = count;
        self
    }

    /// Opt in to erasing the host class's generics.
    pub fn acknowledge_generics(mut self) -> Self {
        self.class.acknowledge_generics = true;
        self
    }

    /// Singleton mode: methods dispatch on the instance stored in the
    /// runtime's `INSTANCE` field at the given object index.
    pub fn singleton(mut self, object_index: u32) -> Self {
        self.class.singleton = Some(Singleton {
            object_index,
            field: "INSTANCE".to_string(),
        });
        self
    }

    /// Allow a method under the same name on both sides.
    pub fn method(
        self,
        name: impl Into<String>,
        is_static: bool,
        params: Vec<ReflectedType>,
        ret: ReflectedType,
    ) -> Self {
        let name = name.into();
        let host_name = name.clone();
        self.method_renamed(name, host_name, is_static, params, ret)
    }

    /// Allow a method under a different Snuggle name.
    pub fn method_renamed(
        mut self,
        name: impl Into<String>,
        host_name: impl Into<String>,
        is_static: bool,
        params: Vec<ReflectedType>,
        ret: ReflectedType,
    ) -> Self {
        self.class.methods.push(ReflectedMethod {
            name: name.into(),
            host_name: host_name.into(),
            is_static,
            params,
            ret,
        });
        self
    }

    /// Allow a field.
    pub fn field(mut self, name: impl Into<String>, ty: ReflectedType) -> Self {
        let name = name.into();
        self.class.fields.push(ReflectedField {
            host_name: name.clone(),
            name,
            ty,
        });
        self
    }

    pub fn build(self) -> ReflectedClass {
        self.class
    }
}

/// The registry of every reflected class in this compile.
#[derive(Debug, Default)]
pub struct ReflectRegistry {
    pub classes: Vec<ReflectedClass>,
}

impl ReflectRegistry {
    /// An empty registry: no host classes bridged.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build and validate a registry. Errors here are fatal at compiler
    /// start-up.
    pub fn new(classes: Vec<ReflectedClass>) -> Result<Self, ReflectError> {
        let registry = Self { classes };
        registry.validate()?;
        Ok(registry)
    }

    /// Snuggle-visible names in registry order (the resolver's builtin
    /// name list).
    pub fn names(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.name.clone()).collect()
    }

    /// Find a class by Snuggle-visible name.
    pub fn class_index(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c.name == name)
    }

    /// The host method descriptor of a reflected method.
    pub fn method_descriptor(&self, method: &ReflectedMethod) -> String {
        let mut out = String::from("(");
        for p in &method.params {
            out.push_str(&p.descriptor(self));
        }
        out.push(')');
        out.push_str(&method.ret.descriptor(self));
        out
    }

    fn validate(&self) -> Result<(), ReflectError> {
        for (i, class) in self.classes.iter().enumerate() {
            if class.type_params > 0 && !class.acknowledge_generics {
                return Err(ReflectError::UnacknowledgedGenerics {
                    class: class.name.clone(),
                });
            }
            if class.singleton.is_some() && !class.fields.is_empty() {
                return Err(ReflectError::FieldsOnSingleton {
                    class: class.name.clone(),
                });
            }
            if self.classes[..i].iter().any(|c| c.name == class.name) {
                return Err(ReflectError::DuplicateClass {
                    class: class.name.clone(),
                });
            }
            for method in &class.methods {
                for param in &method.params {
                    self.check_named(param, &class.name)?;
                }
                self.check_named(&method.ret, &class.name)?;
            }
        }
        Ok(())
    }

    fn check_named(&self, ty: &ReflectedType, class: &str) -> Result<(), ReflectError> {
        if let ReflectedType::Class(name) = ty {
            if self.class_index(name).is_none() {
                return Err(ReflectError::UnknownClassRef {
                    class: class.to_string(),
                    referenced: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A registry validation failure. Fatal at compiler start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectError {
    /// A class with host type parameters did not acknowledge erasure.
    UnacknowledgedGenerics { class: String },
    /// Fields are not exposed for singleton classes.
    FieldsOnSingleton { class: String },
    /// Two registry entries share a Snuggle name.
    DuplicateClass { class: String },
    /// A signature references a class the registry does not contain.
    UnknownClassRef { class: String, referenced: String },
}

impl fmt::Display for ReflectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnacknowledgedGenerics { class } => write!(
                f,
                "reflected class `{class}` has type parameters; generics are erased, which must be acknowledged explicitly"
            ),
            Self::FieldsOnSingleton { class } => {
                write!(f, "reflected singleton `{class}` cannot expose fields")
            }
            Self::DuplicateClass { class } => {
                write!(f, "reflected class `{class}` registered twice")
            }
            Self::UnknownClassRef { class, referenced } => write!(
                f,
                "reflected class `{class}` references `{referenced}`, which is not in the registry"
            ),
        }
    }
}

impl std::error::Error for ReflectError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generics_require_acknowledgement() {
        let class = ReflectedClassBuilder::new("Listy", "host/Listy")
            .type_params(1)
            .build();
        let err = ReflectRegistry::new(vec![class]).unwrap_err();
        assert!(matches!(err, ReflectError::UnacknowledgedGenerics { .. }));

        let class = ReflectedClassBuilder::new("Listy", "host/Listy")
            .type_params(1)
            .acknowledge_generics()
            .build();
        assert!(ReflectRegistry::new(vec![class]).is_ok());
    }

    #[test]
    fn singletons_cannot_expose_fields() {
        let class = ReflectedClassBuilder::new("Console", "host/Console")
            .singleton(0)
            .field("level", ReflectedType::I32)
            .build();
        let err = ReflectRegistry::new(vec![class]).unwrap_err();
        assert!(matches!(err, ReflectError::FieldsOnSingleton { .. }));
    }

    #[test]
    fn duplicate_names_rejected() {
        let a = ReflectedClassBuilder::new("X", "host/X1").build();
        let b = ReflectedClassBuilder::new("X", "host/X2").build();
        let err = ReflectRegistry::new(vec![a, b]).unwrap_err();
        assert!(matches!(err, ReflectError::DuplicateClass { .. }));
    }

    #[test]
    fn rename_changes_the_snuggle_name_only() {
        let class = ReflectedClassBuilder::new("host_name", "host/Thing")
            .rename("Thing")
            .build();
        let registry = ReflectRegistry::new(vec![class]).unwrap();
        assert_eq!(registry.names(), vec!["Thing".to_string()]);
        assert_eq!(registry.classes[0].runtime_name, "host/Thing");
    }

    #[test]
    fn method_descriptors_follow_host_conventions() {
        let class = ReflectedClassBuilder::new("Console", "host/Console")
            .method(
                "log",
                true,
                vec![ReflectedType::Str, ReflectedType::I32],
                ReflectedType::Void,
            )
            .build();
        let registry = ReflectRegistry::new(vec![class]).unwrap();
        let desc = registry.method_descriptor(&registry.classes[0].methods[0]);
        assert_eq!(desc, "(Ljava/lang/String;I)V");
    }
}
