//! An in-memory object store.
//!
//! [`MemoryStore`] implements [`ObjectStore`] over plain Rust data: classes
//! are [`ClassDef`] values with ordered, defaulted properties and optional
//! methods written as closures. It stands in for a real host object system
//! in tests and tools.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::store::{Hook, HookArg, HookValue, ObjectHandle, ObjectStore};
use crate::value::TypedValue;

/// Body of a method defined on a [`ClassDef`].
pub type MethodFn = Rc<dyn Fn(&mut MemoryStore, Vec<HookArg>) -> Result<HookValue>>;

#[derive(Clone)]
struct MethodDef {
    is_static: bool,
    body: MethodFn,
}

/// A class definition: name, properties with defaults, methods.
#[derive(Clone)]
pub struct ClassDef {
    name: String,
    properties: Vec<(String, TypedValue)>,
    methods: HashMap<String, MethodDef>,
}

impl ClassDef {
    /// Start a class definition.
    pub fn new(name: impl Into<String>) -> Self {
        ClassDef {
            name: name.into(),
            properties: Vec::new(),
            methods: HashMap::new(),
        }
    }

    /// Declare a property with its default value. Declaration order is the
    /// order [`ObjectStore::list_properties`] reports.
    pub fn property(mut self, name: impl Into<String>, default: impl Into<TypedValue>) -> Self {
        self.properties.push((name.into(), default.into()));
        self
    }

    /// Define an instance method.
    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut MemoryStore, Vec<HookArg>) -> Result<HookValue> + 'static,
    {
        self.methods.insert(
            name.into(),
            MethodDef {
                is_static: false,
                body: Rc::new(body),
            },
        );
        self
    }

    /// Define a static method.
    pub fn static_method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut MemoryStore, Vec<HookArg>) -> Result<HookValue> + 'static,
    {
        self.methods.insert(
            name.into(),
            MethodDef {
                is_static: true,
                body: Rc::new(body),
            },
        );
        self
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("properties", &self.properties.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("methods", &methods)
            .finish()
    }
}

#[derive(Debug, Clone)]
struct Instance {
    class: String,
    values: Vec<(String, TypedValue)>,
}

/// Object store backed by Rust collections.
#[derive(Debug, Default)]
pub struct MemoryStore {
    classes: HashMap<String, ClassDef>,
    objects: Vec<Instance>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class, replacing any previous definition with that name.
    pub fn define(&mut self, class: ClassDef) -> &mut Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    /// Check whether a class is defined.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Number of objects constructed so far.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn instance(&self, object: ObjectHandle) -> Result<&Instance> {
        usize::try_from(object.id())
            .ok()
            .and_then(|i| self.objects.get(i))
            .ok_or_else(|| Error::argument(format!("no object {}", object)))
    }

    fn instance_mut(&mut self, object: ObjectHandle) -> Result<&mut Instance> {
        usize::try_from(object.id())
            .ok()
            .and_then(|i| self.objects.get_mut(i))
            .ok_or_else(|| Error::argument(format!("no object {}", object)))
    }
}

impl ObjectStore for MemoryStore {
    fn class_of(&self, object: ObjectHandle) -> Result<String> {
        Ok(self.instance(object)?.class.clone())
    }

    fn list_properties(&self, object: ObjectHandle) -> Result<Vec<String>> {
        Ok(self
            .instance(object)?
            .values
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn get_property(&self, object: ObjectHandle, name: &str) -> Result<TypedValue> {
        let instance = self.instance(object)?;
        instance
            .values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| Error::unknown_field(name, &instance.class))
    }

    fn set_property(&mut self, object: ObjectHandle, name: &str, value: TypedValue) -> Result<()> {
        let instance = self.instance_mut(object)?;
        match instance.values.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::unknown_field(name, &instance.class)),
        }
    }

    fn construct_default(&mut self, class: &str) -> Result<ObjectHandle> {
        let def = self
            .classes
            .get(class)
            .ok_or_else(|| Error::class_not_found(class))?;
        let instance = Instance {
            class: def.name.clone(),
            values: def.properties.clone(),
        };
        self.objects.push(instance);
        Ok(ObjectHandle::new((self.objects.len() - 1) as u64))
    }

    fn find_method(&self, class: &str, method: &str) -> Option<Hook> {
        let def = self.classes.get(class)?.methods.get(method)?;
        Some(Hook::new(class, method, def.is_static))
    }

    fn invoke(&mut self, hook: &Hook, args: Vec<HookArg>) -> Result<HookValue> {
        let body = self
            .classes
            .get(hook.class())
            .and_then(|c| c.methods.get(hook.method()))
            .map(|m| Rc::clone(&m.body))
            .ok_or_else(|| Error::hook(hook.qualified_name(), "method not found"))?;
        body(self, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn person() -> ClassDef {
        ClassDef::new("Person")
            .property("Name", "")
            .property("Age", 0.0)
    }

    #[test]
    fn test_construct_default_values() {
        let mut store = MemoryStore::new();
        store.define(person());

        let p = store.construct_default("Person").unwrap();
        assert_eq!(store.class_of(p).unwrap(), "Person");
        assert_eq!(store.list_properties(p).unwrap(), vec!["Name", "Age"]);
        assert_eq!(store.get_property(p, "Age").unwrap(), TypedValue::from(0.0));
    }

    #[test]
    fn test_unknown_class() {
        let mut store = MemoryStore::new();
        let err = store.construct_default("Nope").unwrap_err();
        assert!(matches!(err, Error::ClassNotFound { class } if class == "Nope"));
    }

    #[test]
    fn test_invoke_static_method() {
        let mut store = MemoryStore::new();
        store.define(person().static_method("loadobj", |store, args| {
            let obj = store.construct_default("Person")?;
            if let Some(HookArg::Record(r)) = args.into_iter().next() {
                if let Some(name) = r.get("Name") {
                    store.set_property(obj, "Name", name.clone())?;
                }
            }
            Ok(HookValue::Object(obj))
        }));

        let hook = store.find_method("Person", "loadobj").unwrap();
        assert!(hook.is_static());

        let record = Record::new().with("Name", "Ada").unwrap();
        let result = store.invoke(&hook, vec![HookArg::Record(record)]).unwrap();
        let HookValue::Object(obj) = result else {
            panic!("loadobj should return an object");
        };
        assert_eq!(store.get_property(obj, "Name").unwrap().as_text(), Some("Ada"));
    }
}
