//! Tests for the save/load driver: hooks, unknown fields, failures.

use std::cell::Cell;

use classdef_rs::{
    load_records, save_records, CellArray, ClassDef, ClassRecord, Error, Hook, HookArg, HookValue,
    LoadOptions, MatBackend, MemoryStore, ObjectHandle, ObjectStore, Record, Result, SaveOptions,
    Serializer, TextBackend, TypedValue, UnknownFields,
};
use tempfile::tempdir;

/// Wraps a [`MemoryStore`], counting property traffic and optionally
/// failing one getter.
struct CountingStore {
    inner: MemoryStore,
    gets: Cell<usize>,
    lists: Cell<usize>,
    sets: usize,
    failing_getter: Option<&'static str>,
}

impl CountingStore {
    fn new(inner: MemoryStore) -> Self {
        CountingStore {
            inner,
            gets: Cell::new(0),
            lists: Cell::new(0),
            sets: 0,
            failing_getter: None,
        }
    }
}

impl ObjectStore for CountingStore {
    fn class_of(&self, object: ObjectHandle) -> Result<String> {
        self.inner.class_of(object)
    }

    fn list_properties(&self, object: ObjectHandle) -> Result<Vec<String>> {
        self.lists.set(self.lists.get() + 1);
        self.inner.list_properties(object)
    }

    fn get_property(&self, object: ObjectHandle, name: &str) -> Result<TypedValue> {
        self.gets.set(self.gets.get() + 1);
        if self.failing_getter == Some(name) {
            return Err(Error::argument("getter exploded"));
        }
        self.inner.get_property(object, name)
    }

    fn set_property(&mut self, object: ObjectHandle, name: &str, value: TypedValue) -> Result<()> {
        self.sets += 1;
        self.inner.set_property(object, name, value)
    }

    fn construct_default(&mut self, class: &str) -> Result<ObjectHandle> {
        self.inner.construct_default(class)
    }

    fn find_method(&self, class: &str, method: &str) -> Option<Hook> {
        self.inner.find_method(class, method)
    }

    fn invoke(&mut self, hook: &Hook, args: Vec<HookArg>) -> Result<HookValue> {
        self.inner.invoke(hook, args)
    }
}

/// A class that packs its two properties into one field on save.
fn packed_class() -> ClassDef {
    ClassDef::new("Packed")
        .property("First", "")
        .property("Last", "")
        .method("saveobj", |store, args| {
            let Some(HookArg::Object(obj)) = args.first().cloned() else {
                return Err(Error::argument("saveobj needs an object"));
            };
            let first = store.get_property(obj, "First")?;
            let last = store.get_property(obj, "Last")?;
            let joined = format!(
                "{} {}",
                first.as_text().unwrap_or_default(),
                last.as_text().unwrap_or_default()
            );
            Ok(HookValue::Record(Record::new().with("Full", joined)?))
        })
        .static_method("loadobj", |store, args| {
            let Some(HookArg::Record(record)) = args.into_iter().next() else {
                return Err(Error::argument("loadobj needs a record"));
            };
            let full = record.get("Full").and_then(TypedValue::as_text).unwrap_or_default();
            let (first, last) = full.split_once(' ').unwrap_or((full, ""));
            let obj = store.construct_default("Packed")?;
            store.set_property(obj, "First", first.into())?;
            store.set_property(obj, "Last", last.into())?;
            Ok(HookValue::Object(obj))
        })
}

#[test]
fn test_hooks_take_precedence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("packed.txt");
    let backend = TextBackend::new();

    let mut inner = MemoryStore::new();
    inner.define(packed_class());
    let obj = inner.construct_default("Packed").unwrap();
    inner.set_property(obj, "First", "Ada".into()).unwrap();
    inner.set_property(obj, "Last", "Lovelace".into()).unwrap();

    let mut store = CountingStore::new(inner);
    let mut serializer = Serializer::new(&mut store);
    serializer
        .save(&backend, obj, &SaveOptions::new().path(&path))
        .unwrap();
    let loaded = serializer.load(&backend, &path, &LoadOptions::new()).unwrap();

    assert_eq!(store.gets.get(), 0);
    assert_eq!(store.lists.get(), 0);
    assert_eq!(store.sets, 0);

    let saved = load_records(&backend, &path).unwrap();
    assert_eq!(saved[0].record.names().collect::<Vec<_>>(), ["Full"]);
    assert_eq!(
        store.inner.get_property(loaded, "Last").unwrap().as_text(),
        Some("Lovelace")
    );
}

#[test]
fn test_hook_returning_wrong_value() {
    let dir = tempdir().unwrap();
    let mut store = MemoryStore::new();
    store.define(
        ClassDef::new("Broken")
            .property("X", 1.0)
            .method("saveobj", |_, _| Ok(HookValue::Nothing)),
    );
    let obj = store.construct_default("Broken").unwrap();

    let err = Serializer::new(&mut store)
        .save(&TextBackend::new(), obj, &SaveOptions::new().path(dir.path().join("b.txt")))
        .unwrap_err();
    assert!(matches!(err.root(), Error::HookInvocation { hook, .. } if hook == "Broken.saveobj"));
}

#[test]
fn test_instance_loadobj_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("w.txt");
    let record = Record::new().with("X", 1.0).unwrap();
    save_records(&TextBackend::new(), &path, &[ClassRecord::new("Wrong", record)]).unwrap();

    let mut store = MemoryStore::new();
    store.define(
        ClassDef::new("Wrong")
            .property("X", 0.0)
            .method("loadobj", |_, _| Ok(HookValue::Nothing)),
    );
    let err = Serializer::new(&mut store)
        .load(&TextBackend::new(), &path, &LoadOptions::new())
        .unwrap_err();
    assert!(matches!(err.root(), Error::HookInvocation { .. }));
}

fn save_v2(path: &std::path::Path) {
    let record = Record::new()
        .with("A", 1.0)
        .and_then(|r| r.with("Extra", "new in v2"))
        .and_then(|r| r.with("B", 2.0))
        .unwrap();
    save_records(&MatBackend::new(), path, &[ClassRecord::new("Shape", record)]).unwrap();
}

fn shape_v1() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.define(ClassDef::new("Shape").property("A", 0.0).property("B", 0.0));
    store
}

#[test]
fn test_unknown_field_rejected_by_default() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shape.mat");
    save_v2(&path);

    let mut store = CountingStore::new(shape_v1());
    let err = Serializer::new(&mut store)
        .load(&MatBackend::new(), &path, &LoadOptions::new())
        .unwrap_err();

    assert!(matches!(
        err.root(),
        Error::UnknownField { field, class } if field == "Extra" && class == "Shape"
    ));
    assert!(matches!(err, Error::Container { phase: "constructing", .. }));
    assert_eq!(store.sets, 0);
}

#[test]
fn test_unknown_field_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shape.mat");
    save_v2(&path);

    let mut store = shape_v1();
    let options = LoadOptions::new().unknown_fields(UnknownFields::Skip);
    let obj = Serializer::new(&mut store)
        .load(&MatBackend::new(), &path, &options)
        .unwrap();

    assert_eq!(store.get_property(obj, "A").unwrap(), TypedValue::from(1.0));
    assert_eq!(store.get_property(obj, "B").unwrap(), TypedValue::from(2.0));
}

#[test]
fn test_failed_text_save_leaves_no_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.txt");

    let mut store = MemoryStore::new();
    store.define(
        ClassDef::new("Bag")
            .property("A", 1.0)
            .property("Items", 0.0)
            .property("C", "three"),
    );
    let obj = store.construct_default("Bag").unwrap();
    store
        .set_property(obj, "Items", CellArray::row(vec![1.0.into()]).into())
        .unwrap();

    let err = Serializer::new(&mut store)
        .save(&TextBackend::new(), obj, &SaveOptions::new().path(&path))
        .unwrap_err();

    assert!(matches!(err.root(), Error::UnsupportedConversion { field, backend: "text", .. } if field == "Items"));
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_unreadable_field_name_refused_before_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("names.txt");
    let record = Record::new().with("my field", 1.0).unwrap();

    let err = save_records(&TextBackend::new(), &path, &[ClassRecord::new("Odd", record)])
        .unwrap_err();

    assert!(matches!(err, Error::Argument { .. }));
    assert!(!path.exists());
}

#[test]
fn test_failed_save_keeps_previous_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keep.txt");
    std::fs::write(&path, "# struct\nOld = int8(1)\n").unwrap();

    let mut store = MemoryStore::new();
    store.define(ClassDef::new("Deep").property("R", 0.0));
    let obj = store.construct_default("Deep").unwrap();
    let deep = Record::new()
        .with("inner", Record::new().with("x", 1.0).unwrap())
        .unwrap();
    store.set_property(obj, "R", deep.into()).unwrap();

    let err = Serializer::new(&mut store)
        .save(&TextBackend::new(), obj, &SaveOptions::new().path(&path))
        .unwrap_err();

    assert!(matches!(err.root(), Error::UnsupportedNesting { depth: 2, .. }));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# struct\nOld = int8(1)\n");
}

#[test]
fn test_property_read_failure() {
    let dir = tempdir().unwrap();
    let mut inner = MemoryStore::new();
    inner.define(ClassDef::new("Vault").property("Open", 1.0).property("Secret", 2.0));
    let obj = inner.construct_default("Vault").unwrap();

    let mut store = CountingStore::new(inner);
    store.failing_getter = Some("Secret");

    let err = Serializer::new(&mut store)
        .save(&MatBackend::new(), obj, &SaveOptions::new().path(dir.path().join("v.mat")))
        .unwrap_err();

    assert!(matches!(err.root(), Error::PropertyRead { property, .. } if property == "Secret"));
    assert!(matches!(err, Error::Container { phase: "extracting", .. }));
    assert!(!dir.path().join("v.mat").exists());
}

#[test]
fn test_class_name_resolution() {
    let dir = tempdir().unwrap();
    let mut store = MemoryStore::new();
    store.define(ClassDef::new("Robot").property("Id", 0u32));
    store.define(ClassDef::new("Drone").property("Id", 0u32));
    let record = Record::new().with("Id", 7u32).unwrap();

    // No header class: fall back to the file stem.
    let stem = dir.path().join("Robot.txt");
    save_records(&TextBackend::new(), &stem, &[ClassRecord::anonymous(record.clone())]).unwrap();
    let obj = Serializer::new(&mut store)
        .load(&TextBackend::new(), &stem, &LoadOptions::new())
        .unwrap();
    assert_eq!(store.class_of(obj).unwrap(), "Robot");

    // The header wins over the stem, an explicit class over both.
    let named = dir.path().join("Robot.mat");
    save_records(&MatBackend::new(), &named, &[ClassRecord::new("Drone", record)]).unwrap();
    let obj = Serializer::new(&mut store)
        .load(&MatBackend::new(), &named, &LoadOptions::new())
        .unwrap();
    assert_eq!(store.class_of(obj).unwrap(), "Drone");

    let obj = Serializer::new(&mut store)
        .load(&MatBackend::new(), &named, &LoadOptions::new().class_name("Robot"))
        .unwrap();
    assert_eq!(store.class_of(obj).unwrap(), "Robot");
}

#[test]
fn test_default_save_path_and_open_errors() {
    let mut store = MemoryStore::new();
    store.define(ClassDef::new("Widget").property("N", 1i8));
    let obj = store.construct_default("Widget").unwrap();

    // Default output path is derived from the class name.
    let dir = tempdir().unwrap();
    let cwd = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let saved = Serializer::new(&mut store).save(&MatBackend::new(), obj, &SaveOptions::new());
    std::env::set_current_dir(cwd).unwrap();
    assert_eq!(saved.unwrap(), std::path::PathBuf::from("Widget.mat"));
    assert!(dir.path().join("Widget.mat").exists());

    let missing = dir.path().join("missing.mat");
    let err = Serializer::new(&mut store)
        .load(&MatBackend::new(), &missing, &LoadOptions::new())
        .unwrap_err();
    assert!(matches!(err.root(), Error::ContainerOpen { .. }));
    assert!(err.to_string().contains("missing.mat"));
}
