/// Graph walker tests
///
/// Cycles, plain beans that embed entity references, and absorbed
/// reflection failures.
/// Run with: cargo test --test walker_tests

use lazymodel::prelude::*;
use lazymodel::ObjectWalker;

fn store() -> MemoryStore {
    let catalog = MetadataCatalog::new()
        .with_entity(
            EntityMetadata::new("Person", "id")
                .scalar("name")
                .association("friend")
                .association("profile"),
        )
        .unwrap()
        .with_entity(EntityMetadata::new("Address", "id").scalar("city"))
        .unwrap();
    let store = MemoryStore::new(catalog);

    store.insert("Address", 5, Record::new().scalar("city", "Leiden")).unwrap();
    store
        .insert(
            "Person",
            1,
            Record::new()
                .scalar("name", "Ann")
                .reference("friend", Some(EntityKey::new("Person", 2))),
        )
        .unwrap();
    store
        .insert(
            "Person",
            2,
            Record::new()
                .scalar("name", "Bob")
                .reference("friend", Some(EntityKey::new("Person", 1))),
        )
        .unwrap();
    store
        .insert(
            "Person",
            3,
            Record::new()
                .scalar("name", "Cat")
                .reference("friend", Some(EntityKey::new("Person", 1))),
        )
        .unwrap();
    store
}

fn field(object: &Value, name: &str) -> Value {
    object.as_object().unwrap().get(name).unwrap()
}

#[test]
fn test_mutual_references_walk_once() {
    let store = store();
    let session = store.open_session();
    let ann = session.get("Person", 1).unwrap();
    let bob = ann.get("friend").unwrap().as_reference().unwrap().initialize().unwrap();
    assert!(bob.get("friend").unwrap().is_initialized());

    let config = ModelConfig::default();
    let mut properties = DetachedProperties::new();
    let mut walker = ObjectWalker::new(&session, &mut properties, &config);
    walker.walk(&Value::Object(ann.clone())).unwrap();

    assert_eq!(walker.visited(), 2);
    assert!(walker.has_seen(&bob));
    assert!(properties.is_empty());
    assert_eq!(ann.get("friend").unwrap(), Value::Object(bob.clone()));
    assert_eq!(bob.get("friend").unwrap(), Value::Object(ann.clone()));
}

#[test]
fn test_cycle_is_reproduced_in_the_snapshot() {
    let store = store();
    let session = store.open_session();
    let ann = session.get("Person", 1).unwrap();
    ann.get("friend").unwrap().as_reference().unwrap().initialize().unwrap();

    let mut model = EntityModel::new(Value::Object(ann));
    model.detach(&session).unwrap();

    let ann = model.snapshot().unwrap().clone();
    let bob = field(&ann, "friend");
    assert_eq!(field(&bob, "name"), Value::from("Bob"));
    assert_eq!(field(&bob, "friend"), ann);
}

#[test]
fn test_shared_unresolved_target_gives_one_pointer_per_owner() {
    let store = store();
    let session = store.open_session();
    let cat = session.get("Person", 3).unwrap();
    let ann = cat.get("friend").unwrap().as_reference().unwrap().initialize().unwrap();

    let config = ModelConfig::default();
    let mut properties = DetachedProperties::new();
    ObjectWalker::new(&session, &mut properties, &config)
        .walk(&Value::Object(cat.clone()))
        .unwrap();

    // Ann's friend is Bob, never loaded.
    assert_eq!(properties.len(), 1);
    let pointer = properties.pointer_for(&ann, "friend").unwrap();
    assert_eq!(pointer.target(), &PointerTarget::Reference(EntityKey::new("Person", 2)));
    assert_eq!(ann.get("friend").unwrap(), Value::Null);
    assert_eq!(cat.get("friend").unwrap(), Value::Object(ann));
}

#[test]
fn test_unresolved_root_is_rejected() {
    let store = store();
    let session = store.open_session();
    let proxy = session
        .load(&EntityClass::new("Person"), &Identifier::Integer(1))
        .unwrap();

    let config = ModelConfig::default();
    let mut properties = DetachedProperties::new();
    let err = ObjectWalker::new(&session, &mut properties, &config).walk(&Value::Reference(proxy));
    assert!(matches!(err, Err(ModelError::PreconditionViolation(_))));
    assert_eq!(store.stats().unwrap().entity_loads, 0);
}

#[test]
fn test_plain_bean_pointers_round_trip() {
    let store = store();
    let session = store.open_session();
    let ann = session.get("Person", 1).unwrap();
    let favorite = session
        .load(&EntityClass::new("Address"), &Identifier::Integer(5))
        .unwrap();
    let profile = ObjectRef::new(Object::new("Profile").with("favorite", favorite));
    ann.set("profile", Value::Object(profile.clone())).unwrap();

    let mut model = EntityModel::new(Value::Object(ann));
    model.detach(&session).unwrap();
    session.close();

    let snapshot = model.snapshot().unwrap().clone();
    let profile_copy = field(&snapshot, "profile");
    assert_eq!(field(&profile_copy, "favorite"), Value::Null);
    let pointer = model
        .detached_properties()
        .pointer_for(profile_copy.as_object().unwrap(), "favorite")
        .unwrap();
    assert_eq!(pointer.owner().class, EntityClass::new("Profile"));
    assert_eq!(pointer.owner().id, None);

    let next = store.open_session();
    let object = model.object(&next).unwrap();
    let favorite = field(&field(&object, "profile"), "favorite");
    assert_eq!(favorite.as_reference().unwrap().key(), &EntityKey::new("Address", 5));
    assert!(!favorite.is_initialized());
}

#[test]
fn test_plain_walking_can_be_disabled() {
    let store = store();
    let session = store.open_session();
    let ann = session.get("Person", 1).unwrap();
    let favorite = session
        .load(&EntityClass::new("Address"), &Identifier::Integer(5))
        .unwrap();
    ann.set("profile", Value::from(Object::new("Profile").with("favorite", favorite)))
        .unwrap();

    let config = ModelConfig::new().walk_plain_objects(false);
    let mut model = EntityModel::with_config(Value::Object(ann), config).unwrap();
    let err = model.detach(&session);
    assert!(matches!(err, Err(ModelError::PreconditionViolation(_))));
    assert_eq!(model.state(), ModelState::Live);
}

#[test]
fn test_setter_failure_is_absorbed() {
    let store = store();
    let session = store.open_session();
    let ann = session.get("Person", 1).unwrap();
    let favorite = session
        .load(&EntityClass::new("Address"), &Identifier::Integer(5))
        .unwrap();
    let frozen = Object::new("Profile").with("favorite", favorite).read_only();
    ann.set("profile", Value::from(frozen)).unwrap();

    let mut model = EntityModel::new(Value::Object(ann));
    model.detach(&session).unwrap();

    // The pointer is recorded even though the field could not be nulled.
    let snapshot = model.snapshot().unwrap().clone();
    let profile_copy = field(&snapshot, "profile");
    assert_eq!(field(&profile_copy, "favorite"), Value::Null);
    assert!(
        model
            .detached_properties()
            .pointer_for(profile_copy.as_object().unwrap(), "favorite")
            .is_some()
    );

    // Restoring into the read-only copy is skipped and the pointer kept.
    let next = store.open_session();
    model.object(&next).unwrap();
    assert!(
        model
            .detached_properties()
            .pointer_for(profile_copy.as_object().unwrap(), "favorite")
            .is_some()
    );
}

#[test]
fn test_getter_failure_is_absorbed() {
    let store = store();
    let session = store.open_session();
    // Declared associations missing from the object itself.
    let sparse = ObjectRef::new(Object::new("Person").with("id", 9i64).with("name", "Dan"));

    let config = ModelConfig::default();
    let mut properties = DetachedProperties::new();
    let mut walker = ObjectWalker::new(&session, &mut properties, &config);
    walker.walk(&Value::Object(sparse)).unwrap();
    assert_eq!(walker.visited(), 1);
    assert!(properties.is_empty());
}
