/// Detach/attach round trips of EntityModel
///
/// Run with: cargo test --test model_roundtrip_tests

use lazymodel::core::ObjectId;
use lazymodel::prelude::*;
use std::collections::HashSet;

fn store() -> MemoryStore {
    let catalog = MetadataCatalog::new()
        .with_entity(
            EntityMetadata::new("Customer", "id")
                .scalar("name")
                .association("address")
                .association("orders"),
        )
        .unwrap()
        .with_entity(EntityMetadata::new("Address", "id").scalar("city"))
        .unwrap()
        .with_entity(EntityMetadata::new("Order", "id").scalar("total"))
        .unwrap();
    let store = MemoryStore::new(catalog);

    store.insert("Address", 5, Record::new().scalar("city", "Leiden")).unwrap();
    store.insert("Address", 6, Record::new().scalar("city", "Delft")).unwrap();
    store.insert("Address", 42, Record::new().scalar("city", "Gouda")).unwrap();
    store.insert("Order", 1, Record::new().scalar("total", 10i64)).unwrap();
    store.insert("Order", 2, Record::new().scalar("total", 20i64)).unwrap();

    store
        .insert(
            "Customer",
            1,
            Record::new()
                .scalar("name", "Ann")
                .reference("address", Some(EntityKey::new("Address", 5)))
                .collection(
                    "orders",
                    PersistentKind::List,
                    vec![StoredElement::entity("Order", 1), StoredElement::entity("Order", 2)],
                ),
        )
        .unwrap();
    store
        .insert(
            "Customer",
            2,
            Record::new()
                .scalar("name", "Bob")
                .reference("address", Some(EntityKey::new("Address", 6)))
                .collection("orders", PersistentKind::List, vec![]),
        )
        .unwrap();
    store
        .insert(
            "Customer",
            3,
            Record::new()
                .scalar("name", "Cat")
                .reference("address", Some(EntityKey::new("Address", 42)))
                .collection("orders", PersistentKind::List, vec![]),
        )
        .unwrap();
    store
}

fn assert_session_free(value: &Value, seen: &mut HashSet<ObjectId>) {
    assert!(!value.is_session_bound(), "session-bound value {:?}", value);
    match value {
        Value::Object(object) => {
            if !seen.insert(object.id()) {
                return;
            }
            for name in object.property_names().unwrap() {
                assert_session_free(&object.get(&name).unwrap(), seen);
            }
        }
        Value::Collection(Collection::Plain(plain)) => {
            for element in plain.elements().values() {
                assert_session_free(element, seen);
            }
        }
        _ => {}
    }
}

fn field(object: &Value, name: &str) -> Value {
    object.as_object().unwrap().get(name).unwrap()
}

#[test]
fn test_initialized_graph_round_trips_by_value() {
    let store = store();
    let session = store.open_session();
    let customer = session.get("Customer", 1).unwrap();
    customer.get("address").unwrap().as_reference().unwrap().initialize().unwrap();
    customer
        .get("orders")
        .unwrap()
        .as_collection()
        .unwrap()
        .as_managed()
        .unwrap()
        .elements()
        .unwrap();

    let mut model = EntityModel::new(Value::Object(customer.clone()));
    model.detach(&session).unwrap();
    session.close();

    assert_eq!(model.state(), ModelState::Detached);
    assert!(model.detached_properties().is_empty());
    assert_session_free(model.snapshot().unwrap(), &mut HashSet::new());

    let next = store.open_session();
    let object = model.object(&next).unwrap();
    assert_eq!(model.state(), ModelState::Live);
    assert!(!object.as_object().unwrap().ptr_eq(&customer));

    assert_eq!(field(&object, "name"), Value::from("Ann"));
    assert_eq!(field(&field(&object, "address"), "city"), Value::from("Leiden"));
    let orders = field(&object, "orders");
    let orders = orders.as_collection().unwrap().as_plain().unwrap();
    let totals: Vec<Value> = orders
        .values()
        .iter()
        .map(|order| field(order, "total"))
        .collect();
    assert_eq!(totals, vec![Value::from(10i64), Value::from(20i64)]);
}

#[test]
fn test_unresolved_reference_survives_round_trip() {
    let store = store();
    let session = store.open_session();
    let customer = session.get("Customer", 3).unwrap();

    let mut model = EntityModel::new(Value::Object(customer));
    model.detach(&session).unwrap();
    session.close();

    let snapshot = model.snapshot().unwrap().clone();
    assert_eq!(field(&snapshot, "address"), Value::Null);
    let pointer = model
        .detached_properties()
        .pointer_for(snapshot.as_object().unwrap(), "address")
        .unwrap();
    assert_eq!(
        pointer.target(),
        &PointerTarget::Reference(EntityKey::new("Address", 42))
    );
    assert_eq!(pointer.owner().id, Some(Identifier::Integer(3)));

    let loads_before = store.stats().unwrap();
    let next = store.open_session();
    let object = model.object(&next).unwrap();
    let address = field(&object, "address");
    let proxy = address.as_reference().unwrap();

    assert_eq!(proxy.key(), &EntityKey::new("Address", 42));
    assert!(!proxy.is_initialized());
    assert_eq!(store.stats().unwrap(), loads_before);
    assert!(model.detached_properties().pointer_for(object.as_object().unwrap(), "address").is_none());

    assert_eq!(proxy.initialize().unwrap().get("city").unwrap(), Value::from("Gouda"));
}

#[test]
fn test_scalar_pointers_are_restored_only_once() {
    let store = store();
    let session = store.open_session();
    let mut model = EntityModel::new(Value::Object(session.get("Customer", 3).unwrap()));
    model.detach(&session).unwrap();

    let next = store.open_session();
    let first = model.object(&next).unwrap();
    let address = field(&first, "address");
    let second = model.object(&next).unwrap();

    let again = field(&second, "address");
    assert!(again.as_reference().unwrap().ptr_eq(address.as_reference().unwrap()));
    assert!(first.as_object().unwrap().ptr_eq(second.as_object().unwrap()));
}

#[test]
fn test_sibling_pointers_do_not_leak() {
    let store = store();
    let session = store.open_session();
    let ann = session.get("Customer", 1).unwrap();
    let bob = session.get("Customer", 2).unwrap();

    let mut first = EntityModel::new(Value::Object(ann));
    let mut second = EntityModel::new(Value::Object(bob));
    first.detach(&session).unwrap();
    second.detach(&session).unwrap();
    session.close();

    let next = store.open_session();
    let ann = first.object(&next).unwrap();
    assert_eq!(
        field(&ann, "address").as_reference().unwrap().key(),
        &EntityKey::new("Address", 5)
    );

    assert_eq!(second.state(), ModelState::Detached);
    let bob = second.snapshot().unwrap().clone();
    assert_eq!(field(&bob, "address"), Value::Null);
    let pointer = second
        .detached_properties()
        .pointer_for(bob.as_object().unwrap(), "address")
        .unwrap();
    assert_eq!(pointer.owner().id, Some(Identifier::Integer(2)));
    assert_eq!(
        pointer.target(),
        &PointerTarget::Reference(EntityKey::new("Address", 6))
    );
}

#[test]
fn test_two_request_cycles() {
    let store = store();
    let first = store.open_session();
    let mut model = EntityModel::new(Value::Object(first.get("Customer", 1).unwrap()));
    model.detach(&first).unwrap();
    first.close();

    let second = store.open_session();
    let object = model.object(&second).unwrap();
    object.as_object().unwrap().set("name", Value::from("Anna")).unwrap();
    let orders = field(&object, "orders");
    assert_eq!(orders.as_collection().unwrap().as_managed().unwrap().len().unwrap(), 2);
    model.detach(&second).unwrap();
    second.close();

    assert_eq!(model.state(), ModelState::Detached);
    assert_session_free(model.snapshot().unwrap(), &mut HashSet::new());
    assert_eq!(model.detached_properties().len(), 1);
    assert_eq!(model.detached_properties().collection_count(), 0);

    let third = store.open_session();
    let object = model.object(&third).unwrap();
    assert_eq!(field(&object, "name"), Value::from("Anna"));
    let address = field(&object, "address");
    assert_eq!(address.as_reference().unwrap().key(), &EntityKey::new("Address", 5));
    assert!(!address.is_initialized());

    let orders = field(&object, "orders");
    let totals: Vec<Value> = orders
        .as_collection()
        .unwrap()
        .as_plain()
        .unwrap()
        .values()
        .iter()
        .map(|order| field(order, "total"))
        .collect();
    assert_eq!(totals, vec![Value::from(10i64), Value::from(20i64)]);
    assert!(model.detached_properties().is_empty());
}

#[test]
fn test_siblings_in_one_graph_get_separate_entries() {
    let store = store();
    let session = store.open_session();
    let members = PlainCollection::of(
        CollectionFlavor::List,
        [
            Value::Object(session.get("Customer", 1).unwrap()),
            Value::Object(session.get("Customer", 2).unwrap()),
        ],
    )
    .unwrap();
    let household = Object::new("Household").with("members", members);

    let mut model = EntityModel::new(Value::from(household));
    model.detach(&session).unwrap();

    let properties = model.detached_properties();
    assert_eq!(properties.owner_count(), 2);
    let owners: HashSet<Option<Identifier>> = properties
        .iter()
        .flat_map(|(_, pointers)| pointers.iter().map(|p| p.owner().id.clone()))
        .collect();
    assert_eq!(
        owners,
        HashSet::from([Some(Identifier::Integer(1)), Some(Identifier::Integer(2))])
    );
    for (_, pointers) in properties.iter() {
        let addresses = pointers.iter().filter(|p| p.property() == "address").count();
        assert_eq!(addresses, 1);
    }
}

#[test]
fn test_proxy_root_is_initialized_on_detach() {
    let store = store();
    let session = store.open_session();
    let mut model = EntityModel::load(&session, &EntityClass::new("Customer"), &Identifier::Integer(3)).unwrap();

    assert_eq!(model.object_class(), Some(&EntityClass::new("Customer")));
    assert_eq!(store.stats().unwrap().entity_loads, 0);

    model.detach(&session).unwrap();
    assert_eq!(store.stats().unwrap().entity_loads, 1);
    let snapshot = model.snapshot().unwrap().clone();
    assert_eq!(field(&snapshot, "name"), Value::from("Cat"));
}

#[test]
fn test_detach_is_a_no_op_when_detached_or_empty() {
    let store = store();
    let session = store.open_session();

    let mut empty = EntityModel::empty();
    empty.detach(&session).unwrap();
    assert_eq!(empty.state(), ModelState::Empty);
    assert_eq!(empty.object(&session).unwrap(), Value::Null);

    let mut model = EntityModel::new(Value::Object(session.get("Customer", 3).unwrap()));
    model.detach(&session).unwrap();
    let snapshot = model.snapshot().unwrap().clone();
    model.detach(&session).unwrap();
    assert_eq!(model.snapshot(), Some(&snapshot));
}

#[test]
fn test_set_object_goes_live_unconditionally() {
    let store = store();
    let session = store.open_session();
    let mut model = EntityModel::new(Value::Object(session.get("Customer", 3).unwrap()));
    model.detach(&session).unwrap();
    assert_eq!(model.detached_properties().len(), 2);

    let replacement = session.get("Customer", 2).unwrap();
    model.set_object(Value::Object(replacement.clone()));

    assert_eq!(model.state(), ModelState::Live);
    assert_eq!(model.detached_properties().len(), 2);
    let object = model.object(&session).unwrap();
    assert!(object.as_object().unwrap().ptr_eq(&replacement));
}

#[test]
fn test_equality_is_explicit() {
    let store = store();
    let session = store.open_session();
    let customer = Value::Object(session.get("Customer", 3).unwrap());

    let mut first = EntityModel::new(customer.clone());
    let mut second = EntityModel::new(customer.clone());
    assert!(first.same_snapshot(&second));
    assert!(first.resolved_eq(&mut second, &session).unwrap());
    assert_eq!(
        first.resolved_hash(&session).unwrap(),
        second.resolved_hash(&session).unwrap()
    );

    first.detach(&session).unwrap();
    assert!(!first.same_snapshot(&second));
    assert_eq!(first.state(), ModelState::Detached);

    // Comparing attaches the detached side.
    let _ = first.resolved_eq(&mut second, &session).unwrap();
    assert_eq!(first.state(), ModelState::Live);
}

#[test]
fn test_provided_model_uses_the_current_request() {
    let scope = RequestScope::new(store());
    let session = scope.begin().unwrap();
    let customer = session.get("Customer", 3).unwrap();
    let mut model = ProvidedModel::new(EntityModel::new(Value::Object(customer)), scope.clone());

    model.detach().unwrap();
    scope.end().unwrap();
    assert_eq!(model.state(), ModelState::Detached);

    scope.begin().unwrap();
    let object = model.object().unwrap();
    let address = field(&object, "address");
    assert_eq!(address.as_reference().unwrap().key(), &EntityKey::new("Address", 42));
}
